// src/cli/args.rs
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)] // The action name has already been consumed by the dispatcher.
pub struct CreateArgs {
    /// What to create. Only `formula` is supported.
    #[arg(value_parser = ["formula"])]
    pub target: String,

    /// The formula command, e.g. "rit db migrate". Asked interactively when missing.
    #[arg(long = "formula", short = 'f')]
    pub command: Option<String>,

    /// The formula language (go, java, node, python, shell). Asked interactively when missing.
    #[arg(long = "lang", short)]
    pub language: Option<String>,

    /// The workspace to create the formula in. Defaults to `<home>/formulas-local`.
    #[arg(long, short)]
    pub workspace: Option<PathBuf>,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct BuildArgs {
    /// What to build. Only `formula` is supported.
    #[arg(value_parser = ["formula"])]
    pub target: String,

    /// The formula path inside the workspace, e.g. `db/migrate`.
    pub path: String,

    /// The workspace the formula lives in. Defaults to `<home>/formulas-local`.
    #[arg(long, short)]
    pub workspace: Option<PathBuf>,

    /// Keep rebuilding the formula every time one of its files changes.
    #[arg(long)]
    pub watch: bool,
}
