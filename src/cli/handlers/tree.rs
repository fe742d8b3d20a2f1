use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::core::{
    graph_display::{self, DisplayOptions},
    paths::Installation,
    tree_store::TreeSet,
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Displays the installed formula commands as a tree."
)]
struct TreeArgs {
    /// Words of a command group to use as the root, e.g. `db`.
    group: Vec<String>,

    /// Show the repository each command comes from.
    #[arg(long, short)]
    repos: bool,

    /// Show the formula path of each leaf command.
    #[arg(long, short)]
    paths: bool,

    /// Show everything (repositories and paths).
    #[arg(long)]
    all: bool,

    /// Limit the depth of the tree display.
    #[arg(long, short)]
    depth: Option<usize>,
}

pub fn handle(args: Vec<String>, installation: &Installation) -> Result<()> {
    let tree_args = TreeArgs::try_parse_from(&args)?;
    let set = TreeSet::load(installation)?;

    let group: Vec<String> = tree_args
        .group
        .into_iter()
        .filter(|word| word != crate::constants::INVOCATION_TOKEN)
        .collect();
    let options = DisplayOptions {
        show_repos: tree_args.repos || tree_args.all,
        show_paths: tree_args.paths || tree_args.all,
        max_depth: tree_args.depth,
    };

    print_tree(&set, &group, &options);
    Ok(())
}

/// Prints the commands below `group` with a header, or a hint when there is
/// nothing to show.
pub fn print_tree(set: &TreeSet, group: &[String], options: &DisplayOptions) {
    let lines = graph_display::render_command_tree(set, group, options);
    if lines.is_empty() {
        println!("{}", t!("tree.empty").yellow());
        return;
    }

    let header = if group.is_empty() {
        t!("tree.header.full_tree").to_string()
    } else {
        format!(t!("tree.header.from_group"), group = group.join(" ").cyan())
    };
    println!("\n{}", header);
    for line in lines {
        println!("{line}");
    }
}
