use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::io::{self, BufRead};
use std::thread;

use crate::{
    cli::{args::BuildArgs, handlers::commons},
    core::{paths::Installation, workspace::Workspace},
    system::{
        builder::{self, Builder, MakeBuilder, Synced},
        settings,
        watcher::{WatchReport, Watcher},
    },
};

/// `rit build formula <path> [--workspace <dir>] [--watch]`
pub fn handle(args: Vec<String>, installation: &Installation) -> Result<()> {
    let build_args = BuildArgs::try_parse_from(&args)?;
    let settings = settings::load_settings(installation)?;
    let workspace = Workspace::open(commons::workspace_root(installation, build_args.workspace))?;
    let formula_path = build_args.path.trim_matches('/').to_string();
    let make = MakeBuilder::new(settings.build_command);

    if !build_args.watch {
        make.build(workspace.root(), &formula_path)?;
        let synced = builder::sync_formula(installation, workspace.root(), &formula_path)?;
        print_built(&formula_path, &synced);
        return Ok(());
    }

    let (watcher, reports) = Watcher::new(installation.clone(), make);

    // Typing `q` + Enter stops the watch.
    let handle = watcher.handle();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) if line.trim() == "q" => {
                    handle.close();
                    break;
                }
                Ok(_) => continue,
                Err(_) => break,
            }
        }
    });

    let printer = thread::spawn(move || {
        for report in reports {
            match report {
                WatchReport::Built { formula, synced } => print_built(&formula, &synced),
                WatchReport::BuildFailed { formula, error } => eprintln!(
                    "{}",
                    format!(t!("build.failed"), formula = formula, error = error).red()
                ),
                WatchReport::WatchError(message) => eprintln!(
                    "{}",
                    format!(t!("build.watch_error"), error = message).yellow()
                ),
            }
        }
    });

    println!(
        "{}",
        format!(
            t!("build.watching"),
            path = workspace.formula_dir(&formula_path).display()
        )
        .cyan()
    );
    watcher.watch(workspace.root(), &formula_path)?;

    // Dropping the watcher closes the report channel and lets the printer finish.
    drop(watcher);
    if printer.join().is_err() {
        log::warn!("Report printer thread panicked.");
    }
    Ok(())
}

fn print_built(formula: &str, synced: &Synced) {
    println!(
        "{}",
        format!(
            t!("build.success"),
            formula = formula.cyan(),
            path = synced.bin_dir.display()
        )
        .green()
    );
}
