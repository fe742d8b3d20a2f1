use anyhow::{Result, anyhow};
use clap::Parser;
use colored::Colorize;

use crate::{
    cli::handlers::tree,
    constants::INVOCATION_TOKEN,
    core::{graph_display::DisplayOptions, paths::Installation, tree_store::TreeSet},
    models::InputStrategy,
    system::{
        context::FileContextFinder,
        fetcher::HttpFetcher,
        inputs::DefaultInputRunner,
        postrun::DefaultPostRunner,
        prerun::{DefaultPreRunner, SandboxMode},
        runner::{FormulaRunner, SandboxSettings},
        settings::{self, Settings},
    },
};

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
struct RunArgs {
    /// The words of the formula command, e.g. `db migrate`.
    words: Vec<String>,

    /// Run the formula inside a container when it ships a Dockerfile.
    #[arg(long)]
    docker: bool,

    /// Read the formula inputs as a JSON object from stdin.
    #[arg(long)]
    stdin: bool,
}

/// Runs the formula named by `args`, or lists the commands of a group.
pub fn handle(args: Vec<String>, installation: &Installation) -> Result<()> {
    let run_args = RunArgs::try_parse_from(&args)?;
    let words: Vec<String> = run_args
        .words
        .into_iter()
        .skip_while(|word| word == INVOCATION_TOKEN)
        .collect();

    let set = TreeSet::load(installation)?;
    let command = set
        .find_command(&words)
        .ok_or_else(|| anyhow!(t!("run.error.not_found"), command = words.join(" ")))?;

    let Some(formula) = &command.formula else {
        // A group: show what it contains.
        let options = DisplayOptions {
            max_depth: Some(1),
            ..Default::default()
        };
        tree::print_tree(&set, &words, &options);
        return Ok(());
    };

    let settings = settings::load_settings(installation)?;
    let strategy = if run_args.stdin {
        InputStrategy::Stdin
    } else {
        settings.input_strategy
    };
    let definition = formula.definition(&installation.os);
    log::debug!(
        "Running '{}' from repository '{}' ({:?})",
        definition.path,
        command.repo,
        strategy
    );

    let report = formula_runner(installation, &settings).run(&definition, strategy, run_args.docker)?;
    if let SandboxMode::FallbackToLocal { reason } = &report.mode {
        println!(
            "{}",
            format!(t!("run.fallback"), reason = reason).dimmed()
        );
    }
    Ok(())
}

/// Wires the default collaborators of the execution engine.
fn formula_runner(installation: &Installation, settings: &Settings) -> FormulaRunner {
    FormulaRunner::new(
        Box::new(DefaultPreRunner::new(
            installation.clone(),
            settings.sandbox_runtime.clone(),
            HttpFetcher,
        )),
        Box::new(DefaultInputRunner::new(installation.clone())),
        Box::new(DefaultPostRunner::new(settings.sandbox_runtime.clone())),
        Box::new(FileContextFinder::new(installation.home.clone())),
        SandboxSettings {
            runtime: settings.sandbox_runtime.clone(),
            app_path: settings.sandbox_app_path.clone(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::paths::Os;

    #[test]
    fn test_run_flags_are_split_from_words() {
        let args = RunArgs::try_parse_from(["db", "migrate", "--docker"]).unwrap();
        assert_eq!(args.words, vec!["db", "migrate"]);
        assert!(args.docker);
        assert!(!args.stdin);
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        let home = tempfile::tempdir().unwrap();
        let inst = Installation::new(home.path(), Os::Linux);
        let err = handle(vec!["db".into(), "migrate".into()], &inst).unwrap_err();
        assert!(err.to_string().contains("db migrate"));
    }
}
