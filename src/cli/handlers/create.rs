use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::{
    cli::{args::CreateArgs, handlers::commons},
    core::{
        paths::Installation, tree::FormulaCommand, tree_store::TreeSet, workspace::Workspace,
    },
    models::Language,
};

/// `rit create formula [--formula <command>] [--lang <lang>] [--workspace <dir>]`
pub fn handle(args: Vec<String>, installation: &Installation) -> Result<()> {
    let create_args = CreateArgs::try_parse_from(&args)?;

    // 1. Validate the command first: nothing is asked or written for a bad one.
    let command_line = match create_args.command {
        Some(command) => command,
        None => commons::ask_formula_command()?,
    };
    let command = FormulaCommand::parse(&command_line)?;

    let language = match create_args.language {
        Some(name) => Language::from_name(&name),
        None => commons::ask_language()?,
    };

    // 2. Open the workspace and check the command is free everywhere.
    let workspace = Workspace::open(commons::workspace_root(installation, create_args.workspace))?;
    let installed = TreeSet::load(installation)?;

    // 3. Register it.
    let leaf = workspace.create_formula(&installed, &command, language)?;
    let path = leaf
        .formula
        .as_ref()
        .map(|formula| formula.path.clone())
        .unwrap_or_else(|| command.path());

    println!(
        "{}",
        format!(
            t!("create.success"),
            command = command.command_line().cyan(),
            language = language,
            path = workspace.formula_dir(&path).display()
        )
        .green()
    );
    println!(
        "{}",
        format!(t!("create.next_step"), path = path.cyan()).dimmed()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{paths::Os, tree::TreeError};

    fn create(installation: &Installation, workspace: &std::path::Path, command: &str) -> Result<()> {
        handle(
            vec![
                "formula".into(),
                "--formula".into(),
                command.into(),
                "--lang".into(),
                "shell".into(),
                "--workspace".into(),
                workspace.display().to_string(),
            ],
            installation,
        )
    }

    #[test]
    fn test_builtin_action_words_are_rejected_before_writing() {
        let home = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        let inst = Installation::new(home.path(), Os::Linux);

        let err = create(&inst, workspace.path(), "rit tree list").unwrap_err();
        assert_eq!(
            err.downcast_ref::<TreeError>(),
            Some(&TreeError::BuiltinAction("tree".to_string()))
        );
        assert_eq!(std::fs::read_dir(workspace.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_create_formula_from_flags() {
        let home = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        let inst = Installation::new(home.path(), Os::Linux);

        create(&inst, workspace.path(), "rit db migrate").unwrap();
        assert!(workspace.path().join("db/migrate/src").is_dir());
        assert!(workspace.path().join("Makefile").is_file());
    }
}
