// src/cli/handlers/commons.rs

// Helpers shared by several handlers.

use anyhow::Result;
use dialoguer::{Input, Select, theme::ColorfulTheme};
use std::path::PathBuf;

use crate::{
    constants::LOCAL_WORKSPACE_DIR,
    core::paths::Installation,
    models::Language,
};

/// The workspace given on the command line, or the installation's default one.
pub fn workspace_root(installation: &Installation, given: Option<PathBuf>) -> PathBuf {
    given.unwrap_or_else(|| installation.home.join(LOCAL_WORKSPACE_DIR))
}

/// Asks for the formula command until something non-empty is typed.
pub fn ask_formula_command() -> Result<String> {
    let command: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("create.prompt.command"))
        .with_initial_text("rit ")
        .validate_with(|input: &String| -> Result<(), &'static str> {
            if input.split_whitespace().count() > 2 {
                Ok(())
            } else {
                Err(t!("create.prompt.command_invalid"))
            }
        })
        .interact_text()?;
    Ok(command)
}

/// Lets the user pick one of the supported languages.
pub fn ask_language() -> Result<Language> {
    let names: Vec<String> = Language::ALL.iter().map(ToString::to_string).collect();
    let selected = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("create.prompt.language"))
        .items(&names)
        .default(0)
        .interact()?;
    Ok(Language::ALL.get(selected).copied().unwrap_or(Language::Shell))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::paths::Os;

    #[test]
    fn test_default_workspace_is_inside_home() {
        let inst = Installation::new("/home/me/.rit", Os::Linux);
        assert_eq!(
            workspace_root(&inst, None),
            PathBuf::from("/home/me/.rit/formulas-local")
        );
        assert_eq!(
            workspace_root(&inst, Some(PathBuf::from("/src/formulas"))),
            PathBuf::from("/src/formulas")
        );
    }
}
