// src/system/inputs.rs

//! Collects the values of a formula's declared inputs and turns them into
//! environment variables for the formula process.

use crate::core::paths::Installation;
use crate::models::{Input, InputStrategy};
use crate::system::prerun::Setup;
use dialoguer::{Input as TextInput, Password, Select, theme::ColorfulTheme};
use serde_json::Value;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Prompt for input '{name}' failed: {source}")]
    Prompt {
        name: String,
        #[source]
        source: dialoguer::Error,
    },
    #[error("Could not read inputs from stdin: {0}")]
    StdinDecode(#[source] serde_json::Error),
    #[error("Inputs read from stdin must be a JSON object.")]
    StdinNotObject,
    #[error("Input cache '{path}' could not be written: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The environment a formula process is started with, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    envs: Vec<(String, String)>,
}

impl Invocation {
    pub fn push_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.envs.push((key.into(), value.into()));
    }

    pub fn envs(&self) -> &[(String, String)] {
        &self.envs
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.envs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Fills an [`Invocation`] with the inputs a formula declares.
pub trait InputRunner {
    fn inputs(
        &self,
        invocation: &mut Invocation,
        setup: &Setup,
        strategy: InputStrategy,
    ) -> Result<(), InputError>;
}

/// Asks the user interactively, or reads a JSON document from stdin.
#[derive(Debug, Clone)]
pub struct DefaultInputRunner {
    installation: Installation,
}

impl DefaultInputRunner {
    pub fn new(installation: Installation) -> Self {
        Self { installation }
    }

    fn prompt(&self, input: &Input) -> Result<String, InputError> {
        let theme = ColorfulTheme::default();
        let label = if input.label.is_empty() {
            input.name.as_str()
        } else {
            input.label.as_str()
        };
        let failed = |source| InputError::Prompt {
            name: input.name.clone(),
            source,
        };

        if !input.items.is_empty() || input.kind == "bool" {
            let items = if input.items.is_empty() {
                vec!["true".to_string(), "false".to_string()]
            } else {
                input.items.clone()
            };
            let default = items.iter().position(|i| *i == input.default).unwrap_or(0);
            let selected = Select::with_theme(&theme)
                .with_prompt(label)
                .items(&items)
                .default(default)
                .interact()
                .map_err(failed)?;
            return Ok(items.get(selected).cloned().unwrap_or_default());
        }

        if input.kind == "password" {
            return Password::with_theme(&theme)
                .with_prompt(label)
                .interact()
                .map_err(failed);
        }

        let cache_file = self.installation.input_cache_file(&input.name);
        if input.cache.active {
            let cached = load_cache(&cache_file);
            if !cached.is_empty() {
                let mut items = cached.clone();
                items.push(input.cache.new_label.clone());
                let selected = Select::with_theme(&theme)
                    .with_prompt(label)
                    .items(&items)
                    .default(0)
                    .interact()
                    .map_err(failed)?;
                if let Some(value) = cached.get(selected) {
                    remember(&cache_file, value, input.cache.qtd)?;
                    return Ok(value.clone());
                }
            }
        }

        let mut text = TextInput::<String>::with_theme(&theme).with_prompt(label);
        if !input.default.is_empty() {
            text = text.default(input.default.clone());
        }
        let value = text.interact_text().map_err(failed)?;

        if input.cache.active {
            remember(&cache_file, &value, input.cache.qtd)?;
        }
        Ok(value)
    }
}

impl InputRunner for DefaultInputRunner {
    fn inputs(
        &self,
        invocation: &mut Invocation,
        setup: &Setup,
        strategy: InputStrategy,
    ) -> Result<(), InputError> {
        let declared = &setup.config.inputs;
        if declared.is_empty() {
            return Ok(());
        }

        let values = match strategy {
            InputStrategy::Stdin => values_from_reader(declared, io::stdin().lock())?,
            InputStrategy::Prompt => declared
                .iter()
                .map(|input| Ok((input.env_name(), self.prompt(input)?)))
                .collect::<Result<Vec<_>, InputError>>()?,
        };

        for (key, value) in values {
            log::debug!("Input '{}' collected", key);
            invocation.push_env(key, value);
        }
        Ok(())
    }
}

/// Reads a single JSON object and picks each declared input from it.
///
/// Strings are taken verbatim, other JSON values are rendered as JSON, and
/// missing keys fall back to the input's default.
pub fn values_from_reader<R: Read>(
    inputs: &[Input],
    reader: R,
) -> Result<Vec<(String, String)>, InputError> {
    let document: Value = serde_json::from_reader(reader).map_err(InputError::StdinDecode)?;
    let Value::Object(map) = document else {
        return Err(InputError::StdinNotObject);
    };

    Ok(inputs
        .iter()
        .map(|input| {
            let value = match map.get(&input.name) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => input.default.clone(),
                Some(other) => other.to_string(),
            };
            (input.env_name(), value)
        })
        .collect())
}

/// Previously used values of an input, most recent first.
pub fn load_cache(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .ok()
        .and_then(|content| serde_json::from_str(&content).ok())
        .unwrap_or_default()
}

/// Moves `value` to the front of the cache, keeping at most `qtd` entries.
pub fn remember(path: &Path, value: &str, qtd: usize) -> Result<(), InputError> {
    let mut values = load_cache(path);
    values.retain(|v| v != value);
    values.insert(0, value.to_string());
    values.truncate(qtd.max(1));

    let cache_error = |source| InputError::Cache {
        path: path.to_path_buf(),
        source,
    };
    let content = serde_json::to_string(&values).map_err(|e| cache_error(e.into()))?;
    fs::write(path, content).map_err(cache_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, default: &str) -> Input {
        Input {
            name: name.to_string(),
            kind: "text".to_string(),
            default: default.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_stdin_values_by_name() {
        let inputs = vec![input("name", ""), input("port", "80"), input("debug", "")];
        let json = r#"{"name": "Dennis", "debug": true, "unused": 1}"#;

        let values = values_from_reader(&inputs, json.as_bytes()).unwrap();
        assert_eq!(
            values,
            vec![
                ("NAME".to_string(), "Dennis".to_string()),
                ("PORT".to_string(), "80".to_string()),
                ("DEBUG".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_stdin_must_be_an_object() {
        let inputs = vec![input("name", "")];
        assert!(matches!(
            values_from_reader(&inputs, "[1]".as_bytes()),
            Err(InputError::StdinNotObject)
        ));
        assert!(matches!(
            values_from_reader(&inputs, "{".as_bytes()),
            Err(InputError::StdinDecode(_))
        ));
    }

    #[test]
    fn test_cache_keeps_most_recent_first_without_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".name.cache");

        remember(&path, "a", 3).unwrap();
        remember(&path, "b", 3).unwrap();
        remember(&path, "c", 3).unwrap();
        remember(&path, "a", 3).unwrap();
        assert_eq!(load_cache(&path), vec!["a", "c", "b"]);

        remember(&path, "d", 3).unwrap();
        assert_eq!(load_cache(&path), vec!["d", "a", "c"]);
    }

    #[test]
    fn test_unreadable_cache_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".name.cache");
        assert!(load_cache(&path).is_empty());
        fs::write(&path, "not json").unwrap();
        assert!(load_cache(&path).is_empty());
    }

    #[test]
    fn test_invocation_get_returns_last_value() {
        let mut invocation = Invocation::default();
        invocation.push_env("PWD", "/a");
        invocation.push_env("PWD", "/b");
        assert_eq!(invocation.get("PWD"), Some("/b"));
        assert_eq!(invocation.get("CONTEXT"), None);
    }
}
