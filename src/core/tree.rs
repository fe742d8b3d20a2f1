// src/core/tree.rs

//! The command tree and the algorithm that registers a formula command in it.

use crate::constants::{BUILTIN_ACTIONS, INVOCATION_TOKEN, ROOT_COMMAND};
use crate::models::{Command, Language, Tree};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error(
        "A formula command needs at least 2 words following \"rit\" [ex.: rit group verb], got '{0}'."
    )]
    TooShortCommand(String),
    #[error("A formula command needs to start with \"rit\" [ex.: rit group verb <noun>], got '{0}'.")]
    NotRitCommand(String),
    #[error("'{0}' is reserved and cannot be a word of a formula command.")]
    ReservedToken(String),
    #[error("'{0}' is a built-in rit action and cannot start a formula command.")]
    BuiltinAction(String),
    #[error("The command '{command}' already exists (parent '{parent}').")]
    CommandAlreadyExists { command: String, parent: String },
}

/// A validated formula command string, without its invocation token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaCommand {
    tokens: Vec<String>,
}

impl FormulaCommand {
    /// Validates a command string such as `rit db migrate`.
    ///
    /// The invocation token is checked first, so `foo bar` is a wrong
    /// invocation rather than a short command. No word may be a reserved
    /// token, and the first one may not name a built-in action.
    pub fn parse(command: &str) -> Result<Self, TreeError> {
        let mut words = command.split_whitespace();
        if words.next() != Some(INVOCATION_TOKEN) {
            return Err(TreeError::NotRitCommand(command.to_string()));
        }

        let tokens: Vec<String> = words.map(str::to_string).collect();
        if tokens.len() < 2 {
            return Err(TreeError::TooShortCommand(command.to_string()));
        }
        if let Some(reserved) = tokens
            .iter()
            .find(|t| *t == INVOCATION_TOKEN || *t == ROOT_COMMAND)
        {
            return Err(TreeError::ReservedToken(reserved.clone()));
        }
        if let Some(first) = tokens.first().filter(|t| BUILTIN_ACTIONS.contains(&t.as_str())) {
            return Err(TreeError::BuiltinAction(first.clone()));
        }
        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The full command line, invocation token included.
    pub fn command_line(&self) -> String {
        format!("{INVOCATION_TOKEN} {}", self.tokens.join(" "))
    }

    /// The last token, naming the leaf command.
    pub fn leaf(&self) -> &str {
        self.tokens.last().map(String::as_str).unwrap_or_default()
    }

    /// The slash-joined formula path, e.g. `db/migrate`.
    pub fn path(&self) -> String {
        self.tokens.join("/")
    }

    /// The parent id of the leaf command.
    pub fn leaf_parent(&self) -> String {
        parent_id(&self.tokens, self.tokens.len().saturating_sub(1))
    }
}

/// The parent id of the token at `position`: `root` for the first token,
/// `root_<previous tokens joined by "_">` otherwise.
pub fn parent_id(tokens: &[String], position: usize) -> String {
    match tokens.get(..position) {
        Some(prefix) if !prefix.is_empty() => format!("{ROOT_COMMAND}_{}", prefix.join("_")),
        _ => ROOT_COMMAND.to_string(),
    }
}

fn group_help(parent: &str, previous: Option<&str>, token: &str) -> String {
    match previous {
        Some(previous) if parent != ROOT_COMMAND => format!("{previous} {token}"),
        _ => format!("{token} commands"),
    }
}

impl Tree {
    /// Finds the command registered at `(parent, usage)`.
    pub fn find(&self, parent: &str, usage: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.is_at(parent, usage))
    }

    pub fn contains(&self, parent: &str, usage: &str) -> bool {
        self.find(parent, usage).is_some()
    }

    /// The direct children of the node with id `parent`.
    pub fn children(&self, parent: &str) -> Vec<&Command> {
        self.commands.iter().filter(|c| c.parent == parent).collect()
    }

    /// All leaf commands.
    pub fn leaves(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter().filter(|c| c.is_leaf())
    }

    /// Registers `command` in the tree, creating any missing grouping command
    /// on the way to the leaf.
    ///
    /// The insertion runs on a copy: when the leaf already exists the tree is
    /// left exactly as it was, including groups this call would have created.
    pub fn insert_formula(
        &mut self,
        command: &FormulaCommand,
        language: Language,
    ) -> Result<(), TreeError> {
        let tokens = command.tokens();
        let last = tokens.len().saturating_sub(1);
        let mut next = self.clone();

        for (i, token) in tokens.iter().enumerate() {
            let parent = parent_id(tokens, i);
            let previous = i.checked_sub(1).and_then(|p| tokens.get(p)).map(String::as_str);

            if i == last {
                if next.contains(&parent, token) {
                    return Err(TreeError::CommandAlreadyExists {
                        command: tokens.join(" "),
                        parent,
                    });
                }
                log::debug!("Registering leaf '{}' under '{}'", token, parent);
                next.commands.push(Command {
                    id: format!("{parent}_{token}"),
                    help: format!("{} {token}", previous.unwrap_or_default()),
                    formula: Some(language.formula(&command.path(), token)),
                    usage: token.clone(),
                    parent,
                    repo: String::new(),
                });
            } else if !next.contains(&parent, token) {
                log::debug!("Registering group '{}' under '{}'", token, parent);
                next.commands.push(Command {
                    id: format!("{parent}_{token}"),
                    help: group_help(&parent, previous, token),
                    usage: token.clone(),
                    parent,
                    formula: None,
                    repo: String::new(),
                });
            }
        }

        *self = next;
        Ok(())
    }

    /// Upserts every command of `other` by `(parent, usage)`.
    pub fn merge(&mut self, other: &Self) {
        for incoming in &other.commands {
            match self
                .commands
                .iter_mut()
                .find(|c| c.is_at(&incoming.parent, &incoming.usage))
            {
                Some(existing) => *existing = incoming.clone(),
                None => self.commands.push(incoming.clone()),
            }
        }
    }
}
