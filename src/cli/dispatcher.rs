use anyhow::{Context, Result};

use crate::{cli::handlers, core::paths::Installation};

// --- Command Definition and Registry ---

/// A built-in action, its aliases and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>, &Installation) -> Result<()>,
}

/// Built-in actions. Anything else is the name of a formula command.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "build",
        aliases: &[],
        handler: handlers::build::handle,
    },
    CommandDefinition {
        name: "create",
        aliases: &["new"],
        handler: handlers::create::handle,
    },
    CommandDefinition {
        name: "tree",
        aliases: &["ls"],
        handler: handlers::tree::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Routes `rit <args...>` to a built-in action, or runs the formula the
/// arguments name.
pub fn dispatch(all_args: Vec<String>) -> Result<()> {
    log::debug!("Dispatching args: {:?}", all_args);

    let installation =
        Installation::discover().context(t!("dispatch.error.installation"))?;
    log::debug!("Installation home: '{}'", installation.home.display());

    let Some((first, rest)) = all_args.split_first() else {
        // `rit` alone shows what can be run.
        return handlers::tree::handle(Vec::new(), &installation);
    };

    match find_command(first) {
        Some(command) => (command.handler)(rest.to_vec(), &installation),
        None => handlers::run::handle(all_args, &installation),
    }
}
