// src/core/graph_display.rs

use crate::core::tree_store::TreeSet;
use crate::models::Command;
use colored::Colorize;

/// Options controlling how the command tree is rendered.
#[derive(Debug, Clone, Default)]
pub struct DisplayOptions {
    /// Show the repository each command comes from.
    pub show_repos: bool,
    /// Show the formula path next to leaf commands.
    pub show_paths: bool,
    /// Stop descending after this many levels.
    pub max_depth: Option<usize>,
}

/// Renders the commands under `tokens` (the whole tree when empty) as an
/// ASCII tree, one line per command.
pub fn render_command_tree(set: &TreeSet, tokens: &[String], options: &DisplayOptions) -> Vec<String> {
    let mut lines = Vec::new();
    let mut path = tokens.to_vec();
    render_children(set, &mut path, "", 1, options, &mut lines);
    lines
}

fn render_children(
    set: &TreeSet,
    path: &mut Vec<String>,
    prefix: &str,
    depth: usize,
    options: &DisplayOptions,
    lines: &mut Vec<String>,
) {
    if options.max_depth.is_some_and(|max| depth > max) {
        return;
    }

    let children = set.children_of(path);
    let count = children.len();
    for (i, child) in children.into_iter().enumerate() {
        let is_last = i + 1 == count;
        let connector = if is_last { "└─" } else { "├─" };
        lines.push(format!("{prefix}{connector}{}", describe(child, options)));

        if !child.is_leaf() {
            let child_prefix = format!("{}{}", prefix, if is_last { "   " } else { "│  " });
            path.push(child.usage.clone());
            render_children(set, path, &child_prefix, depth + 1, options, lines);
            path.pop();
        }
    }
}

fn describe(command: &Command, options: &DisplayOptions) -> String {
    let mut line = if command.is_leaf() {
        command.usage.green().to_string()
    } else {
        command.usage.bold().to_string()
    };

    if options.show_paths
        && let Some(formula) = &command.formula
    {
        line.push_str(&format!(" [{}]", formula.path));
    }
    if options.show_repos && !command.repo.is_empty() {
        line.push_str(&format!(" ({})", command.repo).dimmed().to_string());
    }
    line
}
