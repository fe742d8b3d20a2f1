// src/models.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{DEFAULT_CACHE_NEW_LABEL, DEFAULT_CACHE_QTD, DEFAULT_CONFIG, OS_PLACEHOLDER};
use crate::core::paths::Os;

// --- COMMAND TREE MODELS (tree.json) ---

/// The artifact definition carried by a leaf command.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Formula {
    /// Slash-joined command path, e.g. `db/migrate`.
    pub path: String,
    /// Default binary name template.
    pub bin: String,
    /// Linux binary name template.
    #[serde(rename = "binLinux", default)]
    pub linux_bin: String,
    /// macOS binary name template.
    #[serde(rename = "binMac", default)]
    pub mac_bin: String,
    /// Windows binary name template.
    #[serde(rename = "binWindows", default)]
    pub windows_bin: String,
    /// Name of the archive holding every platform binary.
    #[serde(default)]
    pub bundle: String,
    /// Runtime configuration file name. Empty means `config.json`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub config: String,
    /// Base URL of the repository the formula was published to.
    #[serde(rename = "repoUrl", default, skip_serializing_if = "String::is_empty")]
    pub repo_url: String,
}

impl Formula {
    /// Selects the binary template for the given operating system, falling back
    /// to the generic `bin` when the platform template is empty.
    pub fn bin_for(&self, os: &Os) -> &str {
        let specific = match os {
            Os::Linux => &self.linux_bin,
            Os::Darwin => &self.mac_bin,
            Os::Windows => &self.windows_bin,
            Os::Other(_) => &self.bin,
        };
        if specific.is_empty() { &self.bin } else { specific }
    }

    /// Builds the execution definition for the given operating system.
    pub fn definition(&self, os: &Os) -> Definition {
        Definition {
            path: self.path.clone(),
            bin: self.bin_for(os).to_string(),
            config: self.config.clone(),
            repo_url: self.repo_url.clone(),
        }
    }
}

/// A node of the command tree. Leaves carry a `formula`, groups don't.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    #[serde(default)]
    pub id: String,
    pub parent: String,
    pub usage: String,
    #[serde(default)]
    pub help: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<Formula>,
    /// Owning repository. Filled in when trees are loaded into a `TreeSet`.
    #[serde(skip)]
    pub repo: String,
}

impl Command {
    /// Returns true when this command runs a formula.
    pub fn is_leaf(&self) -> bool {
        self.formula.is_some()
    }

    /// Returns true when the command sits at `(parent, usage)`.
    pub fn is_at(&self, parent: &str, usage: &str) -> bool {
        self.parent == parent && self.usage == usage
    }
}

/// The persisted command registry of one formula repository.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    #[serde(default)]
    pub commands: Vec<Command>,
}

// --- FORMULA CONFIG MODELS (config.json) ---

/// Remembered-values policy of a single input.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InputCache {
    #[serde(default)]
    pub active: bool,
    #[serde(default = "default_cache_qtd")]
    pub qtd: usize,
    #[serde(rename = "newLabel", default = "default_cache_new_label")]
    pub new_label: String,
}

impl Default for InputCache {
    fn default() -> Self {
        Self {
            active: false,
            qtd: DEFAULT_CACHE_QTD,
            new_label: DEFAULT_CACHE_NEW_LABEL.to_string(),
        }
    }
}

fn default_cache_qtd() -> usize {
    DEFAULT_CACHE_QTD
}

fn default_cache_new_label() -> String {
    DEFAULT_CACHE_NEW_LABEL.to_string()
}

/// One input declared in a formula's `config.json`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Input {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
    #[serde(default)]
    pub cache: InputCache,
}

impl Input {
    /// The environment variable this input is exported as.
    pub fn env_name(&self) -> String {
        self.name.to_uppercase()
    }
}

/// The runtime configuration of a formula.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct FormulaConfig {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub inputs: Vec<Input>,
}

// --- EXECUTION MODELS ---

/// What the execution engine needs to locate a formula for one platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Definition {
    pub path: String,
    pub bin: String,
    pub config: String,
    pub repo_url: String,
}

/// How a formula collects its inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputStrategy {
    #[default]
    Prompt,
    Stdin,
}

/// The active context, as reported by the context provider.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextHolder {
    #[serde(default)]
    pub current_context: String,
    #[serde(default)]
    pub all: Vec<String>,
}

// --- LANGUAGES ---

/// The languages a formula can be created in. Each one owns its binary
/// naming templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Go,
    Java,
    Node,
    Python,
    Shell,
}

/// Binary name templates for one leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinTemplates {
    pub bin: String,
    pub windows_bin: String,
}

impl Language {
    pub const ALL: [Self; 5] = [Self::Go, Self::Java, Self::Node, Self::Python, Self::Shell];

    /// Parses a language name. Unknown names are treated as shell formulas.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "go" | "golang" => Self::Go,
            "java" => Self::Java,
            "node" | "nodejs" => Self::Node,
            "python" | "python3" => Self::Python,
            _ => Self::Shell,
        }
    }

    /// The binary templates of a leaf named `leaf`.
    pub fn bin_templates(self, leaf: &str) -> BinTemplates {
        match self {
            Self::Python => BinTemplates {
                bin: "main.py".to_string(),
                windows_bin: format!("{leaf}.bat"),
            },
            Self::Go => BinTemplates {
                bin: format!("{leaf}-{OS_PLACEHOLDER}"),
                windows_bin: format!("{leaf}-{OS_PLACEHOLDER}.exe"),
            },
            Self::Java | Self::Node | Self::Shell => BinTemplates {
                bin: format!("{leaf}.sh"),
                windows_bin: format!("{leaf}.bat"),
            },
        }
    }

    /// The formula block of a freshly registered leaf.
    pub fn formula(self, path: &str, leaf: &str) -> Formula {
        let templates = self.bin_templates(leaf);
        Formula {
            path: path.to_string(),
            linux_bin: templates.bin.clone(),
            mac_bin: templates.bin.clone(),
            bin: templates.bin,
            windows_bin: templates.windows_bin,
            bundle: format!("{OS_PLACEHOLDER}.zip"),
            config: DEFAULT_CONFIG.to_string(),
            repo_url: String::new(),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Go => "go",
            Self::Java => "java",
            Self::Node => "node",
            Self::Python => "python",
            Self::Shell => "shell",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_name_defaults_to_shell() {
        assert_eq!(Language::from_name("Go"), Language::Go);
        assert_eq!(Language::from_name("python"), Language::Python);
        assert_eq!(Language::from_name("ruby"), Language::Shell);
        assert_eq!(Language::from_name(""), Language::Shell);
    }

    #[test]
    fn test_bin_for_falls_back_to_generic_bin() {
        let formula = Formula {
            bin: "hello.sh".to_string(),
            windows_bin: "hello.bat".to_string(),
            ..Default::default()
        };
        assert_eq!(formula.bin_for(&Os::Linux), "hello.sh");
        assert_eq!(formula.bin_for(&Os::Windows), "hello.bat");
        assert_eq!(formula.bin_for(&Os::Other("freebsd".into())), "hello.sh");
    }

    #[test]
    fn test_tree_json_field_names() {
        let tree = Tree {
            commands: vec![Command {
                id: "root_db_migrate".to_string(),
                parent: "root_db".to_string(),
                usage: "migrate".to_string(),
                help: "db migrate".to_string(),
                formula: Some(Language::Go.formula("db/migrate", "migrate")),
                repo: "ignored".to_string(),
            }],
        };
        let json = serde_json::to_value(&tree).unwrap();
        let formula = &json["commands"][0]["formula"];
        assert_eq!(formula["binWindows"], "migrate-${so}.exe");
        assert_eq!(formula["binLinux"], "migrate-${so}");
        assert_eq!(formula["bundle"], "${so}.zip");
        assert!(json["commands"][0].get("repo").is_none());
    }

    #[test]
    fn test_input_cache_defaults() {
        let input: Input =
            serde_json::from_str(r#"{"name":"sample_text","type":"text","cache":{"active":true}}"#)
                .unwrap();
        assert!(input.cache.active);
        assert_eq!(input.cache.qtd, DEFAULT_CACHE_QTD);
        assert_eq!(input.cache.new_label, DEFAULT_CACHE_NEW_LABEL);
        assert_eq!(input.env_name(), "SAMPLE_TEXT");
    }
}
