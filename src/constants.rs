// src/constants.rs

/// The token every formula command string starts with.
pub const INVOCATION_TOKEN: &str = "rit";

/// The id of the sentinel node every command tree hangs from.
pub const ROOT_COMMAND: &str = "root";

/// First words taken by the built-in actions and their aliases. A formula
/// command starting with one of them could never be dispatched.
pub const BUILTIN_ACTIONS: &[&str] = &["build", "create", "new", "tree", "ls"];

/// Placeholder replaced with the running operating system in binary templates.
pub const OS_PLACEHOLDER: &str = "${so}";

/// The config file a formula uses when its definition doesn't name one.
pub const DEFAULT_CONFIG: &str = "config.json";

/// Directory (inside the installation home) holding installed formulas.
pub const FORMULAS_DIR: &str = "formulas";

/// Directory (inside a formula directory) holding its binaries.
pub const BIN_DIR: &str = "bin";

/// Directory (inside a workspace formula) holding its sources.
pub const SRC_DIR: &str = "src";

/// Directory (inside the installation home) holding one folder per repository.
pub const REPO_DIR: &str = "repo";

/// The repository name reserved for formulas built from a local workspace.
pub const LOCAL_REPO: &str = "local";

/// The name of a repository's command tree document.
pub const TREE_FILENAME: &str = "tree.json";

/// Directory (inside a workspace) holding the workspace's tree document.
pub const WORKSPACE_TREE_DIR: &str = "tree";

/// The default formula workspace (inside the installation home).
pub const LOCAL_WORKSPACE_DIR: &str = "formulas-local";

/// Directory (inside the installation home) holding per-run scratch directories.
pub const TMP_DIR: &str = "tmp";

/// The settings file of an installation.
pub const SETTINGS_FILENAME: &str = "settings.toml";

/// The context provider's document.
pub const CONTEXTS_FILENAME: &str = "contexts";

/// The environment file handed to the sandbox runtime.
pub const ENV_FILENAME: &str = ".env";

/// Present in a formula's bin directory when it can run sandboxed.
pub const DOCKERFILE: &str = "Dockerfile";

/// The workspace build file whose presence marks a formula workspace.
pub const MAKEFILE: &str = "Makefile";

/// Lock taken while build output is synced into the installation.
pub const BUILD_LOCK_FILENAME: &str = ".build.lock";

/// Environment variable carrying the directory the formula works in.
pub const PWD_ENV: &str = "PWD";

/// Environment variable carrying the active context name.
pub const CTX_ENV: &str = "CONTEXT";

/// Environment variable overriding the installation home.
pub const HOME_ENV: &str = "RIT_HOME";

/// The installation home directory name under the user's home.
pub const HOME_DIRNAME: &str = ".rit";

/// Maximum number of remembered values per input.
pub const DEFAULT_CACHE_QTD: usize = 5;

/// Label of the "enter something else" option shown next to cached values.
pub const DEFAULT_CACHE_NEW_LABEL: &str = "Type new value?";
