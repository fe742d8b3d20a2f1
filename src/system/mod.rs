//! # System Interaction Layer
//!
//! Everything that touches processes, terminals or the network on behalf of
//! the core.
//!
//! ## Modules
//!
//! - **`executor`**: spawns external commands and reports non-zero exits.
//! - **`prerun`**, **`inputs`**, **`runner`**, **`postrun`**: the three phases
//!   of a formula invocation and the collection of its inputs.
//! - **`builder`** and **`watcher`**: rebuild a workspace formula on every
//!   change and sync it into the installation.
//! - **`context`**, **`fetcher`**, **`settings`**: the collaborators the
//!   engine consumes (active context, remote artifacts, `settings.toml`).

pub mod builder;
pub mod context;
pub mod executor;
pub mod fetcher;
pub mod inputs;
pub mod postrun;
pub mod prerun;
pub mod runner;
pub mod settings;
pub mod watcher;
