// src/system/watcher.rs

//! Rebuilds a workspace formula every time one of its files changes.
//!
//! Closing is checked before every event: once a close is requested no
//! further event is processed, while a build already running completes.
//! Build outcomes are published on a separate report channel and never stop
//! the loop.

use crate::constants::BIN_DIR;
use crate::core::paths::Installation;
use crate::system::builder::{self, BuildError, Builder, Synced};
use crossbeam_channel::{Receiver, Sender, select, unbounded};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher as _};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Formula directory '{path}' does not exist.")]
    FormulaNotFound { path: PathBuf },
    #[error("Could not watch '{path}': {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// The outcome of one watch cycle.
#[derive(Debug)]
pub enum WatchReport {
    Built { formula: String, synced: Synced },
    BuildFailed { formula: String, error: BuildError },
    WatchError(String),
}

/// Stops a running [`Watcher`] from any thread.
#[derive(Debug, Clone)]
pub struct WatchHandle {
    close: Sender<()>,
}

impl WatchHandle {
    pub fn close(&self) {
        if self.close.send(()).is_err() {
            log::debug!("Watcher already stopped.");
        }
    }
}

#[derive(Debug)]
pub struct Watcher<B> {
    installation: Installation,
    builder: B,
    events: Sender<notify::Result<Event>>,
    event_rx: Receiver<notify::Result<Event>>,
    close: Sender<()>,
    close_rx: Receiver<()>,
    reports: Sender<WatchReport>,
}

impl<B: Builder> Watcher<B> {
    /// Creates a watcher and the channel its build reports are sent to.
    pub fn new(installation: Installation, builder: B) -> (Self, Receiver<WatchReport>) {
        let (events, event_rx) = unbounded();
        let (close, close_rx) = unbounded();
        let (reports, report_rx) = unbounded();
        let watcher = Self {
            installation,
            builder,
            events,
            event_rx,
            close,
            close_rx,
            reports,
        };
        (watcher, report_rx)
    }

    pub fn handle(&self) -> WatchHandle {
        WatchHandle {
            close: self.close.clone(),
        }
    }

    /// Watches `<workspace>/<formula_path>` and blocks until the watcher is
    /// closed. Fails only when the watch cannot be registered.
    pub fn watch(&self, workspace: &Path, formula_path: &str) -> Result<(), WatchError> {
        let formula_dir = workspace.join(formula_path);
        let formula_dir = dunce::canonicalize(&formula_dir)
            .map_err(|_| WatchError::FormulaNotFound { path: formula_dir })?;

        let events = self.events.clone();
        let mut fs_watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Err(e) = events.send(res) {
                log::error!("Failed to forward watch event: {e}");
            }
        })
        .map_err(|source| WatchError::Watch {
            path: formula_dir.clone(),
            source,
        })?;
        fs_watcher
            .watch(&formula_dir, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Watch {
                path: formula_dir.clone(),
                source,
            })?;

        log::info!("Watching '{}'", formula_dir.display());
        self.event_loop(workspace, formula_path, &formula_dir.join(BIN_DIR));
        log::info!("Stopped watching '{}'", formula_dir.display());
        Ok(())
    }

    fn event_loop(&self, workspace: &Path, formula_path: &str, bin_dir: &Path) {
        loop {
            select! {
                recv(self.close_rx) -> _ => break,
                recv(self.event_rx) -> message => {
                    // Both channels may be ready at once; close wins.
                    if self.close_requested() {
                        break;
                    }
                    match message {
                        Ok(Ok(event)) => {
                            if triggers_build(&event, bin_dir) {
                                log::debug!("{:?} on {:?}", event.kind, event.paths);
                                let report = self.cycle(workspace, formula_path);
                                self.report(report);
                            }
                        }
                        Ok(Err(e)) => self.report(WatchReport::WatchError(e.to_string())),
                        Err(_) => break,
                    }
                }
            }
        }
    }

    fn close_requested(&self) -> bool {
        self.close_rx.try_recv().is_ok()
    }

    /// One build followed by a sync into the installation.
    fn cycle(&self, workspace: &Path, formula_path: &str) -> WatchReport {
        let result = self
            .builder
            .build(workspace, formula_path)
            .and_then(|()| builder::sync_formula(&self.installation, workspace, formula_path));

        match result {
            Ok(synced) => WatchReport::Built {
                formula: formula_path.to_string(),
                synced,
            },
            Err(error) => {
                log::warn!("Build of '{}' failed: {}", formula_path, error);
                WatchReport::BuildFailed {
                    formula: formula_path.to_string(),
                    error,
                }
            }
        }
    }

    fn report(&self, report: WatchReport) {
        if self.reports.send(report).is_err() {
            log::debug!("Nobody is listening for build reports.");
        }
    }
}

/// Creates, writes, renames and removals trigger a build, unless every path
/// of the event is inside the formula's own build output.
fn triggers_build(event: &Event, bin_dir: &Path) -> bool {
    let relevant_kind = match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    };
    relevant_kind
        && !event.paths.is_empty()
        && event.paths.iter().any(|p| !p.starts_with(bin_dir))
}
