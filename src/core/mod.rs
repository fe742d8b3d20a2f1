// src/core/mod.rs

//! Pure domain logic: artifact paths, the command tree, its persistence and
//! formula workspaces. Nothing in here spawns processes.

pub mod commons;
pub mod graph_display;
pub mod paths;
pub mod tree;
pub mod tree_store;
pub mod workspace;
