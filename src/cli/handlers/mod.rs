// src/cli/handlers/mod.rs

// One module per built-in action, plus the fallback that runs formulas.

pub mod build;
pub mod commons;
pub mod create;
pub mod run;
pub mod tree;
