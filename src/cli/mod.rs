//! Command-line interface module.

mod args;
pub mod cache;
pub mod check;
pub mod common;
pub mod report;
pub mod rewrite;
pub mod serve;
pub mod variants;

pub use args::{Cli, Commands};
