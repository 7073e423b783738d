pub mod input;
pub mod output;
pub mod reader;
pub mod runner;

pub use runner::{RunSummary, Runner};
