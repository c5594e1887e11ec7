pub mod app;
pub mod cli;
pub mod config;

pub use crate::app::{execute, run};
pub use crate::cli::{Cli, Command};
pub use crate::config::AppConfig;
