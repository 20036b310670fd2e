//! surveydag CLI - command-line front end for the extraction pipeline.

pub mod cli;
pub mod commands;

pub use cli::{Cli, Command, ExtractArgs, QcArgs};
