//! Command-line front end for the graphloom bulk loader
//!
//! Configuration comes from an optional TOML file overlaid with environment
//! variables; see [`config::CliConfig`].

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod output;
