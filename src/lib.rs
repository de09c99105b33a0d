//! StepDriver command-line front end
//!
//! Loads configuration, wires a browser session to the step interpreter and renders
//! run, audit and normalization reports.

pub mod cli;
pub mod config;

pub use config::Config;
