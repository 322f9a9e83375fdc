//! csvpp - command-line front end for the csv++ compiler.

pub mod cli;
pub mod config;
pub mod error;
