//! Command line front end for the api-manager connectors.

pub mod cli;
pub mod commands;
