//! flatscout-sw: inspect the FlatScout worker's routing, notification and
//! cache decisions from the command line.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
