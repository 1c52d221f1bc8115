//! Command-line interface module.
//!
//! This module handles:
//! - Argument parsing via clap
//! - Reporting closed streams, datagram groups and totals

mod args;
mod output;

pub use args::Args;
pub use output::{OutputFormat, SummaryListener, Totals};
