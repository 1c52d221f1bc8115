//! pcapstream - Replay packet captures through stream and flow reassembly.
//!
//! The heavy lifting lives in [`pcapstream_core`]; this crate holds the
//! command-line front end.
//!
//! # Example
//!
//! ```no_run
//! use pcapstream::cli::{OutputFormat, SummaryListener};
//! use pcapstream_core::{DispatchConfig, Dispatcher, SharedListener};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let summary = Rc::new(RefCell::new(SummaryListener::new(
//!     std::io::stdout(),
//!     OutputFormat::Text,
//!     false,
//! )));
//! let listener: SharedListener = summary.clone();
//! let mut dispatcher = Dispatcher::new(DispatchConfig::default(), listener);
//! dispatcher.read_file("capture.pcap", None).unwrap();
//! summary.borrow_mut().finish(&dispatcher.stats(), None).unwrap();
//! ```

pub mod cli;

pub use pcapstream_core::{Error, Result};
