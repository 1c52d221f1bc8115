//! pcapstream CLI entry point.

use std::cell::RefCell;
use std::io::{self, BufWriter};
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pcapstream::cli::{Args, SummaryListener};
use pcapstream_core::{Dispatcher, SharedListener};

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| args.log_level().into()),
        )
        .init();

    let summary = Rc::new(RefCell::new(SummaryListener::new(
        BufWriter::new(io::stdout()),
        args.format,
        args.show_packets,
    )));
    let listener: SharedListener = summary.clone();
    let mut dispatcher = Dispatcher::new(args.dispatch_config(), listener);
    let filter = args.filter.as_deref();

    let frames = match capture_target(&args)? {
        Target::File(path) => dispatcher
            .read_file(&path, filter)
            .with_context(|| format!("Failed to replay capture: {}", path.display()))?,
        #[cfg(feature = "libpcap")]
        Target::Live(device) => run_live(&mut dispatcher, &device, filter, args.count)?,
    };
    info!(frames, "replay finished");

    let stats = dispatcher.stats();
    let stream_stats = dispatcher.stream_stats();
    summary
        .borrow_mut()
        .finish(&stats, stream_stats.as_ref())
        .context("Failed to write output")?;
    Ok(())
}

enum Target {
    File(std::path::PathBuf),
    #[cfg(feature = "libpcap")]
    Live(String),
}

fn capture_target(args: &Args) -> Result<Target> {
    #[cfg(feature = "libpcap")]
    if let Some(device) = &args.interface {
        return Ok(Target::Live(device.clone()));
    }
    let path = args
        .file
        .clone()
        .context("Capture file required. Use --help for usage.")?;
    Ok(Target::File(path))
}

#[cfg(feature = "libpcap")]
fn run_live(
    dispatcher: &mut Dispatcher,
    device: &str,
    filter: Option<&str>,
    count: Option<usize>,
) -> Result<usize> {
    use pcapstream_core::SourceSpec;

    dispatcher
        .open(&SourceSpec::live(device), filter)
        .with_context(|| format!("Failed to open interface: {}", device))?;

    let mut frames = 0;
    let result = loop {
        match dispatcher.read_all() {
            Ok(n) => frames += n,
            Err(e) => break Err(e),
        }
        if count.map_or(false, |limit| frames >= limit) {
            break Ok(frames);
        }
    };
    dispatcher.flush();
    dispatcher.close()?;
    result.with_context(|| format!("Capture failed on {}", device))
}
