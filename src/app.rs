use std::io::{self, Write};

use anyhow::{Context, Result};
use linetail::LineTail;
use tracing::{info, warn};

use crate::cli::Config;
use crate::filter::LineFilter;

/// Application runtime: plays the host for a `LineTail`, draining it until
/// Ctrl-C and printing each line that passes the filter.
pub async fn run(config: Config) -> Result<()> {
    let filter = LineFilter::new(config.regex.as_deref())?;

    let mut out = io::stdout();
    let printer = move |line: String| -> Result<()> {
        if filter.matches(&line) {
            writeln!(out, "{line}")?;
        }
        Ok(())
    };

    let mut tail = LineTail::local(config.tail, printer);
    tail.setup().context("invalid tail configuration")?;
    tail.activate()
        .await
        .with_context(|| format!("cannot start tailing {}", tail.config().path.display()))?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    // Main loop
    let res = loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("interrupted; stopping");
                break Ok(());
            }
            drained = tail.drain() => {
                if let Err(err) = drained {
                    break Err(err);
                }
            }
        }
    };

    // Always stop the reader and release the filesystem, even after an error
    let stopped = tail.deactivate().await;
    if let Err(err) = tail.teardown().await {
        warn!(error = %err, "teardown failed");
    }
    res.context("tailing failed")?;
    stopped.context("tail reader failed")?;
    Ok(())
}
