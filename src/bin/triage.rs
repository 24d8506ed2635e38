//! Runs the dispatcher with configuration from the environment.
//!
//! Reads `TRIAGE_*` variables (and `.env`), logs every dispatch event through
//! `tracing`, runs for `TRIAGE_RUN_SECS` seconds (default 5) or until
//! `TRIAGE_MAX_REQUESTS` requests are consumed, then prints statistics as JSON.

use std::time::Duration;

use anyhow::Context;
use triage_dispatch::builders::DispatcherBuilder;
use triage_dispatch::config::DispatchConfig;
use triage_dispatch::core::{AppResult, TracingEventSink};
use triage_dispatch::util::init_tracing;

fn main() -> AppResult<()> {
    init_tracing("info");

    let config = DispatchConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("loading dispatch configuration")?;
    let run_for = std::env::var("TRIAGE_RUN_SECS")
        .ok()
        .map(|v| v.parse::<u64>())
        .transpose()
        .context("parsing TRIAGE_RUN_SECS")?
        .map_or(Duration::from_secs(5), Duration::from_secs);
    let max_requests = config.max_requests;

    let dispatcher = DispatcherBuilder::new(config)
        .with_sink(TracingEventSink)
        .start()?;

    match max_requests {
        Some(count) => {
            if !dispatcher.wait_for_consumed(count, run_for) {
                tracing::warn!(count, "run time elapsed before all requests were consumed");
            }
        }
        None => std::thread::sleep(run_for),
    }

    dispatcher.shutdown();
    println!("{}", serde_json::to_string_pretty(&dispatcher.stats())?);
    Ok(())
}
