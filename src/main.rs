/*!
 * OSS Simulator - Main Entry Point
 *
 * Parses the command line, opens the simulation log, wires the shutdown
 * sources and runs the controller until the simulated end, Ctrl-C or the
 * wall-clock limit.
 */

use clap::error::ErrorKind;
use clap::Parser;
use miette::{miette, IntoDiagnostic};
use oss_sim::clock::SimTime;
use oss_sim::core::limits::{
    DEFAULT_END_TIME_SECS, DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_TOTAL_SPAWNS, DEFAULT_SIM_END_SECS,
    MAX_RESOURCE_TYPES,
};
use oss_sim::monitoring::RunSpan;
use oss_sim::{
    init_tracing, install_handlers, simulate, ConfigError, EventLog, FileSink, RunSummary,
    ShutdownSignal, SimConfig, SimError,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Instrument};

/// oss: simulated operating-system scheduler
///
/// A controller spawns up to `max-concurrent` simulated processes that share
/// a logical clock and request resources from it. Requests are granted only
/// when the Banker's algorithm finds the resulting state safe.
#[derive(Debug, Parser)]
#[command(version)]
struct Opts {
    /// Maximum number of simultaneously live processes (1..=17)
    #[arg(short = 's', long, env = "OSS_MAX_CONCURRENT", default_value_t = DEFAULT_MAX_CONCURRENT)]
    max_concurrent: usize,

    /// Wall-clock limit for the whole run, in seconds
    #[arg(short = 't', long, env = "OSS_END_TIME", default_value_t = DEFAULT_END_TIME_SECS)]
    end_time: u64,

    /// Simulation log file
    #[arg(short = 'l', long, env = "OSS_LOG_FILE")]
    log_file: PathBuf,

    /// Simulated time at which the run ends, in seconds
    #[arg(long, env = "OSS_SIM_END_SECONDS", default_value_t = DEFAULT_SIM_END_SECS)]
    sim_end_seconds: u64,

    /// Number of resource kinds (1..=20)
    #[arg(long, env = "OSS_RESOURCES", default_value_t = MAX_RESOURCE_TYPES)]
    resources: usize,

    /// Lifetime cap on spawned processes, 0 for unlimited
    #[arg(long, env = "OSS_MAX_TOTAL_SPAWNS", default_value_t = DEFAULT_MAX_TOTAL_SPAWNS)]
    max_total_spawns: usize,

    /// Seed for a reproducible run
    #[arg(long, env = "OSS_SEED")]
    seed: Option<u64>,

    /// Print the run summary as JSON on exit
    #[arg(long, env = "OSS_JSON_SUMMARY")]
    json_summary: bool,
}

impl Opts {
    fn config(&self) -> Result<SimConfig, ConfigError> {
        if self.end_time == 0 {
            return Err(ConfigError::NonPositiveEndTime);
        }
        SimConfig::builder()
            .max_concurrent(self.max_concurrent)
            .wall_limit(Duration::from_secs(self.end_time))
            .log_file(self.log_file.clone())
            .sim_end(SimTime::from_secs(self.sim_end_seconds))
            .resource_count(self.resources)
            .max_total_spawns((self.max_total_spawns > 0).then_some(self.max_total_spawns))
            .seed(self.seed)
            .build()
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print().into_diagnostic()?;
            return Ok(());
        }
        Err(e) => return Err(ConfigError::Cli(e.to_string()).into()),
    };

    init_tracing();
    let config = opts.config()?;

    let summary = run(config).await?;
    if opts.json_summary {
        println!("{}", serde_json::to_string_pretty(&summary).into_diagnostic()?);
    }

    if summary.is_success() {
        Ok(())
    } else {
        Err(miette!(
            "run ended by {}: {}",
            summary.reason,
            summary.error.as_deref().unwrap_or("no further detail")
        ))
    }
}

async fn run(config: SimConfig) -> Result<RunSummary, SimError> {
    let sink = FileSink::create(&config.log_file)
        .map_err(|e| SimError::resource_init("log file", e.to_string()))?;
    let events = EventLog::new(Arc::new(sink));

    let shutdown = ShutdownSignal::new();
    let watcher = install_handlers(shutdown.clone(), config.wall_limit);

    let run_span = RunSpan::new(config.max_concurrent, config.resource_count);
    info!(
        run_id = %run_span.run_id(),
        log_file = %config.log_file.display(),
        "Simulation starting"
    );

    let summary = simulate(config, events, shutdown)
        .instrument(run_span.span().clone())
        .await?;
    run_span.record_reason(&summary.reason.to_string());
    watcher.abort();

    info!(
        reason = %summary.reason,
        spawned = summary.total_spawned,
        terminated = summary.total_terminated,
        forced = summary.forced_terminations,
        final_time = %summary.final_time,
        "Simulation finished"
    );
    Ok(summary)
}
