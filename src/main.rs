//! Command line entry point
//!
//! Reads one monitoring event as JSON from stdin and forwards its metrics to
//! a Graphite collector. Any failure is printed to stderr and the process
//! exits with status 1.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tyl_graphite_handler::{
    Event, GraphiteHandler, HandlerConfig, HandlerErrorExt, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_PREFIX, DEFAULT_PROTOCOL,
};

/// Forward monitoring event metrics to Carbon/Graphite
#[derive(Debug, Parser)]
#[command(name = "tyl-graphite-handler", version, about)]
struct Cli {
    /// The string to be prepended to each metric in graphite
    #[arg(short = 'P', long, env = "GRAPHITE_PREFIX", default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Label names (comma-separated) of entity/check labels added to the prefix
    #[arg(short = 'l', long, env = "GRAPHITE_LABELS", default_value = "")]
    labels: String,

    /// Annotation names (comma-separated) of entity/check annotations added to the prefix
    #[arg(short = 'a', long, env = "GRAPHITE_ANNOTATIONS", default_value = "")]
    annotations: String,

    /// Do not include any prefixes, use the bare point names
    #[arg(short = 'n', long, env = "GRAPHITE_NO_PREFIX")]
    no_prefix: bool,

    /// Count all metrics in the event and append the count as a metric
    #[arg(short = 'c', long, env = "GRAPHITE_COUNT")]
    count: bool,

    /// Prefix for the count metric: labels:label1,label2 or annotations:annotation1,annotation2
    #[arg(short = 's', long, env = "GRAPHITE_COUNT_SCHEME", default_value = "")]
    count_scheme: String,

    /// The port number of the graphite server
    #[arg(short = 'p', long, env = "GRAPHITE_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// The hostname or address of the graphite server
    #[arg(short = 'H', long, env = "GRAPHITE_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// The protocol used to reach the graphite server (tcp or udp)
    #[arg(long, env = "GRAPHITE_PROTOCOL", default_value = DEFAULT_PROTOCOL)]
    protocol: String,

    /// Log filter directive written to stderr (e.g. `info`, `debug`)
    #[arg(long, env = "GRAPHITE_LOG", default_value = "warn")]
    log_level: String,
}

impl From<&Cli> for HandlerConfig {
    fn from(cli: &Cli) -> Self {
        HandlerConfig::default()
            .with_prefix(cli.prefix.clone())
            .with_labels(cli.labels.clone())
            .with_annotations(cli.annotations.clone())
            .with_no_prefix(cli.no_prefix)
            .with_count(cli.count)
            .with_count_scheme(cli.count_scheme.clone())
            .with_collector(cli.host.clone(), cli.port)
            .with_protocol(cli.protocol.clone())
    }
}

fn init_logging(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> tyl_graphite_handler::Result<()> {
    let event = Event::from_reader(std::io::stdin().lock()).map_err(|e| e.with_stage("read event"))?;
    let handler = GraphiteHandler::new(HandlerConfig::from(&cli));

    let report = handler.handle_graphite(&event).await?;
    tracing::debug!(%report, "handler finished");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
