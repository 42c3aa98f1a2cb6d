use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use anyhow::Result;
use influx_writer::HttpConfig;
use influx_writer::HttpTransport;
use influx_writer::InfluxWriter;
use influx_writer::LineProtocolEncoder;
use jfr_types::MetricSink;
use tracing::info;
use tracing::warn;

use crate::config::Cli;
use crate::handlers;
use crate::registry::HandlerRegistry;
use crate::sink::LogSink;
use crate::source::JsonLinesSource;
use crate::source::RunSummary;

type HttpWriter = InfluxWriter<HttpTransport>;

/// Build the pipeline described by `cli` and feed the event stream through it.
///
/// The writer is closed, flushing buffered points, even when reading fails.
pub fn run(cli: &Cli) -> Result<RunSummary> {
    let start = Instant::now();

    let writer = match cli.http_config() {
        Some(config) => Some(Arc::new(connect(cli, &config)?)),
        None => {
            info!("no InfluxDB url given, metric points are only logged");
            None
        }
    };
    let sink: Arc<dyn MetricSink> = match &writer {
        Some(writer) => writer.clone(),
        None => Arc::new(LogSink),
    };

    let mut registry = HandlerRegistry::new();
    registry.register_all(handlers::builtin(sink, cli.handler_settings()));
    info!(event_types = registry.len(), "handlers registered");

    let result = read_events(cli, &registry, cli.deadline(start));

    if let Some(writer) = &writer {
        writer.close();
    }
    result
}

fn connect(cli: &Cli, config: &HttpConfig) -> Result<HttpWriter> {
    let transport = HttpTransport::new(config)
        .map_err(|e| anyhow::anyhow!("Failed to create InfluxDB transport: {e:?}"))?;
    if let Err(err) = transport.ping() {
        warn!(url = %config.url, error = ?err, "InfluxDB is not healthy, points may be lost");
    }

    let encoder = LineProtocolEncoder::new(cli.origin_tags(), !cli.disable_stack_traces);
    Ok(InfluxWriter::new(encoder, cli.batch_config(), transport))
}

fn read_events(
    cli: &Cli,
    registry: &HandlerRegistry,
    deadline: Option<Instant>,
) -> Result<RunSummary> {
    if cli.reads_stdin() {
        info!("reading events from stdin");
        consume(std::io::stdin().lock(), registry, deadline)
    } else {
        let file = File::open(&cli.input)
            .with_context(|| format!("open event file {}", cli.input.display()))?;
        info!(input = %cli.input.display(), "reading events from file");
        consume(BufReader::new(file), registry, deadline)
    }
}

fn consume(
    reader: impl BufRead,
    registry: &HandlerRegistry,
    deadline: Option<Instant>,
) -> Result<RunSummary> {
    let mut source = JsonLinesSource::new(reader);
    registry.subscribe(&mut source);
    source
        .run(registry, deadline)
        .map_err(|e| anyhow::anyhow!("Failed to read events: {e:?}"))
}
