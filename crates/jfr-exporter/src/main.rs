use anyhow::Result;
use clap::Parser;
use jfr_exporter::app;
use jfr_exporter::config::Cli;
use tracing_subscriber::filter::LevelFilter;
use utils::version;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();
    utils::logging::init(if cli.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    });

    tracing::info!(
        branch = version::branch().unwrap_or("unknown"),
        "Starting jfr-exporter {}",
        &**version::VERSION
    );

    app::run(&cli)?;
    Ok(())
}
