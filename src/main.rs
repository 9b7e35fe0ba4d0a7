use std::io;
use std::process::ExitCode;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use log::debug;

use webcapture::cli::Cli;
use webcapture::{new_renderer, run_capture, EngineConfig};

#[cfg(not(any(feature = "rfengine", feature = "cdp")))]
compile_error!("enable at least one backend feature: `rfengine` or `cdp`");

fn init_logging(cli: &Cli) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level().to_string())),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn capture(cli: &Cli) -> anyhow::Result<()> {
    let request = cli.to_request()?;

    let mut config = EngineConfig::default();
    if let Some(ua) = &cli.user_agent {
        config.user_agent = ua.clone();
    }
    let renderer = new_renderer(config).context("could not start the renderer")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("could not start the event loop")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = runtime.block_on(run_capture(request, renderer, &mut out)) {
        // A capture that ran and failed still exits 0
        eprintln!("{}", e);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
            let _ = e.print();
            return code;
        }
    };

    if cli.url.is_none() {
        let _ = Cli::command().print_help();
        return ExitCode::FAILURE;
    }

    init_logging(&cli);
    debug!("{:?}", cli);

    match capture(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
