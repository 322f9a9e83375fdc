//! csvpp - compile csv++ templates into CSV

use anyhow::Context;
use clap::Parser;
use log::info;
use std::io::Write;

use csvpp::cli::Cli;
use csvpp::config::{build_options, load_config};
use csvpp_core::storage::{render_csv, write_csv_file};

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let options = build_options(&cli, config)?;

    let level = if options.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let template = csvpp_core::compile_file(&cli.input, &options)?;

    match &options.output {
        Some(path) => {
            write_csv_file(path, &template, &options)?;
            info!("wrote {}", path.display());
        }
        None => {
            let csv = render_csv(&template, &options)?;
            std::io::stdout()
                .lock()
                .write_all(csv.as_bytes())
                .context("writing to stdout")?;
        }
    }
    Ok(())
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
