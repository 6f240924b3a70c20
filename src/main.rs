#[macro_use]
extern crate anyhow;

#[macro_use]
extern crate log;

use clap::Parser;
use config::Cli;

mod config;
mod download;
mod error;
mod extract;
mod input;
mod json;
mod overrides;
mod unpack;
mod utils;
mod workspace;

#[cfg(test)]
mod test_support;

fn main() {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    if let Err(e) = run(cli) {
        error!("An error occurred: {:?}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let pack_path = input::resolve_pack_path(cli.pack.clone())?;
    let config = cli.into_config(pack_path);

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(unpack::unpack(&config))?;

    let downloaded = report.downloads.map_or(0, |summary| summary.succeeded);
    info!(
        "Done. {} files extracted, {} overrides copied, {} files downloaded.",
        report.extracted, report.overrides, downloaded
    );
    if let workspace::Cleanup::Retained(left) = &report.cleanup {
        debug!("{} entries left in the work dir", left.len());
    }

    Ok(())
}
