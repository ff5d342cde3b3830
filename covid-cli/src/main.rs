//! covid-cli - COVID-19 trends from JHU, HealthData.gov and CDC data.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "covid-cli",
    version,
    about = "COVID-19 case, fatality and hospitalization trends"
)]
struct Cli {
    #[command(flatten)]
    source: covid_cmd::SourceArgs,

    #[command(subcommand)]
    command: covid_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("source options: {:?}", cli.source);
    covid_cmd::run(cli.command, &cli.source).await
}
