use clap::Parser;

use llm_relay::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    llm_relay::init_tracing(&config.logging)?;
    llm_relay::run(config).await
}
