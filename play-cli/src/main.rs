use clap::Parser;
use liar_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    liar_cli::run_main(cli).await
}
