//! Driftcast CLI - Command-line interface
//!
//! Runs the streaming service or inspects the media directory.

mod commands;

use clap::Parser;

#[derive(Parser)]
#[command(name = "driftcast")]
#[command(about = "Continuous media streaming from removable storage")]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::handle_command(cli.command).await?;

    Ok(())
}
