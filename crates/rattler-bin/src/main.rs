mod commands;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

#[derive(Debug, clap::Parser)]
#[clap(version, about = "Exercise the rattler package cache pipeline")]
struct App {
    #[clap(flatten)]
    verbose: Verbosity<InfoLevel>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    Fetch(commands::fetch::Opt),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app = App::parse();

    tracing_subscriber::fmt()
        .with_max_level(app.verbose.tracing_level_filter())
        .with_target(false)
        .init();

    match app.command {
        Command::Fetch(opt) => commands::fetch::fetch(opt).await,
    }
}
