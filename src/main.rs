mod cmd;

use clap::Parser;
use cmd::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Show(a) => a.run(),
        Commands::Optimize(a) => a.run(),
        Commands::Simulate(a) => a.run(),
    }
}
