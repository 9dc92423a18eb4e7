use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod core;
mod matching;
mod parsing;
mod population;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("kinmatch=debug,info")
    } else {
        EnvFilter::new("kinmatch=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Match(args) => {
            cli::match_cmd::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Evaluate(args) => {
            cli::evaluate::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Panel(args) => {
            cli::panel::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
