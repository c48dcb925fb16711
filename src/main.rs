use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod core;
mod matching;
mod parsing;
mod utils;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity and debug flags
    let debug = matches!(&cli.command, cli::Commands::Type(args) if args.debug);
    let filter = if cli.verbose || debug {
        EnvFilter::new("mhc_typer=debug,info")
    } else {
        EnvFilter::new("mhc_typer=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Type(args) => {
            cli::typing::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Candidates(args) => {
            cli::candidates::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Decompose(args) => {
            cli::decompose::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
