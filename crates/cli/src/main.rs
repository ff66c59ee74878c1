mod cli;
mod config;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    //  Logging (stderr, so stdout stays machine-readable)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,sd_inspect=info,sd_meta=info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if args.global.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match args.command {
        cli::Commands::Inspect(a) => cli::inspect::execute(args.global, a).await,
        cli::Commands::Scan(a) => cli::scan::execute(args.global, a).await,
        cli::Commands::Signatures => cli::signatures::execute(args.global).await,
        cli::Commands::Config(c) => cli::config_cmd::execute(c).await,
    }
}
