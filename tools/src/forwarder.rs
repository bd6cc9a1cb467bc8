use clap::Parser;
use epac_sdk::{Error, Forwarder};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "epac-forwarder", version)]
#[command(about = "Route named requests and responses between local faces", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "127.0.0.1:6363", help = "Address to listen on")]
    listen: String,
    #[arg(short, long)]
    verbose: bool,
}

async fn run(args: Cli) -> Result<(), Error> {
    let forwarder = Forwarder::bind(args.listen.as_str()).await?;

    tokio::select! {
        result = forwarder.serve() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().compact().without_time())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                if args.verbose {
                    "epac_sdk=trace,epac_forwarder=trace"
                } else {
                    "epac_sdk=info,epac_forwarder=info"
                }
                .into()
            }),
        )
        .init();

    if let Err(e) = run(args).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
