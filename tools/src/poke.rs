use clap::Parser;
use epac_sdk::{
    Error, KeyChain, KeyPair, Name, Provider, ProviderOptions, SigningInfo, transport,
    transport::DEFAULT_FORWARDER,
};
use std::{path::PathBuf, time::Duration};
use tokio::io::AsyncReadExt;
use tracing::{info, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "epac-poke", version)]
#[command(
    about = "Read a payload from stdin, encrypt it and publish it as a single named data packet",
    long_about = None
)]
#[command(allow_negative_numbers = true)]
struct Cli {
    #[arg(short, long, help = "Send the data without waiting for a request")]
    force: bool,
    #[arg(
        short = 'D',
        long,
        help = "Sign with a plain SHA-256 digest instead of an identity key"
    )]
    digest: bool,
    #[arg(short, long, help = "Identity used for signing")]
    identity: Option<String>,
    #[arg(short = 'F', long, help = "Set FinalBlockId to the last component of the name")]
    final_block: bool,
    #[arg(short = 'x', long, value_name = "MS", help = "Set FreshnessPeriod in milliseconds")]
    freshness: Option<i64>,
    #[arg(short = 'w', long, value_name = "MS", help = "Timeout in milliseconds")]
    timeout: Option<i64>,
    #[arg(short, long)]
    verbose: bool,
    #[arg(
        long,
        default_value = ".",
        help = "Directory receiving publicKey.key and privateKey.key"
    )]
    key_dir: PathBuf,
    #[arg(long, env = "EPAC_FORWARDER", default_value = DEFAULT_FORWARDER)]
    forwarder: Url,
    #[arg(help = "Data name, for example ndn:/example/data")]
    name: String,
}

fn milliseconds(value: i64, what: &str) -> Result<Duration, Error> {
    u64::try_from(value)
        .map(Duration::from_millis)
        .map_err(|_| Error::Config(format!("{what} must be a non-negative integer")))
}

fn provider_options(args: &Cli) -> Result<ProviderOptions, Error> {
    let name: Name = args.name.parse()?;
    let mut options = ProviderOptions::new(name);

    options.force = args.force;
    options.set_final_block_id = args.final_block;

    options.signing = match (&args.identity, args.digest) {
        (_, true) => SigningInfo::Digest,
        (Some(identity), false) => SigningInfo::Identity(identity.parse()?),
        (None, false) => SigningInfo::Default,
    };

    if let Some(freshness) = args.freshness {
        options.freshness_period = Some(milliseconds(freshness, "FreshnessPeriod")?);
    }

    if let Some(timeout) = args.timeout {
        options.timeout = Some(milliseconds(timeout, "timeout")?);
    }

    Ok(options)
}

async fn run(args: Cli) -> Result<bool, Error> {
    let options = provider_options(&args)?;

    let keys = KeyPair::generate()?;
    let (public_path, private_path) = keys.save(&args.key_dir)?;
    trace!(
        "saved keys to {} and {}",
        public_path.display(),
        private_path.display()
    );

    let mut key_chain = KeyChain::new();
    if let SigningInfo::Identity(identity) = &options.signing {
        if !key_chain.has_identity(identity) {
            key_chain.create_identity(identity.clone());
            info!("created signing identity {identity}");
        }
    }

    let mut payload = Vec::new();
    tokio::io::stdin().read_to_end(&mut payload).await?;

    let mut provider = Provider::new(options, keys);
    let response = provider.build_response(&payload[..], &key_chain)?;

    let mut face = transport::connect(&args.forwarder).await?;
    provider.run(face.as_mut(), &response).await?;

    Ok(provider.is_data_sent())
}

fn exit_code(error: &Error) -> i32 {
    match error {
        Error::Config(_) | Error::Name(_) => 2,
        _ => 1,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                if args.verbose {
                    "epac_sdk=trace,epac_poke=trace"
                } else {
                    "epac_sdk=warn,epac_poke=warn"
                }
                .into()
            }),
        )
        .init();

    match run(args).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(exit_code(&e));
        }
    }
}
