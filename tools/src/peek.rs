use clap::Parser;
use epac_sdk::{
    Consumer, Delegation, Error, KeyPair, Name, RequestOptions, transport,
    transport::DEFAULT_FORWARDER,
};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::trace;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "epac-peek", version)]
#[command(
    about = "Fetch one encrypted data item matching the name prefix and write it to standard output",
    long_about = None
)]
#[command(allow_negative_numbers = true)]
struct Cli {
    #[arg(short, long, help = "Print the decrypted payload only, instead of the full packet")]
    payload: bool,
    #[arg(short = 'w', long, value_name = "MS", help = "Timeout in milliseconds")]
    timeout: Option<i64>,
    #[arg(short, long)]
    verbose: bool,
    #[arg(short, long, help = "Set MustBeFresh")]
    fresh: bool,
    #[arg(short, long, help = "Set ChildSelector to rightmost")]
    rightmost: bool,
    #[arg(short, long, value_name = "N", help = "Set MinSuffixComponents")]
    minsuffix: Option<i64>,
    #[arg(short = 'M', long, value_name = "N", help = "Set MaxSuffixComponents")]
    maxsuffix: Option<i64>,
    #[arg(short, long, value_name = "MS", help = "Set InterestLifetime in milliseconds")]
    lifetime: Option<i64>,
    #[arg(long, help = "Read a forwarding hint from a file of `<preference> <name>` lines")]
    link_file: Option<PathBuf>,
    #[arg(long, help = "Decrypt with this private key instead of a generated one")]
    private_key: Option<PathBuf>,
    #[arg(long, env = "EPAC_FORWARDER", default_value = DEFAULT_FORWARDER)]
    forwarder: Url,
    #[arg(help = "Request name, for example ndn:/example/data")]
    name: String,
}

fn non_negative(value: i64, what: &str) -> Result<u64, Error> {
    u64::try_from(value).map_err(|_| Error::Config(format!("{what} must be a non-negative integer")))
}

fn suffix_components(value: i64, what: &str) -> Result<u32, Error> {
    u32::try_from(non_negative(value, what)?)
        .map_err(|_| Error::Config(format!("{what} is too large")))
}

fn read_link_file(path: &Path) -> Result<Vec<Delegation>, Error> {
    let contents = std::fs::read_to_string(path)?;
    let invalid = || Error::Config(format!("cannot read a forwarding hint from {}", path.display()));

    let delegations = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| -> Result<Delegation, Error> {
            let (preference, name) = line.split_once(char::is_whitespace).ok_or_else(invalid)?;

            Ok(Delegation {
                preference: preference.parse().map_err(|_| invalid())?,
                name: name.trim().parse()?,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    if delegations.is_empty() {
        return Err(invalid());
    }

    Ok(delegations)
}

fn request_options(args: &Cli) -> Result<RequestOptions, Error> {
    let name: Name = args.name.parse()?;
    let mut options = RequestOptions::new(name);

    options.payload_only = args.payload;
    options.verbose = args.verbose;
    options.must_be_fresh = args.fresh;
    options.want_rightmost = args.rightmost;

    if let Some(min) = args.minsuffix {
        options.min_suffix_components = Some(suffix_components(min, "MinSuffixComponents")?);
    }

    if let Some(max) = args.maxsuffix {
        options.max_suffix_components = Some(suffix_components(max, "MaxSuffixComponents")?);
    }

    if let Some(lifetime) = args.lifetime {
        options.lifetime = Some(Duration::from_millis(non_negative(
            lifetime,
            "InterestLifetime",
        )?));
    }

    if let Some(timeout) = args.timeout {
        if timeout <= 0 {
            return Err(Error::Config("timeout must be a positive integer".to_string()));
        }
        options.timeout = Some(Duration::from_millis(timeout.unsigned_abs()));
    }

    if let Some(path) = &args.link_file {
        options.forwarding_hint = Some(read_link_file(path)?);
    }

    Ok(options)
}

async fn run(args: Cli) -> Result<i32, Error> {
    let options = request_options(&args)?;

    let keys = match &args.private_key {
        Some(path) => KeyPair::load(path)?,
        None => KeyPair::generate()?,
    };

    let mut face = transport::connect(&args.forwarder).await?;
    trace!("connected to {}", args.forwarder);

    let mut consumer = Consumer::new(options, keys);
    let kind = consumer.start(face.as_mut()).await?.kind();

    consumer.write_output(&mut std::io::stdout().lock())?;

    Ok(kind.exit_code())
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
                    "epac_sdk=trace,epac_peek=trace"
                } else {
                    "epac_sdk=warn,epac_peek=warn"
                }
                .into()
            }),
        )
        .init();

    match run(args).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(exit_code(&e));
        }
    }
}
