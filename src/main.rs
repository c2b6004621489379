use clap::{Parser, Subcommand};
use simple_img::config::{self, Config};
use simple_img::delivery::{Deliverer, DeliveryError};
use simple_img::locate::{self, LocateError};
use simple_img::output;
use simple_img::request::{AssetRequest, RequestError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "simple-img")]
#[command(about = "On-demand image delivery: transcode and resize originals, with a disk cache")]
#[command(long_about = "\
On-demand image delivery: transcode and resize originals, with a disk cache

Originals live in one flat directory, one file per asset id:

  dist/images/
  ├── 3f2a-9c.jpg                  # Original, stored format = extension
  ├── 77b0.png
  └── cache/
      ├── 3f2a-9c?width=50.webp    # Transformed result, keyed by request
      └── 77b0?.avif

A request names an asset file (<id>.<format>) plus optional format, width and
height overrides. When only one dimension is given the other follows the
original's aspect ratio; when both are given the image covers that box.

Supported formats: avif, webp, png, jpeg (jpg)

Run 'simple-img gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Originals directory (overrides storage.originals_dir)
    #[arg(long, global = true)]
    originals: Option<PathBuf>,

    /// Cache directory (overrides storage.cache_dir)
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Deliver one asset and write the result to a file
    Fetch {
        /// Asset file name, e.g. 3f2a-9c.webp
        asset_file: String,
        /// Output format (overrides the asset file extension)
        #[arg(long)]
        format: Option<String>,
        /// Target width in pixels
        #[arg(long)]
        width: Option<u32>,
        /// Target height in pixels
        #[arg(long)]
        height: Option<u32>,
        /// Output file (default: <asset id>.<format> in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the originals stored for an asset id
    Locate {
        /// Asset id, e.g. 3f2a-9c
        asset_id: String,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Delivery(e)) => {
            output::print_error(&e);
            ExitCode::FAILURE
        }
        Err(CliError::Other(e)) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
enum CliError {
    Delivery(DeliveryError),
    Other(Box<dyn std::error::Error>),
}

impl From<DeliveryError> for CliError {
    fn from(e: DeliveryError) -> Self {
        CliError::Delivery(e)
    }
}

impl From<RequestError> for CliError {
    fn from(e: RequestError) -> Self {
        CliError::Delivery(e.into())
    }
}

impl From<LocateError> for CliError {
    fn from(e: LocateError) -> Self {
        CliError::Delivery(e.into())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Other(Box::new(e))
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Fetch {
            ref asset_file,
            ref format,
            width,
            height,
            ref output,
        } => {
            let cfg = load_settings(&cli)?;
            let request = AssetRequest::parse(asset_file, format.as_deref(), width, height)?;
            let deliverer = Deliverer::from_config(&cfg.storage);
            let delivery = deliverer.deliver(&request).await?;

            let dest = output
                .clone()
                .unwrap_or_else(|| default_output(&request, delivery.format));
            let mut file = tokio::fs::File::create(&dest).await?;
            let written = delivery.body.write_to(&mut file).await?;
            tokio::io::AsyncWriteExt::flush(&mut file).await?;
            // The process is about to exit; let the cache write land first.
            if let Some(write) = delivery.cache_write
                && let Err(e) = write.await
            {
                tracing::warn!(error = %e, "cache write task failed");
            }
            output::print_delivery(&request, delivery.format, delivery.source, written, &dest);
        }
        Command::Locate { ref asset_id } => {
            let cfg = load_settings(&cli)?;
            let candidates = locate::find_candidates(&cfg.storage.originals_dir, asset_id).await?;
            output::print_candidates(asset_id, &candidates);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }
    Ok(())
}

/// Load the config file, apply directory overrides, start logging.
fn load_settings(cli: &Cli) -> Result<Config, CliError> {
    let mut cfg = config::load_config(&cli.config).map_err(|e| {
        CliError::Other(format!("{}: {}", cli.config.display(), e).into())
    })?;
    if let Some(dir) = &cli.originals {
        cfg.storage.originals_dir = dir.clone();
    }
    if let Some(dir) = &cli.cache {
        cfg.storage.cache_dir = dir.clone();
    }
    init_tracing(&cfg);
    Ok(cfg)
}

fn default_output(request: &AssetRequest, format: simple_img::imaging::ImageFormat) -> PathBuf {
    Path::new(".").join(format!("{}.{}", request.asset_id(), format.extension()))
}

/// Initialize the global subscriber. `RUST_LOG` wins over the config level.
fn init_tracing(cfg: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    // A subscriber may already be installed (tests); the first one wins.
    let _ = if cfg.logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
