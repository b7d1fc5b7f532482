use clap::{Parser, Subcommand};
use darkroom::config::{self, ConfigError, ProcessorConfig};
use darkroom::imaging::{ImageProcessor, ProcessorError, RustProcessor};
use darkroom::manipulator::{Dispatcher, Manipulator, ProcessSpec};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    #[error("invalid parameter '{0}': expected key=value")]
    Param(String),
}

#[derive(Parser)]
#[command(name = "darkroom")]
#[command(about = "Crop, resize, grayscale and watermark PNG/JPEG images")]
#[command(long_about = "\
Crop, resize, grayscale and watermark PNG/JPEG images

Parameters for 'process' follow the image proxy query string:

  w=<px>            target width  (0-9999, anything else means unset)
  h=<px>            target height (0-9999, anything else means unset)
  fit=crop          cover-resize then crop to exactly w x h
  crop=<anchor>     top | bottom | left | right | top,left | top,right
                    bottom,left | bottom,right  (default: center)
  mono=000000       convert to grayscale

Fully opaque PNGs are written as JPEG.

Run 'darkroom gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level, including per-step timings
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an image through the crop/resize/grayscale pipeline
    Process {
        /// Source image
        input: PathBuf,
        /// Destination file
        #[arg(short, long)]
        output: PathBuf,
        /// Request parameter as key=value (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
        /// Telemetry scope attached to metrics
        #[arg(long, default_value = "cli")]
        scope: String,
    },
    /// Composite an overlay centered on a base image at half its width
    Watermark {
        /// Base image
        base: PathBuf,
        /// Overlay image
        overlay: PathBuf,
        /// Destination file
        #[arg(short, long)]
        output: PathBuf,
        /// Overlay opacity, 0 (invisible) to 255 (overlay's own alpha)
        #[arg(long, default_value_t = 128)]
        opacity: u8,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Process {
            input,
            output,
            params,
            scope,
        } => {
            let config = config::load_config(cli.config.as_deref())?;
            init_thread_pool(&config);
            let params = parse_params(&params)?;
            let spec = ProcessSpec {
                scope,
                image_data: std::fs::read(&input)?,
                params,
            };
            let dispatcher = Dispatcher::with_metrics(
                build_processor(&config),
                config.metrics.build_sink(),
            );
            let bytes = dispatcher.process(&spec)?;
            std::fs::write(&output, &bytes)?;
            tracing::info!(output = %output.display(), bytes = bytes.len(), "wrote image");
        }
        Command::Watermark {
            base,
            overlay,
            output,
            opacity,
        } => {
            let config = config::load_config(cli.config.as_deref())?;
            let processor = build_processor(&config);
            let bytes =
                processor.watermark(&std::fs::read(&base)?, &std::fs::read(&overlay)?, opacity)?;
            std::fs::write(&output, &bytes)?;
            tracing::info!(output = %output.display(), bytes = bytes.len(), "wrote image");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(config: &ProcessorConfig) {
    let threads = config::effective_threads(&config.processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn build_processor(config: &ProcessorConfig) -> RustProcessor {
    RustProcessor::with_settings(config.encode_settings(), config.metrics.build_sink())
}

/// Split repeated `key=value` arguments into a parameter map. Later keys win.
fn parse_params(raw: &[String]) -> Result<HashMap<String, String>, CliError> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| CliError::Param(pair.clone()))
        })
        .collect()
}
