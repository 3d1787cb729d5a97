use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use image_resizer::process::{self, ProcessOptions, Upload};
use image_resizer::sizes::SizeDirectives;
use image_resizer::{config, output, server};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "image-resizer")]
#[command(about = "Upload an image, get it back with resized renditions as data URIs")]
#[command(long_about = "\
Upload an image, get it back with resized renditions as data URIs

POST a multipart form to /upload:

  file         the image (required)
  sizes        preset names or widths: thumbnail,medium,640 or [\"large\",\"999\"]
  customSizes  [{\"width\":300,\"height\":300}]
  custom       {\"width\":300,\"height\":200}  (legacy single size)
  format       jpg | jpeg | png  (default: keep JPEG/PNG uploads, else PNG)

Presets: thumbnail=100, medium=500, large=1000 pixels wide.
With no usable sizes the response carries thumbnail, medium and large.

Run 'image-resizer gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (optional; defaults apply when missing)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Log filter, e.g. `info` or `image_resizer=debug`
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Run the resize pipeline on a local file
    Resize(ResizeArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct ResizeArgs {
    /// Image file to process
    file: PathBuf,

    /// Preset names or pixel widths, comma-separated or a JSON array
    #[arg(long)]
    sizes: Option<String>,

    /// JSON array of {"width":W,"height":H}
    #[arg(long)]
    custom_sizes: Option<String>,

    /// Legacy single {"width":W,"height":H}
    #[arg(long)]
    custom: Option<String>,

    /// Output format override: jpg, jpeg or png
    #[arg(long)]
    format: Option<String>,

    /// Declared content type (guessed from the file extension when omitted)
    #[arg(long)]
    content_type: Option<String>,

    /// Print the full JSON response instead of a summary
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            init_tracing(&cli.log_level);
            let config = config::load_config_with_env(&cli.config)
                .with_context(|| format!("loading {}", cli.config.display()))?;
            init_thread_pool(&config.processing);
            info!(
                port = config.server.port,
                cors_origin = %config.server.cors_origin,
                max_upload_bytes = config.server.max_upload_bytes,
                "Loaded configuration"
            );
            server::start_server(config).await?;
        }
        Command::Resize(args) => {
            init_tracing(&cli.log_level);
            let config = config::load_config(&cli.config)
                .with_context(|| format!("loading {}", cli.config.display()))?;
            init_thread_pool(&config.processing);
            run_resize(&args, ProcessOptions::from_images_config(&config.images))?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn run_resize(args: &ResizeArgs, options: ProcessOptions) -> Result<()> {
    let bytes =
        std::fs::read(&args.file).with_context(|| format!("reading {}", args.file.display()))?;
    let filename = args
        .file
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content_type = args
        .content_type
        .clone()
        .unwrap_or_else(|| guess_content_type(&args.file).to_string());

    let directives = SizeDirectives {
        sizes: args.sizes.clone(),
        custom_sizes: args.custom_sizes.clone(),
        custom: args.custom.clone(),
        format: args.format.clone(),
    };
    let upload = Upload {
        bytes: &bytes,
        content_type: &content_type,
        filename: &filename,
    };
    let document = process::process_upload(upload, &directives, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        output::print_resize_summary(&document);
    }
    Ok(())
}

/// Content type a browser would declare for this file, by extension.
fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// JSON logs to stderr, so `resize --json` output stays clean on stdout.
fn init_tracing(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .json()
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the config can only lower it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
