use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use screencap_core::config::CaptureConfig;
use screencap_core::{persist_image, CapturedImage, StatusBarMode};
use screencap_platform::screen::Size;

#[cfg(target_os = "linux")]
mod capture;

#[derive(Parser, Debug)]
#[command(name = "screencap")]
#[command(about = "Capture the screen or a single element as PNG")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(long, env = "SCREENCAP_CONFIG_PATH", global = true)]
    config_path: Option<PathBuf>,

    /// Directory to save into (overrides config)
    #[arg(long, env = "SCREENCAP_OUTPUT_DIR", global = true)]
    dir: Option<PathBuf>,

    /// File name (default: screenshot-<timestamp>.png)
    #[arg(long, global = true)]
    name: Option<String>,

    /// Status bar strategy: auto, native or synthesized
    #[arg(long, value_parser = parse_status_bar_mode, global = true)]
    status_bar_mode: Option<StatusBarMode>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "SCREENCAP_LOG_LEVEL", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture the whole screen
    Screen {
        /// Draw a status bar over the top of the screen
        #[arg(long)]
        status_bar: bool,

        /// Sample immediately instead of waiting for pending draws
        #[arg(long)]
        no_wait: bool,

        /// Context width in points; the screen is centered in it
        #[arg(long, requires = "height")]
        width: Option<u32>,

        /// Context height in points
        #[arg(long, requires = "width")]
        height: Option<u32>,
    },
    /// Capture a single element
    Element {
        /// Window id (decimal or 0x hex)
        #[arg(long)]
        window: String,
    },
}

/// Whole-screen capture settings after config and flags are merged
#[derive(Debug, Clone)]
struct ScreenRequest {
    wait_for_updates: bool,
    include_status_bar: bool,
    context_size: Option<Size>,
}

fn parse_status_bar_mode(s: &str) -> Result<StatusBarMode, String> {
    match s {
        "auto" => Ok(StatusBarMode::Auto),
        "native" => Ok(StatusBarMode::Native),
        "synthesized" => Ok(StatusBarMode::Synthesized),
        other => Err(format!("unknown status bar mode {:?}", other)),
    }
}

fn default_file_name() -> String {
    format!(
        "screenshot-{}.png",
        chrono::Local::now().format("%Y%m%d-%H%M%S%.3f")
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(
        "screencap v{} starting (os={}, arch={})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH,
    );

    let config_path = cli
        .config_path
        .clone()
        .unwrap_or_else(CaptureConfig::default_path);

    let mut config = if config_path.exists() {
        info!("loading config from {}", config_path.display());
        CaptureConfig::load(&config_path)?
    } else {
        CaptureConfig::default()
    };

    // CLI args override config file
    if let Some(dir) = cli.dir {
        config.output_dir = Some(dir);
    }
    if let Some(mode) = cli.status_bar_mode {
        config.status_bar = mode;
    }

    let image = match cli.command {
        Commands::Screen {
            status_bar,
            no_wait,
            width,
            height,
        } => {
            let request = ScreenRequest {
                wait_for_updates: config.wait_for_updates && !no_wait,
                include_status_bar: status_bar,
                context_size: width.zip(height).map(|(w, h)| Size::new(w, h)),
            };
            capture_screen(&config, request).await?
        }
        Commands::Element { window } => capture_element(&config, &window).await?,
    };

    let name = cli.name.unwrap_or_else(default_file_name);
    let path = persist_image(&image, &name, config.resolved_output_dir())
        .context("failed to save screenshot")?;
    println!("{}", path.display());
    Ok(())
}

#[cfg(target_os = "linux")]
async fn capture_screen(config: &CaptureConfig, request: ScreenRequest) -> Result<CapturedImage> {
    capture::screen(config, request).await
}

#[cfg(target_os = "linux")]
async fn capture_element(config: &CaptureConfig, window: &str) -> Result<CapturedImage> {
    capture::element(config, window).await
}

#[cfg(not(target_os = "linux"))]
async fn capture_screen(_config: &CaptureConfig, _request: ScreenRequest) -> Result<CapturedImage> {
    anyhow::bail!("screen capture is only implemented for Linux/X11")
}

#[cfg(not(target_os = "linux"))]
async fn capture_element(_config: &CaptureConfig, _window: &str) -> Result<CapturedImage> {
    anyhow::bail!("element capture is only implemented for Linux/X11")
}
