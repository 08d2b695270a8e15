// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use qrscan::backends::camera::types::Facing;
use qrscan::config::Config;
use qrscan::i18n;
use qrscan::terminal::{self, ScanOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

mod cli;

#[derive(Parser)]
#[command(name = "qrscan")]
#[command(about = "Scan QR codes with a camera, right in the terminal")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan with the camera (default)
    Scan {
        /// Exit and print the text after the first code
        #[arg(long)]
        once: bool,

        /// Camera facing direction: environment (back) or user (front)
        #[arg(long)]
        facing: Option<Facing>,
    },

    /// List available cameras
    List,

    /// Decode QR codes in an image file
    Decode {
        /// Image to decode
        image: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    init_logging(config.log_file.as_deref())?;

    // Get the system's preferred languages.
    let requested_languages = i18n_embed::DesktopLanguageRequester::requested_languages();
    i18n::init(&requested_languages);

    match cli.command {
        None => terminal::run(
            config,
            ScanOptions {
                config_path: cli.config,
                ..ScanOptions::default()
            },
        ),
        Some(Commands::Scan { once, facing }) => terminal::run(
            config,
            ScanOptions {
                once,
                facing,
                config_path: cli.config,
            },
        ),
        Some(Commands::List) => cli::list_cameras(&config),
        Some(Commands::Decode { image }) => cli::decode_image(&image, &config),
    }
}

/// Initialize logging
///
/// Set RUST_LOG environment variable to control log level.
/// Examples: RUST_LOG=debug, RUST_LOG=qrscan=debug, RUST_LOG=info
fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_level(true)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .init();
        }
    }

    Ok(())
}
