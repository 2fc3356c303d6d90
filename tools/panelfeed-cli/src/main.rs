//! panelfeed CLI: stream video to a 40x96 LED panel or bake it into frame dumps.
//!
//! Usage:
//!   panelfeed stream <VIDEO>     Stream a video to the panel over serial
//!   panelfeed export <VIDEO>     Export a trimmed clip as a `.bin` frame dump
//!   panelfeed replay <DUMP>      Stream a `.bin` frame dump to the panel
//!   panelfeed preview <VIDEO>    Render one panel frame to a PNG
//!   panelfeed probe <VIDEO>      Show video information
//!   panelfeed ports              List serial ports
//!   panelfeed config show|init   Inspect or create the config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use panelfeed_common::AppConfig;

mod commands;

use commands::{ColorArgs, SourceArgs, TransportArgs, TrimArgs};

#[derive(Parser)]
#[command(
    name = "panelfeed",
    about = "Video to 40x96 RGB LED panel: live serial streaming and frame dumps",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/panelfeed/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a video to the panel in real time
    Stream {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        color: ColorArgs,

        #[command(flatten)]
        transport: TransportArgs,

        #[command(flatten)]
        trim: TrimArgs,

        /// Target frames per second (config: stream.target_fps)
        #[arg(long)]
        fps: Option<u32>,

        /// Stop at the end of the trim window instead of looping
        #[arg(long)]
        no_loop: bool,

        /// Re-read the params file while streaming and apply changes
        #[arg(long, requires = "params")]
        watch_params: bool,
    },

    /// Export the trim window as a raw `.bin` frame dump
    Export {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        color: ColorArgs,

        #[command(flatten)]
        trim: TrimArgs,

        /// Export frame rate (config: export.fps)
        #[arg(long)]
        fps: Option<u32>,

        /// Output directory (config: export.output_dir)
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,

        /// Exact output file, overriding the generated name
        #[arg(short, long, conflicts_with = "output_dir")]
        output: Option<PathBuf>,

        /// Also write a JSON manifest next to the dump
        #[arg(long)]
        manifest: bool,
    },

    /// Stream a previously exported `.bin` dump to the panel
    Replay {
        /// Path to the frame dump
        dump: PathBuf,

        #[command(flatten)]
        transport: TransportArgs,

        /// Frames per second (config: stream.target_fps)
        #[arg(long)]
        fps: Option<u32>,

        /// Play the dump once instead of looping
        #[arg(long)]
        no_loop: bool,
    },

    /// Render the panel image at one position to a PNG
    Preview {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        color: ColorArgs,

        /// Position in seconds
        #[arg(long, default_value = "0.0")]
        at: f64,

        /// Output PNG
        #[arg(short, long, default_value = "preview.png")]
        output: PathBuf,

        /// Integer upscale factor (nearest neighbour)
        #[arg(long, default_value = "1")]
        scale: u32,
    },

    /// Show video information
    Probe {
        /// Path to the video file
        path: PathBuf,
    },

    /// List available serial ports
    Ports,

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write the default configuration to disk
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    panelfeed_common::logging::init_logging(&logging);

    if !matches!(cli.command, Commands::Config { .. }) {
        config.validate()?;
    }

    match cli.command {
        Commands::Stream {
            source,
            color,
            transport,
            trim,
            fps,
            no_loop,
            watch_params,
        } => {
            commands::stream::run(
                &config,
                source,
                color,
                transport,
                trim,
                fps,
                no_loop,
                watch_params,
            )
            .await
        }
        Commands::Export {
            source,
            color,
            trim,
            fps,
            output_dir,
            output,
            manifest,
        } => {
            commands::export::run(&config, source, color, trim, fps, output_dir, output, manifest)
                .await
        }
        Commands::Replay {
            dump,
            transport,
            fps,
            no_loop,
        } => commands::replay::run(&config, dump, transport, fps, no_loop).await,
        Commands::Preview {
            source,
            color,
            at,
            output,
            scale,
        } => commands::preview::run(source, color, at, output, scale).await,
        Commands::Probe { path } => commands::probe::run(path).await,
        Commands::Ports => commands::ports::run(),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&config, cli.config.as_deref()),
            ConfigAction::Init { force } => commands::config::init(cli.config.as_deref(), force),
        },
    }
}
