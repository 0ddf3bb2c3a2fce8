use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ffplan")]
#[command(about = "Plan ffmpeg transcodes for an H.264/H.265/VP9 resolution ladder", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Debug logging for ffplan (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to read instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Where the source description comes from
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// MediaProbe record as JSON
    #[arg(long, value_name = "FILE")]
    pub probe: Option<PathBuf>,

    /// Saved output of `ffprobe -show_streams -show_format -of json`
    #[arg(long, value_name = "FILE")]
    pub ffprobe: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the ffmpeg passes for one codec and resolution
    Plan {
        #[command(flatten)]
        source: SourceArgs,

        /// Input media path as passed to ffmpeg
        #[arg(short, long)]
        input: PathBuf,

        /// h264, h265 or vp9
        #[arg(short, long)]
        codec: String,

        /// Target height, e.g. 720
        #[arg(short, long)]
        resolution: u32,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Two-pass stats prefix (defaults to <output>.passlog)
        #[arg(long)]
        pass_log: Option<PathBuf>,

        /// Output is a stream chunk (enables fast-start for MP4)
        #[arg(long)]
        chunk: bool,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print plans for every rung of the ladder, highest first
    Ladder {
        #[command(flatten)]
        source: SourceArgs,

        /// Input media path as passed to ffmpeg
        #[arg(short, long)]
        input: PathBuf,

        /// h264, h265 or vp9
        #[arg(short, long)]
        codec: String,

        /// Directory for outputs and pass logs
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Print the plans as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved policy and any corrections made to it
    Policy {
        /// Print the policy as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show config status and location, or create default config if missing
    InitConfig,
}

pub fn parse() -> Cli {
    Cli::parse()
}
