use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Retrieve a video as a single playable mp4 file
    Fetch {
        /// Video identifier
        video_id: String,

        /// Output directory for the final file
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Resolve a video's streams and print the choice without downloading
    Resolve {
        /// Video identifier
        video_id: String,

        /// Print the resolved selection as JSON
        #[arg(long)]
        json: bool,
    },

    /// List configured API mirrors in failover order
    Mirrors,
}
