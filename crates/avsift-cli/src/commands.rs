use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "avsift")]
#[command(about = "Sorts a media library into titles by identifier", long_about = None)]
pub struct Cli {
    /// Configuration file to load instead of ./Config.*
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan directories and group their files into titles (configured roots by default)
    Scan {
        roots: Vec<PathBuf>,
        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the identifier and category of each path
    Id {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Look up the subtitle for an identifier under a directory
    Subtitle { dir: PathBuf, identifier: String },
    /// Print configuration values
    PrintConfig,
}
