use std::path::PathBuf;

use clap::Parser;

/// Terminal client for a streaming conversational assistant.
#[derive(Parser, Debug)]
#[command(name = "parlance", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding conversation history and the image log.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Log level override (debug, info, warn, error, or a filter directive).
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}
