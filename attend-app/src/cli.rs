use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Attention assessment in the terminal")]
pub struct Args {
    /// Path to a session config TOML (defaults apply when omitted)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Block order, e.g. ABC, CBA or A (overrides config)
    #[arg(long)]
    pub blocks: Option<String>,

    /// Length of each block in milliseconds (overrides config)
    #[arg(long)]
    pub block_duration_ms: Option<u64>,

    /// Seed for a reproducible trial sequence
    #[arg(long)]
    pub seed: Option<u64>,

    /// Where to write the trial table
    #[arg(long, default_value = "attend_results.csv")]
    pub csv: PathBuf,

    /// Where to write the full record list
    #[arg(long, default_value = "attend_results.json")]
    pub json: PathBuf,
}
