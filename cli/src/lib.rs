use clap::Parser;
use log::LevelFilter;

pub mod command;

/// Merge FictionBook (FB2) books into a single book.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub merge: command::MergeCommand,

    /// Log each merged source and skipped binary
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}
