use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::core::Config;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The address for the coordinator to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// The port for the coordinator to listen on.
    #[arg(short, long, default_value = "5000")]
    pub port: u16,

    /// Line-oriented input file to split and distribute.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Path the final JSON mapping is written to.
    #[arg(short, long, default_value = "results.json")]
    pub output: PathBuf,

    /// Upper bound on a segment's payload size, in bytes.
    #[arg(short, long, default_value = "65536")]
    pub chunk_size: usize,

    /// Maximum attempts per segment before it is marked permanently failed.
    #[arg(short, long, default_value = "3")]
    pub max_retries: u32,

    /// Seconds to wait for a worker's result before requeueing the segment.
    #[arg(long, default_value = "300")]
    pub receive_timeout: u64,

    /// Maximum number of concurrently running worker sessions.
    #[arg(long, default_value = "16")]
    pub max_sessions: usize,
}

impl Args {
    pub fn into_config(self) -> Config {
        Config {
            host: self.host,
            port: self.port,
            input: self.input,
            output: self.output,
            chunk_size: self.chunk_size,
            max_retries: self.max_retries,
            receive_timeout: Duration::from_secs(self.receive_timeout),
            max_sessions: self.max_sessions,
        }
    }
}
