use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The address of the coordinator to pull work from.
    #[arg(short = 'j', long = "join", default_value = "127.0.0.1:5000")]
    pub address: String,

    /// Name of the workload to run (`wc`, `keyword`).
    #[arg(short, long, default_value = "wc")]
    pub workload: String,

    /// Auxiliary argument handed to the map function, e.g. the keyword
    /// for the `keyword` workload.
    #[arg(short, long, default_value = "")]
    pub aux: String,

    /// Seconds to wait for the TCP connection to be established.
    #[arg(long, default_value = "10")]
    pub connect_timeout: u64,

    /// Artificial delay in seconds before each reply, for exercising the
    /// coordinator's straggler handling.
    #[arg(long, default_value = "0")]
    pub delay: u64,
}
