mod args;
use args::Args;

mod core;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let workload = workload::try_named(&args.workload)
        .with_context(|| format!("`{}` is not a known workload", args.workload))?;

    let config = core::Config {
        address: args.address,
        aux: args.aux,
        connect_timeout: Duration::from_secs(args.connect_timeout),
        delay: Duration::from_secs(args.delay),
    };

    core::run(config, workload).await
}
