mod args;

use args::Args;

mod aggregate;
mod core;
mod session;
mod splitter;
mod task_queue;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    core::run(args.into_config()).await
}
