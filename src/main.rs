mod app;
mod classifier;
mod cli;
mod config;
mod core;
mod discovery;
mod executors;
mod reporters;
mod ui;
mod utils;
mod wordlists;

use clap::Parser;

#[tokio::main]
async fn main() {
    human_panic::setup_panic!();

    let cli = cli::args::Cli::parse();
    if let Err(err) = app::run(cli).await {
        eprintln!("fatal: {:#}", err);
        std::process::exit(1);
    }
}
