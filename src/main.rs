use clap::Parser;
use jdk_installer::cli::{Cli, CommandHandler};
use jdk_installer::core::constants::env::LOG_FILTER;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_env(LOG_FILTER).unwrap_or_else(|_| EnvFilter::new("jdk_installer=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let operation = cli.command.operation();

    let mut handler = match CommandHandler::new(cli.config) {
        Ok(handler) => handler,
        Err(e) => {
            eprint!("{}", e.with_context("加载配置").user_message());
            process::exit(1);
        }
    };

    if let Err(e) = handler.handle_command(cli.command).await {
        eprint!("{}", e.with_context(operation).user_message());
        process::exit(1);
    }
}
