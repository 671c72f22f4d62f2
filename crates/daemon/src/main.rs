mod cli;

use clap::Parser;
use owo_colors::OwoColorize;

use cli::op::{Op, OpContext};
use cli::Cli;
use ephemeral_daemon::http_server::api::client::ApiClient;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    let client = match ApiClient::new(&args.remote) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    let ctx = OpContext {
        client,
        config_path: args.config,
    };

    match args.command.execute(&ctx).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}
