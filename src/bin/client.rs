//! Terminal chat client.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin banter-client
//! cargo run --bin banter-client -- --server 127.0.0.1:9000
//! ```

use banter::{client, logger};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "banter-client")]
#[command(about = "Terminal client for the banter chat server", long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:8888")]
    server: String,
}

#[tokio::main]
async fn main() {
    logger::init("warn");

    let args = Args::parse();

    if let Err(err) = client::run(&args.server).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
