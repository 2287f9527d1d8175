//! Chat relay server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin banter-server
//! cargo run --bin banter-server -- --host 127.0.0.1 --port 9000
//! ```

use banter::{logger, registry::ConnectionRegistry, rooms::RoomDirectory, server};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "banter-server")]
#[command(about = "Multi-room TCP chat server", long_about = None)]
struct Args {
    /// Host address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short = 'p', long, default_value_t = 8888)]
    port: u16,
}

#[tokio::main]
async fn main() {
    logger::init("info");

    let args = Args::parse();
    let listen_addr = format!("{}:{}", args.host, args.port);

    let registry = ConnectionRegistry::default();
    let rooms = RoomDirectory::default();

    if let Err(err) = server::run(&listen_addr, registry, rooms).await {
        tracing::error!("server error: {err:?}");
        std::process::exit(1);
    }
}
