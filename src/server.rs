use anyhow::Result;
use tokio::net::TcpListener;

use crate::registry::ConnectionRegistry;
use crate::rooms::RoomDirectory;

/// Binds `listen_addr` and serves connections until the process exits.
pub async fn run(listen_addr: &str, registry: ConnectionRegistry, rooms: RoomDirectory) -> Result<()> {
    let listener = TcpListener::bind(listen_addr).await?;

    tracing::info!("listening on {}", listener.local_addr()?);

    serve(listener, registry, rooms).await
}

/// Accept loop: one spawned handler task per connection. A handler's failure
/// is logged and never takes down the loop or any other connection.
pub async fn serve(
    listener: TcpListener,
    registry: ConnectionRegistry,
    rooms: RoomDirectory,
) -> Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;

        let registry = registry.clone();
        let rooms = rooms.clone();

        tokio::spawn(async move {
            if let Err(err) = crate::conn::handle(registry, rooms, socket, peer).await {
                tracing::error!(%peer, "connection error: {err:?}");
            }
        });
    }
}
