use std::net::SocketAddr;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;

use crate::protocol::{self, Inbound};
use crate::registry::ConnectionRegistry;
use crate::rooms::{ConnId, Outbox, RoomDirectory};

/// Runs one connection from accept to close: reads lines, dispatches them,
/// and cleans up membership and registration when the peer goes away.
///
/// All output to the peer flows through the connection's outbox channel and a
/// single writer task, so lines queued by a broadcast and lines queued by this
/// handler (join acks) never interleave mid-line.
pub async fn handle(
    registry: ConnectionRegistry,
    rooms: RoomDirectory,
    socket: TcpStream,
    peer: SocketAddr,
) -> Result<()> {
    let conn = ConnId::next();
    let (reader, mut writer) = socket.into_split();

    let (outbox, mut outbound) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(async move {
        while let Some(line) = outbound.recv().await {
            if let Err(err) = write_line(&mut writer, &line).await {
                // The peer is likely gone; its read loop will see the same
                // and run the cleanup.
                tracing::warn!(%conn, error = %err, "write to client failed");
                break;
            }
        }
    });

    registry.register(conn);
    tracing::info!(%conn, %peer, "client connected");

    let result = session_loop(&registry, &rooms, conn, outbox, reader).await;

    rooms.leave(conn).await;
    registry.unregister(conn);
    tracing::info!(%conn, %peer, "client disconnected");

    // Let the writer drain anything still queued before the socket drops.
    let _ = writer_task.await;

    result
}

async fn write_line(writer: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await
}

async fn session_loop(
    registry: &ConnectionRegistry,
    rooms: &RoomDirectory,
    conn: ConnId,
    outbox: Outbox,
    reader: OwnedReadHalf,
) -> Result<()> {
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // First line from a new connection is its username.
        if registry.username(conn).is_none() {
            registry.set_username(conn, line);
            tracing::info!(%conn, username = line, "username set");
            continue;
        }

        match protocol::classify(line) {
            Ok(Inbound::Join(name)) => match rooms.join(conn, outbox.clone(), &name).await {
                Ok(room) => {
                    tracing::info!(%conn, %room, "joined chat room");
                    let _ = outbox.send(format!("Joined chat room: {room}"));
                }
                Err(err) => {
                    // Rejected silently: the client gets no ack and stays
                    // where it was.
                    tracing::warn!(%conn, error = %err, "join rejected");
                }
            },
            Ok(Inbound::Chat(text)) => {
                let username = registry.username(conn).unwrap_or_default();
                match rooms.broadcast(conn, &format!("{username}: {text}")).await {
                    Ok(delivered) => {
                        tracing::debug!(%conn, delivered, "message relayed");
                    }
                    Err(err) => {
                        tracing::warn!(%conn, error = %err, "message dropped");
                    }
                }
            }
            Err(err) => {
                tracing::warn!(%conn, error = %err, "malformed command");
            }
        }
    }

    Ok(())
}
