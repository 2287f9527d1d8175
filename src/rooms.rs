use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

/// Identity of one live connection. Handed out once per accepted socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

impl ConnId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-connection output channel. Lines queued here are drained by the
/// connection's writer task, which appends the newline and writes to the
/// socket, so a queued line always arrives intact.
pub type Outbox = mpsc::UnboundedSender<String>;

/// The fixed set of chat rooms. Rooms exist for the whole process lifetime;
/// nothing creates or destroys them at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomName {
    Aitu,
    Nu,
    Enu,
}

impl RoomName {
    pub const ALL: [RoomName; 3] = [RoomName::Aitu, RoomName::Nu, RoomName::Enu];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoomName::Aitu => "AITU",
            RoomName::Nu => "NU",
            RoomName::Enu => "ENU",
        }
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomName {
    type Err = JoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoomName::ALL
            .into_iter()
            .find(|room| room.as_str() == s)
            .ok_or_else(|| JoinError::UnknownRoom(s.to_string()))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum JoinError {
    #[error("no such room: {0}")]
    UnknownRoom(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum BroadcastError {
    #[error("connection {0} is not in any room")]
    NotInRoom(ConnId),
}

/// Room directory: which connections are members of which room, plus the
/// fan-out of a message to a room.
///
/// Everything lives under a single mutex. Join, leave, room resolution and
/// the whole of one broadcast (membership scan plus every per-recipient
/// enqueue) run inside one critical section, so membership never changes
/// while a broadcast is enumerating it and two broadcasts to the same room
/// cannot interleave their deliveries.
#[derive(Clone)]
pub struct RoomDirectory {
    rooms: Arc<Mutex<HashMap<RoomName, HashMap<ConnId, Outbox>>>>,
}

impl Default for RoomDirectory {
    fn default() -> Self {
        let rooms = RoomName::ALL
            .into_iter()
            .map(|room| (room, HashMap::new()))
            .collect();

        Self {
            rooms: Arc::new(Mutex::new(rooms)),
        }
    }
}

impl RoomDirectory {
    /// Puts `conn` into the named room and returns the room name for the
    /// caller's acknowledgment line. A connection is a member of at most one
    /// room, so joining removes it from any room it was in before.
    pub async fn join(&self, conn: ConnId, outbox: Outbox, name: &str) -> Result<RoomName, JoinError> {
        let room = name.parse::<RoomName>()?;

        let mut rooms = self.rooms.lock().await;

        for members in rooms.values_mut() {
            members.remove(&conn);
        }
        rooms
            .get_mut(&room)
            .expect("fixed room set")
            .insert(conn, outbox);

        Ok(room)
    }

    /// Removes `conn` from every room. Idempotent; called on disconnect.
    pub async fn leave(&self, conn: ConnId) {
        let mut rooms = self.rooms.lock().await;
        for members in rooms.values_mut() {
            members.remove(&conn);
        }
    }

    /// The room `conn` currently belongs to, if any. Scans the rooms in
    /// declaration order, so the answer is deterministic.
    pub async fn resolve_room(&self, conn: ConnId) -> Option<RoomName> {
        let rooms = self.rooms.lock().await;
        Self::resolve_locked(&rooms, conn)
    }

    /// Queues `line` to every member of the sender's room except the sender
    /// itself. Returns how many members it was delivered to.
    ///
    /// A recipient whose outbox is gone (its writer task already died) is
    /// skipped with a warning; its own session handler notices the dead
    /// connection on its next read and cleans up. One bad recipient never
    /// stops delivery to the rest.
    pub async fn broadcast(&self, sender: ConnId, line: &str) -> Result<usize, BroadcastError> {
        let rooms = self.rooms.lock().await;

        let room = Self::resolve_locked(&rooms, sender).ok_or(BroadcastError::NotInRoom(sender))?;

        let mut delivered = 0;
        for (id, outbox) in &rooms[&room] {
            if *id == sender {
                continue;
            }
            if outbox.send(line.to_string()).is_ok() {
                delivered += 1;
            } else {
                tracing::warn!(conn = %id, room = %room, "dropping delivery to dead connection");
            }
        }

        Ok(delivered)
    }

    fn resolve_locked(
        rooms: &HashMap<RoomName, HashMap<ConnId, Outbox>>,
        conn: ConnId,
    ) -> Option<RoomName> {
        RoomName::ALL
            .into_iter()
            .find(|room| rooms[room].contains_key(&conn))
    }

    #[cfg(test)]
    pub async fn member_count(&self, room: RoomName) -> usize {
        self.rooms.lock().await[&room].len()
    }
}
