use std::sync::Arc;

use dashmap::DashMap;

use crate::rooms::ConnId;

/// One record per live connection. The username stays empty until the first
/// line arrives on the wire.
#[derive(Debug, Clone)]
pub struct Client {
    pub username: String,
}

/// Tracks every live connection and its display name. Independent of the room
/// directory's lock; each operation here touches a single key and stands on
/// its own.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    clients: Arc<DashMap<ConnId, Client>>,
}

impl ConnectionRegistry {
    /// Records a freshly accepted connection with an empty username.
    pub fn register(&self, conn: ConnId) {
        self.clients.insert(
            conn,
            Client {
                username: String::new(),
            },
        );
    }

    /// Sets the display name. The session handler calls this exactly once,
    /// on the connection's first line.
    pub fn set_username(&self, conn: ConnId, name: &str) {
        if let Some(mut client) = self.clients.get_mut(&conn) {
            client.username = name.to_string();
        }
    }

    /// The display name, once set. `None` for an unknown connection or one
    /// that has not sent its username line yet.
    pub fn username(&self, conn: ConnId) -> Option<String> {
        self.clients
            .get(&conn)
            .filter(|client| !client.username.is_empty())
            .map(|client| client.username.clone())
    }

    /// Drops the record. No-op if the connection was already removed.
    pub fn unregister(&self, conn: ConnId) {
        self.clients.remove(&conn);
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
