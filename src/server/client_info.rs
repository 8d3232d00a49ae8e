//! Live-client accounting (spec.md C7, §4.7: "a live-client gauge
//! incremented on accept and decremented on close").
//!
//! This crate names no `CLIENT` command, so only the accounting the gauge
//! needs is kept here — `register`/`unregister`/`mark_activity`/`count`.
//! The teacher's `CLIENT LIST`/`CLIENT KILL`/`CLIENT SETNAME` surface
//! (name tracking, list-entry formatting, kill-by-id/addr) had no
//! SPEC_FULL.md counterpart and has been trimmed.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Global client ID counter
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Client connection information
#[derive(Debug, Clone)]
pub struct ClientInfo {
    /// Unique client ID
    pub id: u64,
    /// Client address (IP:port)
    pub addr: String,
    /// File descriptor (socket ID)
    pub fd: u64,
    /// Current database index
    pub db: usize,
    /// Last command executed
    pub cmd: String,
    /// Connection creation timestamp
    pub created_at: u64,
    /// Last activity timestamp
    pub last_activity: u64,
}

impl ClientInfo {
    /// Create a new client info with generated ID
    pub fn new(addr: String, fd: u64) -> Self {
        let id = CLIENT_ID_COUNTER.fetch_add(1, Ordering::SeqCst);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        Self {
            id,
            addr,
            fd,
            db: 0,
            cmd: "".to_string(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Mark activity (command execution)
    pub fn mark_activity(&mut self, cmd: String, db_index: usize) {
        self.last_activity = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        self.cmd = cmd;
        self.db = db_index;
    }
}

/// Client registry for managing all active connections
#[derive(Clone)]
pub struct ClientRegistry {
    clients: Arc<DashMap<u64, ClientInfo>>,
}

impl ClientRegistry {
    /// Create a new client registry
    pub fn new() -> Self {
        Self {
            clients: Arc::new(DashMap::new()),
        }
    }

    /// Register a new client connection
    pub fn register(&self, addr: String, fd: u64) -> u64 {
        let client = ClientInfo::new(addr, fd);
        let id = client.id;
        self.clients.insert(id, client);
        id
    }

    /// Unregister a client connection
    pub fn unregister(&self, id: u64) {
        self.clients.remove(&id);
    }

    /// Get client info by ID
    pub fn get(&self, id: u64) -> Option<ClientInfo> {
        self.clients.get(&id).map(|entry| entry.clone())
    }

    /// Mark client activity
    pub fn mark_activity(&self, id: u64, cmd: String, db_index: usize) {
        if let Some(mut entry) = self.clients.get_mut(&id) {
            entry.mark_activity(cmd, db_index);
        }
    }

    /// Get total number of clients — the live-client gauge spec.md §4.7
    /// requires.
    pub fn count(&self) -> usize {
        self.clients.len()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
