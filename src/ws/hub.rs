//! In-process registry of live WebSocket connections grouped by room and
//! by player within room. A single mutex guards the table; critical
//! sections only touch the in-memory map, never the store.
//! `broadcast`/`send_to_player` snapshot targets under the lock, then
//! send outside it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

pub type ConnId = u64;

type Sender = mpsc::UnboundedSender<Value>;

#[derive(Default)]
struct RoomConnections {
    // player -> (conn_id -> sender)
    by_player: HashMap<Uuid, HashMap<ConnId, Sender>>,
}

#[derive(Default)]
pub struct Hub {
    rooms: Mutex<HashMap<String, RoomConnections>>,
    next_conn_id: AtomicU64,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_conn_id(&self) -> ConnId {
        self.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn connect(&self, room_code: &str, player_id: Uuid, conn_id: ConnId, tx: Sender) {
        let mut rooms = self.rooms.lock();
        rooms
            .entry(room_code.to_string())
            .or_default()
            .by_player
            .entry(player_id)
            .or_default()
            .insert(conn_id, tx);
    }

    /// Remove a single connection. If `player_id` is `None`, the
    /// connection is scrubbed from every player bucket in the room.
    pub fn disconnect(&self, room_code: &str, player_id: Option<Uuid>, conn_id: ConnId) {
        let mut rooms = self.rooms.lock();
        let Some(room) = rooms.get_mut(room_code) else { return };
        match player_id {
            Some(pid) => {
                if let Some(conns) = room.by_player.get_mut(&pid) {
                    conns.remove(&conn_id);
                    if conns.is_empty() {
                        room.by_player.remove(&pid);
                    }
                }
            }
            None => {
                for conns in room.by_player.values_mut() {
                    conns.remove(&conn_id);
                }
                room.by_player.retain(|_, conns| !conns.is_empty());
            }
        }
        if room.by_player.is_empty() {
            rooms.remove(room_code);
        }
    }

    fn snapshot(&self, room_code: &str) -> Vec<Sender> {
        let rooms = self.rooms.lock();
        rooms
            .get(room_code)
            .map(|r| r.by_player.values().flat_map(|m| m.values().cloned()).collect())
            .unwrap_or_default()
    }

    fn snapshot_player(&self, room_code: &str, player_id: Uuid) -> Vec<Sender> {
        let rooms = self.rooms.lock();
        rooms
            .get(room_code)
            .and_then(|r| r.by_player.get(&player_id))
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Broadcast to every connection in the room. A dead channel is
    /// silently dropped; its owning connection's read loop will notice
    /// the disconnect on its own and clean itself up.
    pub fn broadcast(&self, room_code: &str, event: &Value) {
        for tx in self.snapshot(room_code) {
            let _ = tx.send(event.clone());
        }
    }

    pub fn send_to_player(&self, room_code: &str, player_id: Uuid, event: &Value) {
        for tx in self.snapshot_player(room_code, player_id) {
            let _ = tx.send(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn send_to_player_only_reaches_that_player() {
        let hub = Hub::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        hub.connect("ABCDEF", a, hub.next_conn_id(), tx_a);
        hub.connect("ABCDEF", b, hub.next_conn_id(), tx_b);

        hub.send_to_player("ABCDEF", a, &json!({"type": "hand:update"}));

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn broadcast_reaches_every_connection_in_room() {
        let hub = Hub::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let room = "ZZZZZZ";
        hub.connect(room, Uuid::new_v4(), hub.next_conn_id(), tx_a);
        hub.connect(room, Uuid::new_v4(), hub.next_conn_id(), tx_b);

        hub.broadcast(room, &json!({"type": "room:update"}));

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn disconnect_prunes_empty_room() {
        let hub = Hub::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let player = Uuid::new_v4();
        let conn_id = hub.next_conn_id();
        hub.connect("ROOM01", player, conn_id, tx);
        hub.disconnect("ROOM01", Some(player), conn_id);

        assert!(hub.snapshot("ROOM01").is_empty());
    }
}
