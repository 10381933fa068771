//! Room store: creates, tracks, and deletes rooms.

use std::collections::HashMap;
use std::sync::Arc;

use quizroom_protocol::RoomCode;
use rand::Rng;
use tokio::sync::Mutex;

use crate::actor::spawn_room;
use crate::{CleanupScheduler, GameConfig, QuestionBank, Room, RoomError, RoomHandle, RoomInfo};

/// Characters room codes are drawn from.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a generated room code (36^6, about 2.2 billion codes).
const CODE_LEN: usize = 6;

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// The store shared between connection handlers and the reaper.
pub type SharedRoomStore = Arc<Mutex<RoomStore>>;

/// What every room a store creates is wired up with.
#[derive(Clone)]
pub struct RoomServices {
    pub bank: Arc<QuestionBank>,
    pub config: GameConfig,
    pub cleanup: CleanupScheduler,
}

/// Maps room codes to running rooms.
///
/// Pure bookkeeping: presence and game rules live in the rooms
/// themselves. Owned by the server (usually as a [`SharedRoomStore`]),
/// never global.
pub struct RoomStore {
    rooms: HashMap<RoomCode, RoomHandle>,
    services: RoomServices,
}

impl RoomStore {
    pub fn new(services: RoomServices) -> Self {
        Self {
            rooms: HashMap::new(),
            services,
        }
    }

    /// Wraps the store for sharing.
    pub fn shared(self) -> SharedRoomStore {
        Arc::new(Mutex::new(self))
    }

    pub fn services(&self) -> &RoomServices {
        &self.services
    }

    /// Creates a room under a fresh random code.
    ///
    /// `host_name` is remembered as the room's original host, who may
    /// rejoin a running match. The room starts empty, so its cleanup timer
    /// is armed straight away: a room nobody joins is reaped after the
    /// grace period.
    pub fn create(&mut self, host_name: Option<String>) -> RoomHandle {
        let mut rng = rand::rng();
        let code = loop {
            let code = generate_code(&mut rng);
            if !self.rooms.contains_key(&code) {
                break code;
            }
        };
        self.insert(code, host_name)
    }

    /// Creates a room under a caller-chosen code.
    pub fn create_with_code(
        &mut self,
        code: RoomCode,
        host_name: Option<String>,
    ) -> Result<RoomHandle, RoomError> {
        if self.rooms.contains_key(&code) {
            return Err(RoomError::AlreadyExists(code));
        }
        Ok(self.insert(code, host_name))
    }

    fn insert(&mut self, code: RoomCode, host_name: Option<String>) -> RoomHandle {
        let room = Room::new(
            code.clone(),
            self.services.config.clone(),
            Arc::clone(&self.services.bank),
            host_name,
        );
        let handle = spawn_room(room, self.services.cleanup.clone(), DEFAULT_CHANNEL_SIZE);
        self.rooms.insert(code.clone(), handle.clone());
        self.services.cleanup.schedule(&code);
        tracing::info!(room_id = %code, "room created");
        handle
    }

    /// Looks a room up.
    pub fn get(&self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        self.rooms
            .get(code)
            .cloned()
            .ok_or_else(|| RoomError::RoomNotFound(code.clone()))
    }

    pub fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    /// Shuts a room down and forgets it. Returns `false` if it didn't exist.
    pub async fn delete(&mut self, code: &RoomCode) -> bool {
        let Some(handle) = self.rooms.remove(code) else {
            return false;
        };
        self.services.cleanup.cancel(code);
        let _ = handle.shutdown().await;
        tracing::info!(room_id = %code, "room deleted");
        true
    }

    /// Deletes the room only if nobody is seated in it.
    ///
    /// The room itself decides, in order with its other commands, so a
    /// join already queued ahead of this check keeps the room alive.
    pub async fn remove_if_empty(&mut self, code: &RoomCode) -> bool {
        let Some(handle) = self.rooms.get(code) else {
            return false;
        };
        match handle.shutdown_if_empty().await {
            Ok(false) => false,
            // Stopped now, or already gone.
            Ok(true) | Err(_) => {
                self.rooms.remove(code);
                true
            }
        }
    }

    /// Rooms with at least one seated player.
    ///
    /// Rooms that fail to respond (shutting down) are skipped.
    pub async fn list_non_empty(&self) -> Vec<RoomInfo> {
        let mut infos = Vec::with_capacity(self.rooms.len());
        for handle in self.rooms.values() {
            if let Ok(info) = handle.get_info().await {
                if info.player_count > 0 {
                    infos.push(info);
                }
            }
        }
        infos.sort_by(|a, b| a.room_id.as_str().cmp(b.room_id.as_str()));
        infos
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Disarms every cleanup timer and shuts every room down.
    pub async fn shutdown_all(&mut self) {
        self.services.cleanup.clear_all();
        for (code, handle) in self.rooms.drain() {
            let _ = handle.shutdown().await;
            tracing::debug!(room_id = %code, "room shut down");
        }
    }
}

fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> RoomCode {
    let code: String = (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    RoomCode::new(code)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn store() -> RoomStore {
        let (cleanup, _rx) = CleanupScheduler::new(Duration::from_secs(10));
        RoomStore::new(RoomServices {
            bank: Arc::new(QuestionBank::new()),
            config: GameConfig::default(),
            cleanup,
        })
    }

    #[test]
    fn test_generate_code_uses_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = generate_code(&mut rng);
            assert_eq!(code.as_str().len(), CODE_LEN);
            assert!(code.as_str().bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let mut store = store();
        let handle = store.create(Some("Alice".into()));
        let code = handle.room_id().clone();

        assert_eq!(store.len(), 1);
        assert!(store.get(&code).is_ok());
        assert!(store.services().cleanup.is_pending(&code));
    }

    #[tokio::test]
    async fn test_get_unknown_room_not_found() {
        let store = store();
        let code = RoomCode::new("NOPE00");
        assert_eq!(
            store.get(&code).err(),
            Some(RoomError::RoomNotFound(code))
        );
    }

    #[tokio::test]
    async fn test_create_with_code_rejects_duplicates() {
        let mut store = store();
        store.create_with_code(RoomCode::new("z1"), None).unwrap();
        assert_eq!(
            store.create_with_code(RoomCode::new("Z1"), None).err(),
            Some(RoomError::AlreadyExists(RoomCode::new("Z1")))
        );
    }

    #[tokio::test]
    async fn test_delete_forgets_room_and_disarms_cleanup() {
        let mut store = store();
        let code = store.create(None).room_id().clone();

        assert!(store.delete(&code).await);
        assert!(!store.delete(&code).await);
        assert!(store.get(&code).is_err());
        assert!(!store.services().cleanup.is_pending(&code));
    }

    #[tokio::test]
    async fn test_remove_if_empty_keeps_occupied_room() {
        let mut store = store();
        let handle = store.create(None);
        let code = handle.room_id().clone();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        handle
            .join(quizroom_protocol::ConnectionId::new(1), "Alice", tx)
            .await
            .unwrap();

        assert!(!store.remove_if_empty(&code).await);
        assert!(store.get(&code).is_ok());
    }

    #[tokio::test]
    async fn test_list_non_empty_skips_empty_rooms() {
        let mut store = store();
        store.create(None);
        let handle = store.create(None);
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        handle
            .join(quizroom_protocol::ConnectionId::new(1), "Alice", tx)
            .await
            .unwrap();

        let listed = store.list_non_empty().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(&listed[0].room_id, handle.room_id());
        assert_eq!(listed[0].player_count, 1);
    }
}
