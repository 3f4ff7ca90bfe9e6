//! Room registry
//!
//! Players join a game with a short room code. Each room owns one
//! [`Encounter`] behind its own mutex, so there is at most one mutation in
//! flight per room while different rooms proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, EngineConfig};
use crate::encounter::Encounter;

/// Characters used in room codes (no 0/O or 1/I look-alikes)
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a room code
pub const ROOM_CODE_LEN: usize = 6;

const MAX_CODE_ATTEMPTS: usize = 32;

/// Room registry errors
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("no room with code {0}")]
    NotFound(String),

    #[error("could not find a free room code")]
    CodesExhausted,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Generate a random room code
pub fn generate_code<R: Rng>(rng: &mut R) -> String {
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect()
}

/// One game room
pub struct Room {
    pub code: String,
    pub created_at: DateTime<Utc>,
    encounter: Mutex<Encounter>,
}

impl Room {
    /// Run `f` with exclusive access to the room's encounter
    pub fn with_encounter<T>(&self, f: impl FnOnce(&mut Encounter) -> T) -> T {
        let mut encounter = self.encounter.lock();
        f(&mut encounter)
    }
}

/// All open rooms, keyed by code
pub struct RoomRegistry {
    config: EngineConfig,
    rooms: Mutex<HashMap<String, Arc<Room>>>,
}

impl RoomRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Create a shared instance
    pub fn shared(config: EngineConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    /// Open a room with a fresh encounter built from the registry's config
    pub fn create(&self, name: &str) -> Result<Arc<Room>, RoomError> {
        let encounter = Encounter::new(name, self.config.clone())?;
        self.insert(encounter)
    }

    /// Open a room around an encounter built by the caller
    pub fn insert(&self, encounter: Encounter) -> Result<Arc<Room>, RoomError> {
        let mut rooms = self.rooms.lock();
        let mut rng = rand::rng();

        let code = (0..MAX_CODE_ATTEMPTS)
            .map(|_| generate_code(&mut rng))
            .find(|code| !rooms.contains_key(code))
            .ok_or(RoomError::CodesExhausted)?;

        info!("Room {} opened for {}", code, encounter.name());
        let room = Arc::new(Room {
            code: code.clone(),
            created_at: Utc::now(),
            encounter: Mutex::new(encounter),
        });
        rooms.insert(code, room.clone());
        Ok(room)
    }

    /// Look up a room; codes are case-insensitive
    pub fn get(&self, code: &str) -> Option<Arc<Room>> {
        self.rooms.lock().get(&code.to_uppercase()).cloned()
    }

    /// Close a room, returning it if it was open
    pub fn close(&self, code: &str) -> Option<Arc<Room>> {
        let room = self.rooms.lock().remove(&code.to_uppercase());
        if room.is_some() {
            info!("Room {} closed", code.to_uppercase());
        }
        room
    }

    /// Run `f` against a room's encounter under that room's lock
    pub fn with_room<T>(&self, code: &str, f: impl FnOnce(&mut Encounter) -> T) -> Result<T, RoomError> {
        let room = self
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.to_string()))?;
        Ok(room.with_encounter(f))
    }

    /// Codes of every open room
    pub fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.rooms.lock().keys().cloned().collect();
        codes.sort();
        codes
    }

    pub fn len(&self) -> usize {
        self.rooms.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.lock().is_empty()
    }
}
