//! Durable per-user session state: favorites, watch history, resume points
//! and the parental PIN.
//!
//! Every mutation is persisted first and published second, so subscribers
//! never see state the database does not hold. Collections are exposed as
//! `watch` cells: a late subscriber gets the current snapshot immediately,
//! then every later change. Mutations of the same stream id are serialized.

use async_trait::async_trait;
use chrono::Utc;
use futures::Stream;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{watch, Mutex, OwnedMutexGuard, RwLock};
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::db::models::PinRow;
use crate::error::StoreError;
use crate::models::{
    EntryAttrs, EntryKey, FavoriteEntry, HistoryEntry, PlaybackPosition, StreamType,
};

type HmacSha256 = Hmac<Sha256>;

const PIN_MIN_DIGITS: usize = 4;
const PIN_MAX_DIGITS: usize = 8;

/// Persistence collaborator of the session store
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn load_favorites(&self) -> Result<Vec<FavoriteEntry>, StoreError>;
    async fn upsert_favorite(&self, entry: &FavoriteEntry) -> Result<(), StoreError>;
    async fn delete_favorite(&self, key: EntryKey) -> Result<(), StoreError>;

    /// Most recent first
    async fn load_history(&self, limit: i64) -> Result<Vec<HistoryEntry>, StoreError>;
    async fn upsert_history(&self, entry: &HistoryEntry) -> Result<(), StoreError>;
    async fn update_history_progress(&self, position: &PlaybackPosition)
        -> Result<(), StoreError>;
    async fn delete_history(&self, key: EntryKey) -> Result<(), StoreError>;
    async fn clear_history(&self) -> Result<(), StoreError>;
    /// Keep the `keep` most recent entries; returns how many were removed
    async fn prune_history(&self, keep: i64) -> Result<u64, StoreError>;

    async fn load_position(&self, stream_id: i64) -> Result<Option<PlaybackPosition>, StoreError>;
    /// Conditional on `updated_at` being at least the stored one
    async fn save_position(&self, position: &PlaybackPosition) -> Result<bool, StoreError>;

    async fn load_pin(&self) -> Result<Option<PinRow>, StoreError>;
    /// Only when no PIN exists yet
    async fn insert_pin(&self, pin: &PinRow) -> Result<bool, StoreError>;
    async fn replace_pin(&self, pin: &PinRow) -> Result<(), StoreError>;
}

pub struct SessionStore {
    repo: Arc<dyn SessionRepository>,
    favorites: watch::Sender<Arc<Vec<FavoriteEntry>>>,
    history: watch::Sender<Arc<Vec<HistoryEntry>>>,
    stream_locks: StdMutex<HashMap<i64, Arc<Mutex<()>>>>,
    /// Shared by per-stream history writes, exclusive for `clear_history`
    history_lock: RwLock<()>,
    pin_lock: Mutex<()>,
    history_limit: usize,
}

/// Exclusive access to one stream id. Its lock entry is dropped from the
/// table once nobody else holds or waits on it.
struct StreamGuard<'a> {
    locks: &'a StdMutex<HashMap<i64, Arc<Mutex<()>>>>,
    stream_id: i64,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for StreamGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if locks
            .get(&self.stream_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.stream_id);
        }
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl SessionStore {
    /// Load the persisted state and start publishing it
    pub async fn open(
        repo: Arc<dyn SessionRepository>,
        history_limit: usize,
    ) -> Result<Self, StoreError> {
        let favorites = repo.load_favorites().await?;
        let history = repo.load_history(history_limit as i64).await?;
        info!(
            favorites = favorites.len(),
            history = history.len(),
            "Session state loaded"
        );

        let (favorites, _) = watch::channel(Arc::new(favorites));
        let (history, _) = watch::channel(Arc::new(history));
        Ok(Self {
            repo,
            favorites,
            history,
            stream_locks: StdMutex::new(HashMap::new()),
            history_lock: RwLock::new(()),
            pin_lock: Mutex::new(()),
            history_limit,
        })
    }

    async fn lock_stream(&self, stream_id: i64) -> StreamGuard<'_> {
        let lock = {
            let mut locks = self
                .stream_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(locks.entry(stream_id).or_default())
        };
        StreamGuard {
            locks: &self.stream_locks,
            stream_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    // ========================================================================
    // Favorites
    // ========================================================================

    /// Flip favorite membership. Returns whether the stream is now a favorite.
    pub async fn toggle_favorite(
        &self,
        stream_id: i64,
        attrs: EntryAttrs,
    ) -> Result<bool, StoreError> {
        let key = EntryKey {
            stream_id,
            stream_type: attrs.stream_type,
        };
        let _stream = self.lock_stream(stream_id).await;

        if self.is_favorite(stream_id, attrs.stream_type) {
            if let Err(e) = self.repo.delete_favorite(key).await {
                warn!(stream_id, error = %e, "Failed to remove favorite");
                return Err(e);
            }
            self.favorites.send_modify(|list| {
                let next: Vec<FavoriteEntry> =
                    list.iter().filter(|f| f.key() != key).cloned().collect();
                *list = Arc::new(next);
            });
            debug!(stream_id, "Favorite removed");
            Ok(false)
        } else {
            let entry = FavoriteEntry {
                stream_id,
                name: attrs.name,
                stream_icon: attrs.stream_icon,
                category_name: attrs.category_name,
                stream_type: attrs.stream_type,
                timestamp: now_ms(),
            };
            if let Err(e) = self.repo.upsert_favorite(&entry).await {
                warn!(stream_id, error = %e, "Failed to add favorite");
                return Err(e);
            }
            self.favorites.send_modify(|list| {
                let mut next = Vec::with_capacity(list.len() + 1);
                next.push(entry);
                next.extend(list.iter().filter(|f| f.key() != key).cloned());
                *list = Arc::new(next);
            });
            debug!(stream_id, "Favorite added");
            Ok(true)
        }
    }

    /// Current membership; see [`SessionStore::watch_favorite`] for the live view
    pub fn is_favorite(&self, stream_id: i64, stream_type: StreamType) -> bool {
        let key = EntryKey {
            stream_id,
            stream_type,
        };
        self.favorites.borrow().iter().any(|f| f.key() == key)
    }

    /// Live membership: yields the current value, then again on every change
    pub fn watch_favorite(
        &self,
        stream_id: i64,
        stream_type: StreamType,
    ) -> impl Stream<Item = bool> + Send + 'static {
        let key = EntryKey {
            stream_id,
            stream_type,
        };
        WatchStream::new(self.favorites.subscribe())
            .map(move |list| list.iter().any(|f| f.key() == key))
    }

    /// Most recently added first
    pub fn favorites(&self) -> Arc<Vec<FavoriteEntry>> {
        self.favorites.borrow().clone()
    }

    pub fn subscribe_favorites(&self) -> watch::Receiver<Arc<Vec<FavoriteEntry>>> {
        self.favorites.subscribe()
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Record a play of `stream_id`, moving it to the front of the history
    pub async fn add_to_history(&self, stream_id: i64, attrs: EntryAttrs) -> Result<(), StoreError> {
        let _stream = self.lock_stream(stream_id).await;
        let _history = self.history_lock.read().await;

        let key = EntryKey {
            stream_id,
            stream_type: attrs.stream_type,
        };
        let previous = self.history.borrow().iter().find(|h| h.key() == key).cloned();
        let entry = HistoryEntry {
            stream_id,
            name: attrs.name,
            stream_icon: attrs.stream_icon,
            category_name: attrs.category_name,
            stream_type: attrs.stream_type,
            last_position_ms: previous.as_ref().and_then(|p| p.last_position_ms),
            duration_ms: previous.as_ref().and_then(|p| p.duration_ms),
            timestamp: now_ms(),
        };

        if let Err(e) = self.repo.upsert_history(&entry).await {
            warn!(stream_id, error = %e, "Failed to record watch history");
            return Err(e);
        }
        match self.repo.prune_history(self.history_limit as i64).await {
            Ok(0) => {}
            Ok(pruned) => debug!(pruned, "Pruned watch history"),
            Err(e) => warn!(error = %e, "Failed to prune watch history"),
        }

        let limit = self.history_limit;
        self.history.send_modify(|list| {
            let mut next = Vec::with_capacity(list.len() + 1);
            next.push(entry);
            next.extend(list.iter().filter(|h| h.key() != key).cloned());
            next.truncate(limit);
            *list = Arc::new(next);
        });
        Ok(())
    }

    /// Store the resume point of `stream_id`.
    ///
    /// Ignored when the id or duration is not positive. Calls are ordered by
    /// the time they were issued, so a later rewind replaces a larger position.
    pub async fn update_playback_progress(
        &self,
        stream_id: i64,
        position_ms: i64,
        duration_ms: i64,
    ) -> Result<(), StoreError> {
        if stream_id <= 0 || duration_ms <= 0 {
            return Ok(());
        }
        let position = PlaybackPosition {
            stream_id,
            position_ms: position_ms.clamp(0, duration_ms),
            duration_ms,
            updated_at: now_ms(),
        };

        let _stream = self.lock_stream(stream_id).await;

        let applied = match self.repo.save_position(&position).await {
            Ok(applied) => applied,
            Err(e) => {
                warn!(stream_id, error = %e, "Failed to save playback position");
                return Err(e);
            }
        };
        if !applied {
            debug!(stream_id, "Stale playback position ignored");
            return Ok(());
        }

        let _history = self.history_lock.read().await;
        let in_history = self.history.borrow().iter().any(|h| h.stream_id == stream_id);
        if !in_history {
            return Ok(());
        }
        if let Err(e) = self.repo.update_history_progress(&position).await {
            warn!(stream_id, error = %e, "Failed to update history progress");
            return Err(e);
        }
        self.history.send_modify(|list| {
            let mut next: Vec<HistoryEntry> = (**list).clone();
            for entry in next.iter_mut().filter(|h| h.stream_id == stream_id) {
                entry.last_position_ms = Some(position.position_ms);
                entry.duration_ms = Some(position.duration_ms);
                entry.timestamp = entry.timestamp.max(position.updated_at);
            }
            next.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            *list = Arc::new(next);
        });
        Ok(())
    }

    /// Stored resume offset, if any
    pub async fn get_last_position(&self, stream_id: i64) -> Result<Option<i64>, StoreError> {
        Ok(self
            .repo
            .load_position(stream_id)
            .await?
            .map(|p| p.position_ms))
    }

    pub async fn remove_from_history(&self, key: EntryKey) -> Result<(), StoreError> {
        let _stream = self.lock_stream(key.stream_id).await;
        let _history = self.history_lock.read().await;

        if let Err(e) = self.repo.delete_history(key).await {
            warn!(stream_id = key.stream_id, error = %e, "Failed to remove history entry");
            return Err(e);
        }
        self.history.send_modify(|list| {
            let next: Vec<HistoryEntry> = list.iter().filter(|h| h.key() != key).cloned().collect();
            *list = Arc::new(next);
        });
        Ok(())
    }

    pub async fn clear_history(&self) -> Result<(), StoreError> {
        let _history = self.history_lock.write().await;
        if let Err(e) = self.repo.clear_history().await {
            warn!(error = %e, "Failed to clear watch history");
            return Err(e);
        }
        self.history.send_replace(Arc::new(Vec::new()));
        info!("Watch history cleared");
        Ok(())
    }

    /// Most recent first, at most `history_limit` entries
    pub fn history(&self) -> Arc<Vec<HistoryEntry>> {
        self.history.borrow().clone()
    }

    pub fn subscribe_history(&self) -> watch::Receiver<Arc<Vec<HistoryEntry>>> {
        self.history.subscribe()
    }

    // ========================================================================
    // Parental control
    // ========================================================================

    /// Set the PIN. Fails with `PinAlreadySet` once one exists.
    pub async fn set_pin(&self, pin: &str) -> Result<(), StoreError> {
        let record = hash_pin(pin)?;
        let _guard = self.pin_lock.lock().await;
        if !self.repo.insert_pin(&record).await? {
            return Err(StoreError::PinAlreadySet);
        }
        info!("Parental PIN set");
        Ok(())
    }

    /// Compare `candidate` with the stored PIN in constant time.
    /// `false` when no PIN is set.
    pub async fn verify_pin(&self, candidate: &str) -> Result<bool, StoreError> {
        match self.repo.load_pin().await? {
            Some(record) => pin_matches(&record, candidate),
            None => Ok(false),
        }
    }

    /// Replace the PIN after checking the current one
    pub async fn change_pin(&self, current: &str, new_pin: &str) -> Result<(), StoreError> {
        let record = hash_pin(new_pin)?;
        let _guard = self.pin_lock.lock().await;
        if !self.verify_pin(current).await? {
            warn!("Parental PIN change rejected");
            return Err(StoreError::PinRejected);
        }
        self.repo.replace_pin(&record).await?;
        info!("Parental PIN changed");
        Ok(())
    }

    pub async fn has_pin(&self) -> Result<bool, StoreError> {
        Ok(self.repo.load_pin().await?.is_some())
    }
}

fn valid_pin(pin: &str) -> bool {
    (PIN_MIN_DIGITS..=PIN_MAX_DIGITS).contains(&pin.len())
        && pin.bytes().all(|b| b.is_ascii_digit())
}

fn pin_mac(salt: &[u8], pin: &str) -> Result<HmacSha256, StoreError> {
    let mut mac = HmacSha256::new_from_slice(salt).map_err(|_| StoreError::CorruptPin)?;
    mac.update(pin.as_bytes());
    Ok(mac)
}

fn hash_pin(pin: &str) -> Result<PinRow, StoreError> {
    if !valid_pin(pin) {
        return Err(StoreError::InvalidPin);
    }
    let salt: [u8; 16] = rand::thread_rng().gen();
    let digest = pin_mac(&salt, pin)?.finalize().into_bytes();
    Ok(PinRow {
        salt: hex::encode(salt),
        pin_hash: hex::encode(digest),
        created_at: now_ms(),
    })
}

fn pin_matches(record: &PinRow, candidate: &str) -> Result<bool, StoreError> {
    let salt = hex::decode(&record.salt).map_err(|_| StoreError::CorruptPin)?;
    let expected = hex::decode(&record.pin_hash).map_err(|_| StoreError::CorruptPin)?;
    Ok(pin_mac(&salt, candidate)?.verify_slice(&expected).is_ok())
}
