//! Full live channel list used to resolve on-screen channel numbers.
//!
//! `NotLoaded -> Loading -> Loaded`. Once loaded the list is reused for every
//! lookup until `refresh` is called; a failed load goes back to `NotLoaded`.

use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::error::{CatalogError, CatalogResult};
use crate::models::Channel;
use crate::services::remote::CatalogApi;
use crate::services::stream_url::find_channel_by_number;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryState {
    NotLoaded,
    Loading,
    Loaded(Arc<Vec<Channel>>),
}

pub struct ChannelDirectory {
    api: Arc<dyn CatalogApi>,
    state: watch::Sender<DirectoryState>,
    load_lock: Mutex<()>,
}

impl ChannelDirectory {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        let (state, _) = watch::channel(DirectoryState::NotLoaded);
        Self {
            api,
            state,
            load_lock: Mutex::new(()),
        }
    }

    pub fn state(&self) -> DirectoryState {
        self.state.borrow().clone()
    }

    /// Observe state transitions; the current state is replayed first
    pub fn subscribe(&self) -> watch::Receiver<DirectoryState> {
        self.state.subscribe()
    }

    /// Loaded channel list, fetching it on first use
    pub async fn channels(&self) -> CatalogResult<Arc<Vec<Channel>>> {
        if let Some(channels) = self.loaded() {
            return Ok(channels);
        }

        let _guard = self.load_lock.lock().await;
        // Another caller may have finished loading while we waited
        if let Some(channels) = self.loaded() {
            return Ok(channels);
        }
        self.load().await
    }

    fn loaded(&self) -> Option<Arc<Vec<Channel>>> {
        match &*self.state.borrow() {
            DirectoryState::Loaded(channels) => Some(Arc::clone(channels)),
            _ => None,
        }
    }

    /// Discard the cached list and load it again
    pub async fn refresh(&self) -> CatalogResult<Arc<Vec<Channel>>> {
        let _guard = self.load_lock.lock().await;
        self.load().await
    }

    /// Resolve a channel number, loading the list if needed
    pub async fn channel_for_number(&self, number: i64) -> CatalogResult<Channel> {
        let channels = self.channels().await?;
        find_channel_by_number(&channels, number)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("No channel number {}", number)))
    }

    async fn load(&self) -> CatalogResult<Arc<Vec<Channel>>> {
        self.state.send_replace(DirectoryState::Loading);
        match self.api.fetch_all_channels().await {
            Ok(channels) => {
                info!(channels = channels.len(), "Channel directory loaded");
                let channels = Arc::new(channels);
                self.state
                    .send_replace(DirectoryState::Loaded(Arc::clone(&channels)));
                Ok(channels)
            }
            Err(e) => {
                warn!(error = %e, "Channel directory load failed");
                self.state.send_replace(DirectoryState::NotLoaded);
                Err(e)
            }
        }
    }
}
