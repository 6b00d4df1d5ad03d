//! Boundary to the remote catalog API.
//!
//! The core only talks to providers through [`CatalogApi`]. The Xtream adapter
//! in [`super::xtream`] is the production implementation; tests plug in fakes.

use async_trait::async_trait;

use crate::error::CatalogResult;
use crate::models::{
    CatalogItem, Category, Channel, ContentKind, SeriesDetail, SessionInfo, ShortEpgEntry,
};

/// Authenticated catalog queries.
///
/// Implementations enforce their own request timeout and report it as
/// `CatalogError::Transport`.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Validate credentials and return account info
    async fn authenticate(&self) -> CatalogResult<SessionInfo>;

    /// All categories of one content kind
    async fn fetch_categories(&self, kind: ContentKind) -> CatalogResult<Vec<Category>>;

    /// Items of a single category
    async fn fetch_items(
        &self,
        kind: ContentKind,
        category_id: &str,
    ) -> CatalogResult<Vec<CatalogItem>>;

    /// Full live channel list, in provider order
    async fn fetch_all_channels(&self) -> CatalogResult<Vec<Channel>>;

    /// Series metadata with episodes
    async fn fetch_series_detail(&self, series_id: i64) -> CatalogResult<SeriesDetail>;

    /// Next few programs of a live stream
    async fn fetch_short_epg(
        &self,
        stream_id: i64,
        limit: Option<u32>,
    ) -> CatalogResult<Vec<ShortEpgEntry>>;
}
