//! Domain types shared by the catalog, EPG and session-state services

pub mod catalog;
pub mod epg;
pub mod session;

pub use catalog::{
    CatalogItem, Category, Channel, ContentKind, Episode, Season, SeriesDetail, SeriesItem,
    SessionInfo, ShortEpgEntry, VodItem,
};
pub use epg::{ArchiveWindow, EpgProgram};
pub use session::{
    EntryAttrs, EntryKey, FavoriteEntry, HistoryEntry, PlaybackPosition, StreamType,
};
