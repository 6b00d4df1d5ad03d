//! Catalog, guide and session-state services

pub mod category_cache;
pub mod channel_directory;
pub mod cleanup;
pub mod epg;
pub mod remote;
pub mod session_store;
pub mod stream_url;
pub mod xtream;
