//! AtivePlay data layer
//!
//! Lazily loaded, coalesced catalog access over the Xtream Player API, a
//! synthesized program guide, durable session state and playback URL
//! construction.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod session;

pub use error::{CatalogError, CatalogResult, StoreError};
pub use services::session_store::{SessionRepository, SessionStore};
pub use session::CatalogSession;
