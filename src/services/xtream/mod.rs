//! Xtream Codes Integration
//!
//! Production [`CatalogApi`](crate::services::remote::CatalogApi) backed by
//! the Xtream Codes Player API v2.
//!
//! # Overview
//!
//! - **Detection**: pull server and account out of a provider's M3U link
//! - **API Client**: categories, per-category streams, series detail, short EPG
//! - **Credentials**: playback URL construction for every stream type
//!
//! # Usage
//!
//! ```rust,ignore
//! use ativeplay_data::services::xtream::{extract_credentials, XtreamClient};
//!
//! let creds = extract_credentials(&m3u_url).expect("xtream link");
//! let client = XtreamClient::from_credentials(&creds, 30_000, "VLC/3.0.20")?;
//! let info = client.authenticate().await?;
//! ```

pub mod client;
pub mod detector;
pub mod types;

// Re-exports for convenience
pub use client::{XtreamClient, XtreamError};
pub use detector::extract_credentials;
pub use types::XtreamCredentials;
