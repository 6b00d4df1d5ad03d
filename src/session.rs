//! Catalog session: everything bound to one set of provider credentials.
//!
//! The category cache, the channel directory and the guide synthesizer live
//! here instead of in globals, so dropping the session drops its caches.
//! Every operation runs inside [`supervise`] and reports failures through
//! the `CatalogResult` envelope.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{supervise, CatalogError, CatalogResult};
use crate::models::{
    CatalogItem, Category, Channel, ContentKind, EpgProgram, SeriesDetail, SessionInfo,
};
use crate::services::category_cache::CategoryCache;
use crate::services::channel_directory::ChannelDirectory;
use crate::services::epg::{programs_from_short_epg, EpgConfig, EpgGuide, EpgSynthesizer};
use crate::services::remote::CatalogApi;
use crate::services::stream_url::{build_stream_url, StreamRequest};
use crate::services::xtream::{XtreamClient, XtreamCredentials};

pub struct CatalogSession {
    api: Arc<dyn CatalogApi>,
    credentials: XtreamCredentials,
    cache: CategoryCache,
    directory: ChannelDirectory,
    epg: EpgSynthesizer,
}

impl CatalogSession {
    pub fn new(
        api: Arc<dyn CatalogApi>,
        credentials: XtreamCredentials,
        epg_config: EpgConfig,
    ) -> Self {
        Self {
            cache: CategoryCache::new(Arc::clone(&api)),
            directory: ChannelDirectory::new(Arc::clone(&api)),
            epg: EpgSynthesizer::new(epg_config),
            api,
            credentials,
        }
    }

    /// Session over the Xtream Player API, reusing the client's credentials
    /// for playback URLs
    pub fn from_client(client: XtreamClient, epg_config: EpgConfig) -> Self {
        let credentials = client.credentials().clone();
        Self::new(Arc::new(client), credentials, epg_config)
    }

    pub fn credentials(&self) -> &XtreamCredentials {
        &self.credentials
    }

    pub fn directory(&self) -> &ChannelDirectory {
        &self.directory
    }

    pub async fn authenticate(&self) -> CatalogResult<SessionInfo> {
        supervise("authenticate", async {
            let info = self.api.authenticate().await?;
            info!(
                username = %info.username,
                status = %info.status,
                "Provider session authenticated"
            );
            Ok(info)
        })
        .await
    }

    pub async fn categories(&self, kind: ContentKind) -> CatalogResult<Arc<Vec<Category>>> {
        supervise("categories", self.cache.categories(kind)).await
    }

    pub async fn items_for_category(
        &self,
        kind: ContentKind,
        category_id: &str,
    ) -> CatalogResult<Arc<Vec<CatalogItem>>> {
        supervise(
            "items_for_category",
            self.cache.items_for_category(kind, category_id),
        )
        .await
    }

    /// Cancelling `cancel` abandons only this caller's wait
    pub async fn items_for_category_cancellable(
        &self,
        kind: ContentKind,
        category_id: &str,
        cancel: &CancellationToken,
    ) -> CatalogResult<Arc<Vec<CatalogItem>>> {
        supervise(
            "items_for_category",
            self.cache
                .items_for_category_cancellable(kind, category_id, cancel),
        )
        .await
    }

    pub async fn series_detail(&self, series_id: i64) -> CatalogResult<Arc<SeriesDetail>> {
        supervise("series_detail", self.cache.series_detail(series_id)).await
    }

    /// Forget cached categories and items of `kind`
    pub async fn refresh(&self, kind: ContentKind) {
        self.cache.refresh(kind).await;
    }

    /// Reload the full channel list used for number lookups
    pub async fn refresh_channels(&self) -> CatalogResult<usize> {
        supervise("refresh_channels", async {
            Ok(self.directory.refresh().await?.len())
        })
        .await
    }

    /// Live channels of one category
    pub async fn channels_for_category(&self, category_id: &str) -> CatalogResult<Vec<Channel>> {
        supervise("channels_for_category", async {
            let items = self
                .cache
                .items_for_category(ContentKind::Live, category_id)
                .await?;
            Ok(items
                .iter()
                .filter_map(CatalogItem::as_channel)
                .cloned()
                .collect())
        })
        .await
    }

    /// Guide for the channels of one live category
    pub async fn epg_guide(&self, category_id: &str, now: DateTime<Utc>) -> CatalogResult<EpgGuide> {
        supervise("epg_guide", async {
            let channels = self.channels_for_category(category_id).await?;
            debug!(category_id, channels = channels.len(), "Building guide");
            Ok(EpgGuide::build(&self.epg, channels, now))
        })
        .await
    }

    /// Guide over every live channel; narrow it with
    /// [`EpgGuide::visible_channels`] instead of rebuilding per category
    pub async fn full_epg_guide(&self, now: DateTime<Utc>) -> CatalogResult<EpgGuide> {
        supervise("full_epg_guide", async {
            let channels = self.directory.channels().await?;
            Ok(EpgGuide::build(&self.epg, channels.as_ref().clone(), now))
        })
        .await
    }

    /// Provider listings for one channel
    pub async fn short_epg(
        &self,
        stream_id: i64,
        limit: Option<u32>,
    ) -> CatalogResult<Vec<EpgProgram>> {
        supervise("short_epg", async {
            let channels = self.directory.channels().await?;
            let channel = channels
                .iter()
                .find(|c| c.stream_id == stream_id)
                .ok_or_else(|| CatalogError::NotFound(format!("Channel {} not found", stream_id)))?;
            let entries = self.api.fetch_short_epg(stream_id, limit).await?;
            Ok(programs_from_short_epg(channel, &entries))
        })
        .await
    }

    /// Playable URL, or `None` for an invalid request
    pub fn stream_url(&self, request: &StreamRequest) -> Option<String> {
        build_stream_url(&self.credentials, request)
    }

    /// Replay URL for a finished program still inside the archive window
    pub fn catchup_url(
        &self,
        channel: &Channel,
        program: &EpgProgram,
        now: DateTime<Utc>,
    ) -> Option<String> {
        if !program.is_catchup_available(now) {
            return None;
        }
        self.stream_url(&StreamRequest::catchup(
            channel.stream_id,
            program.start_time,
            program.end_time,
        ))
    }

    /// Resolve an on-screen channel number to its channel and live URL
    pub async fn play_channel_number(&self, number: i64) -> CatalogResult<(Channel, String)> {
        supervise("play_channel_number", async {
            let channel = self.directory.channel_for_number(number).await?;
            let url = self
                .stream_url(&StreamRequest::live(channel.stream_id))
                .ok_or_else(|| {
                    CatalogError::Auth("Missing provider credentials".to_string())
                })?;
            Ok((channel, url))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::remote::fake::{channel, FakeCatalog};
    use chrono::{Duration, TimeZone};

    fn creds() -> XtreamCredentials {
        XtreamCredentials::new("http://tv.example.com", "user", "pass")
    }

    fn session_with(fake: Arc<FakeCatalog>) -> CatalogSession {
        CatalogSession::new(fake, creds(), EpgConfig::default())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 20, 10, 0).unwrap()
    }

    #[tokio::test]
    async fn test_authenticate_passes_account_info() {
        let session = session_with(Arc::new(FakeCatalog::default()));
        let info = session.authenticate().await.unwrap();
        assert_eq!(info.username, "tester");
    }

    #[tokio::test]
    async fn test_channels_for_category_are_lazy_and_memoized() {
        let fake = Arc::new(FakeCatalog::default());
        let session = session_with(fake.clone());

        let channels = session.channels_for_category("4").await.unwrap();
        assert_eq!(channels.len(), 3);
        assert_eq!(channels[0].stream_id, 401);
        session.channels_for_category("4").await.unwrap();

        assert_eq!(fake.item_calls(ContentKind::Live, "4"), 1);
        assert_eq!(fake.item_calls(ContentKind::Live, "5"), 0);
    }

    #[tokio::test]
    async fn test_refresh_refetches() {
        let fake = Arc::new(FakeCatalog::default());
        let session = session_with(fake.clone());
        session.items_for_category(ContentKind::Vod, "2").await.unwrap();
        session.refresh(ContentKind::Vod).await;
        session.items_for_category(ContentKind::Vod, "2").await.unwrap();
        assert_eq!(fake.item_calls(ContentKind::Vod, "2"), 2);
    }

    #[tokio::test]
    async fn test_category_failure_is_reported_as_transport() {
        let fake = Arc::new(FakeCatalog::default());
        fake.fail_category("9");
        let session = session_with(fake);
        let err = session.epg_guide("9", now()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_guide_covers_category_channels() {
        let session = session_with(Arc::new(FakeCatalog::default()));
        let guide = session.epg_guide("1", now()).await.unwrap();
        assert_eq!(guide.channels().len(), 3);
        for ch in guide.channels() {
            let programs = guide.programs_for(ch.stream_id);
            assert!(!programs.is_empty());
            assert!(guide.current_program(ch.stream_id, now()).is_some());
        }
    }

    #[tokio::test]
    async fn test_play_channel_number_builds_live_url() {
        let channels = (1..=10).map(|i| channel(i * 7, None, "1")).collect();
        let fake = Arc::new(FakeCatalog::with_channels(channels));
        let session = session_with(fake);

        let (ch, url) = session.play_channel_number(5).await.unwrap();
        assert_eq!(ch.stream_id, 35);
        assert_eq!(url, "http://tv.example.com/live/user/pass/35.ts");

        assert!(matches!(
            session.play_channel_number(11).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_play_without_credentials_is_auth_error() {
        let fake = Arc::new(FakeCatalog::with_channels(vec![channel(3, Some(1), "1")]));
        let session = CatalogSession::new(fake, XtreamCredentials::default(), EpgConfig::default());
        assert!(matches!(
            session.play_channel_number(1).await,
            Err(CatalogError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_short_epg_uses_channel_archive_policy() {
        let mut archived = channel(12, Some(1), "1");
        archived.tv_archive = true;
        archived.tv_archive_duration_days = Some(3);
        let fake = Arc::new(FakeCatalog::with_channels(vec![archived.clone()]));
        let session = session_with(fake);

        let programs = session.short_epg(12, Some(4)).await.unwrap();
        assert_eq!(programs.len(), 1);
        let program = &programs[0];
        assert_eq!(program.title, "Morning Show");

        let watched_at = program.end_time + Duration::hours(30);
        assert!(program.is_catchup_available(watched_at));
        let url = session.catchup_url(&archived, program, watched_at).unwrap();
        assert!(url.contains("/timeshift/user/pass/60/"));

        assert!(matches!(
            session.short_epg(99, None).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_catchup_url_refused_outside_window() {
        let session = session_with(Arc::new(FakeCatalog::default()));
        let plain = channel(5, None, "1");
        let guide = EpgGuide::build(&EpgSynthesizer::default(), vec![plain.clone()], now());
        for program in guide.programs_for(5) {
            assert_eq!(session.catchup_url(&plain, program, now()), None);
        }
    }

    #[tokio::test]
    async fn test_series_detail_through_session() {
        let session = session_with(Arc::new(FakeCatalog::default()));
        let detail = session.series_detail(4).await.unwrap();
        assert_eq!(detail.episode_count(), 1);
        let episode = &detail.seasons[0].episodes[0];
        assert_eq!(
            session
                .stream_url(&StreamRequest::episode(
                    episode.id,
                    Some(&episode.container_extension)
                ))
                .as_deref(),
            Some("http://tv.example.com/series/user/pass/41.mkv")
        );
    }
}
