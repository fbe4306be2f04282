use std::sync::Arc;

use amumal_client::{ForumClient, PostFeed};
use amumal_core::{
    CursorPaginationLoader, Exhaustion, LoadOutcome, LoaderPhase, LoaderStatus, PostSummary,
    ScrollMetrics, SessionRecord,
};
use tokio::sync::watch;

use crate::config::Config;
use crate::pages::Route;
use crate::session::{require_session, SessionStore};

/// The infinitely scrolling post list. One loader per mount.
pub struct PostsPage {
    session: SessionRecord,
    loader: CursorPaginationLoader<PostFeed>,
}

impl PostsPage {
    pub fn mount(
        client: ForumClient,
        store: Arc<dyn SessionStore>,
        config: &Config,
    ) -> Result<Self, Route> {
        let session = require_session(store.as_ref())?;
        let loader = CursorPaginationLoader::new(Arc::new(PostFeed(client)), config.page_size)
            .with_scroll_threshold(config.scroll_threshold);
        Ok(Self { session, loader })
    }

    pub fn session(&self) -> &SessionRecord {
        &self.session
    }

    /// First page, requested when the page appears.
    pub async fn load_initial(&self) -> LoadOutcome {
        self.loader.load_more().await
    }

    pub async fn on_scroll(&self, metrics: &ScrollMetrics) -> LoadOutcome {
        self.loader.load_more_on_scroll(metrics).await
    }

    pub fn posts(&self) -> Vec<PostSummary> {
        self.loader.items()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoaderStatus> {
        self.loader.subscribe()
    }

    /// Status line under the list.
    pub fn footer(&self) -> &'static str {
        footer_text(&self.loader.phase())
    }

    pub fn open_post(&self, post_id: u64) -> Route {
        Route::PostDetail(post_id)
    }

    pub fn write_post(&self) -> Route {
        Route::PostWrite
    }
}

pub fn footer_text(phase: &LoaderPhase) -> &'static str {
    match phase {
        LoaderPhase::Idle => "Scroll down to load more.",
        LoaderPhase::Fetching => "Loading...",
        LoaderPhase::Exhausted(Exhaustion::NoMorePages) => "No more posts.",
        LoaderPhase::Exhausted(Exhaustion::Failed(_)) => "Couldn't load posts.",
    }
}
