use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::error::FetchError;

/// Remaining distance to the bottom, in view units, at which the next page
/// is requested.
pub const SCROLL_THRESHOLD: f64 = 200.0;

/// One page as returned by the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor for the following page; `None` when the list is complete.
    pub next_cursor: Option<u64>,
}

/// Fetches pages of items starting after a cursor.
pub trait PageSource: Send + Sync {
    type Item: Clone + Send + Sync;

    fn fetch_page(
        &self,
        cursor: u64,
        count: u32,
    ) -> impl Future<Output = Result<Page<Self::Item>, FetchError>> + Send;
}

/// Why a loader stopped for good.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exhaustion {
    NoMorePages,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderPhase {
    Idle,
    Fetching,
    Exhausted(Exhaustion),
}

impl LoaderPhase {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, LoaderPhase::Exhausted(_))
    }
}

/// Observable snapshot of a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderStatus {
    pub phase: LoaderPhase,
    pub cursor: u64,
    pub item_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InFlight,
    Exhausted,
    NotNearBottom,
}

/// Result of one `load_more` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Items appended; more pages may follow.
    Loaded { appended: usize },
    /// Items appended and the list is complete.
    ReachedEnd { appended: usize },
    /// The fetch failed; the loader is now exhausted.
    Failed(FetchError),
    /// No request was issued.
    Skipped(SkipReason),
}

/// Scroll position of the list view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub viewport_height: f64,
    pub scroll_offset: f64,
    pub content_height: f64,
}

impl ScrollMetrics {
    /// Unscrolled distance below the viewport.
    pub fn remaining(&self) -> f64 {
        self.content_height - (self.viewport_height + self.scroll_offset)
    }
}

/// Advisory trigger: true when the view is within `threshold` of the end.
pub fn should_load_more(metrics: &ScrollMetrics, threshold: f64) -> bool {
    metrics.remaining() <= threshold
}

struct LoaderState<T> {
    cursor: u64,
    phase: LoaderPhase,
    items: Vec<T>,
    requests: u64,
}

/// Cursor-driven incremental list loader with single-flight fetches.
///
/// The cursor only moves forward and only after a successful page.
/// Exhaustion is terminal for the loader's lifetime; a failed page counts
/// as exhaustion and is reported once through [`LoadOutcome::Failed`].
pub struct CursorPaginationLoader<S: PageSource> {
    source: Arc<S>,
    page_size: u32,
    scroll_threshold: f64,
    state: Mutex<LoaderState<S::Item>>,
    status_tx: watch::Sender<LoaderStatus>,
}

impl<S: PageSource> CursorPaginationLoader<S> {
    pub fn new(source: Arc<S>, page_size: u32) -> Self {
        let (status_tx, _) = watch::channel(LoaderStatus {
            phase: LoaderPhase::Idle,
            cursor: 0,
            item_count: 0,
        });
        Self {
            source,
            page_size,
            scroll_threshold: SCROLL_THRESHOLD,
            state: Mutex::new(LoaderState {
                cursor: 0,
                phase: LoaderPhase::Idle,
                items: Vec::new(),
                requests: 0,
            }),
            status_tx,
        }
    }

    pub fn with_scroll_threshold(mut self, threshold: f64) -> Self {
        self.scroll_threshold = threshold;
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn cursor(&self) -> u64 {
        self.lock().cursor
    }

    pub fn phase(&self) -> LoaderPhase {
        self.lock().phase.clone()
    }

    pub fn is_exhausted(&self) -> bool {
        self.lock().phase.is_exhausted()
    }

    /// Items in server order, across all pages loaded so far.
    pub fn items(&self) -> Vec<S::Item> {
        self.lock().items.clone()
    }

    pub fn status(&self) -> LoaderStatus {
        let state = self.lock();
        snapshot(&state)
    }

    pub fn subscribe(&self) -> watch::Receiver<LoaderStatus> {
        self.status_tx.subscribe()
    }

    /// Fetch the next page unless a fetch is already running or the list
    /// is exhausted. Concurrent callers collapse onto the running fetch.
    pub async fn load_more(&self) -> LoadOutcome {
        let (cursor, token) = {
            let mut state = self.lock();
            match state.phase {
                LoaderPhase::Fetching => return LoadOutcome::Skipped(SkipReason::InFlight),
                LoaderPhase::Exhausted(_) => {
                    return LoadOutcome::Skipped(SkipReason::Exhausted)
                }
                LoaderPhase::Idle => {}
            }
            state.phase = LoaderPhase::Fetching;
            state.requests += 1;
            (state.cursor, state.requests)
        };
        self.publish();

        let mut guard = InFlight {
            loader: self,
            armed: true,
        };
        tracing::debug!(cursor, count = self.page_size, "fetching page");
        let result = self.source.fetch_page(cursor, self.page_size).await;
        guard.armed = false;

        let outcome = {
            let mut state = self.lock();
            if state.requests != token {
                tracing::debug!(token, "discarding superseded page");
                return LoadOutcome::Skipped(SkipReason::InFlight);
            }

            match result {
                Ok(page) => {
                    let appended = page.items.len();
                    state.items.extend(page.items);
                    match page.next_cursor {
                        Some(next) if next > state.cursor => {
                            state.cursor = next;
                            state.phase = LoaderPhase::Idle;
                            LoadOutcome::Loaded { appended }
                        }
                        _ => {
                            state.phase = LoaderPhase::Exhausted(Exhaustion::NoMorePages);
                            LoadOutcome::ReachedEnd { appended }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(cursor, error = %e, "page fetch failed");
                    state.phase = LoaderPhase::Exhausted(Exhaustion::Failed(e.to_string()));
                    LoadOutcome::Failed(e)
                }
            }
        };
        self.publish();
        outcome
    }

    /// Scroll hook: loads the next page when the view is near the end.
    pub async fn load_more_on_scroll(&self, metrics: &ScrollMetrics) -> LoadOutcome {
        match self.phase() {
            LoaderPhase::Fetching => return LoadOutcome::Skipped(SkipReason::InFlight),
            LoaderPhase::Exhausted(_) => return LoadOutcome::Skipped(SkipReason::Exhausted),
            LoaderPhase::Idle => {}
        }
        if !should_load_more(metrics, self.scroll_threshold) {
            return LoadOutcome::Skipped(SkipReason::NotNearBottom);
        }
        self.load_more().await
    }

    fn lock(&self) -> MutexGuard<'_, LoaderState<S::Item>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self) {
        let status = self.status();
        self.status_tx.send_replace(status);
    }
}

fn snapshot<T>(state: &LoaderState<T>) -> LoaderStatus {
    LoaderStatus {
        phase: state.phase.clone(),
        cursor: state.cursor,
        item_count: state.items.len(),
    }
}

/// Returns the loader to `Idle` if a fetch future is dropped before the
/// response arrives, so the list is not stuck in `Fetching`.
struct InFlight<'a, S: PageSource> {
    loader: &'a CursorPaginationLoader<S>,
    armed: bool,
}

impl<S: PageSource> Drop for InFlight<'_, S> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        {
            let mut state = self.loader.lock();
            if state.phase == LoaderPhase::Fetching {
                state.phase = LoaderPhase::Idle;
            }
        }
        self.loader.publish();
    }
}
