use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use crate::feed::document::{parse_document, DocumentError};
use crate::feed::fetcher::{fetch_document, FetchError, FetchOptions};
use crate::feed::merge::merge;
use crate::feed::FeedFormat;
use crate::item::Item;

// ============================================================================
// Events and Errors
// ============================================================================

/// A refresh-granularity failure. Entry- and field-level problems never
/// reach this type; they are absorbed during normalization.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The document could not be fetched. Previously held items are kept.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The document could not be parsed at all. Previously held items are
    /// kept.
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// What a successful refresh did.
#[derive(Debug, Clone)]
pub struct RefreshSummary {
    /// Format family detected from the document root.
    pub format: FeedFormat,
    /// Item count after the merge.
    pub total: usize,
    /// Items that were not present before this refresh.
    pub new_items: usize,
    /// Entries skipped during normalization for having no usable fields.
    pub skipped_entries: usize,
}

/// Announcement delivered to every subscriber after a completed refresh.
///
/// Exactly one event per completed `refresh()` call; success or failure
/// travels in `result`, never on a separate channel. Superseded refreshes
/// announce nothing.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// A refresh cycle ran to completion.
    Updated {
        /// The feed's URL at the time the refresh started.
        url: Url,
        /// Outcome; the error is shared because the event fans out to
        /// every subscriber.
        result: Result<RefreshSummary, Arc<RefreshError>>,
    },
}

/// Where a feed currently is in its refresh cycle.
///
/// `Parsing`, `Merged`, and `Failed` are only ever observable from within
/// the completion section itself (parse and merge never yield), so
/// outside callers effectively see `Idle` or `Fetching`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    /// No refresh in flight.
    Idle,
    /// A fetch has been issued and not yet completed or been superseded.
    Fetching,
    /// Document bytes are being parsed and normalized.
    Parsing,
    /// The merge was applied and the item list swapped.
    Merged,
    /// The refresh failed; previously held items were kept.
    Failed,
}

// ============================================================================
// Feed
// ============================================================================

/// A syndicated content source, identified by URL, with a locally
/// maintained list of entries.
///
/// `Feed` is a cheaply cloneable handle; clones share one underlying
/// state. [`refresh()`](Feed::refresh) is fire-and-forget: it spawns a
/// fetch task and returns, and the outcome is observed through
/// [`subscribe()`](Feed::subscribe). At most one fetch is outstanding per
/// feed: a second `refresh()` supersedes the first rather than queueing
/// behind it, and the superseded fetch's result is discarded even if it
/// arrives later.
///
/// All state transitions (cancel-and-replace, the item list swap, the
/// completion announcement) happen under one internal lock that is never
/// held across an await, so concurrent callers on multiple threads see
/// them as atomic.
#[derive(Clone)]
pub struct Feed {
    inner: Arc<FeedInner>,
}

struct FeedInner {
    client: reqwest::Client,
    options: FetchOptions,
    state: Mutex<FeedState>,
}

struct FeedState {
    url: Url,
    items: Arc<Vec<Item>>,
    phase: RefreshPhase,
    /// Bumped on every refresh/URL change; a completing fetch task whose
    /// generation no longer matches has been superseded and discards
    /// itself instead of merging.
    generation: u64,
    refresh_handle: Option<JoinHandle<()>>,
    observers: Vec<mpsc::UnboundedSender<FeedEvent>>,
    last_error: Option<Arc<RefreshError>>,
}

impl Feed {
    /// Creates a feed with an empty item list and a default HTTP client.
    pub fn new(url: Url) -> Feed {
        Feed::with_client(url, reqwest::Client::new(), FetchOptions::default())
    }

    /// Creates a feed using the given client and fetch tunables. Embedders
    /// share one `reqwest::Client` across feeds; it is cheap to clone.
    pub fn with_client(url: Url, client: reqwest::Client, options: FetchOptions) -> Feed {
        Feed {
            inner: Arc::new(FeedInner {
                client,
                options,
                state: Mutex::new(FeedState {
                    url,
                    items: Arc::new(Vec::new()),
                    phase: RefreshPhase::Idle,
                    generation: 0,
                    refresh_handle: None,
                    observers: Vec::new(),
                    last_error: None,
                }),
            }),
        }
    }

    /// The feed's current URL.
    pub fn url(&self) -> Url {
        self.lock().url.clone()
    }

    /// Points the feed at a new URL.
    ///
    /// Any in-flight refresh is superseded: a document fetched from the
    /// old URL must not be merged under the new one. Held items are kept
    /// until the next completed refresh.
    pub fn set_url(&self, url: Url) {
        let mut state = self.lock();
        if state.url == url {
            return;
        }
        if let Some(handle) = state.refresh_handle.take() {
            handle.abort();
            tracing::debug!(old = %state.url, new = %url, "URL changed, superseding in-flight refresh");
        }
        state.generation = state.generation.wrapping_add(1);
        state.phase = RefreshPhase::Idle;
        state.url = url;
    }

    /// Snapshot of the current item list, descending by published time.
    ///
    /// The snapshot is immutable; later refreshes swap in a new list
    /// rather than mutating this one.
    pub fn items(&self) -> Arc<Vec<Item>> {
        Arc::clone(&self.lock().items)
    }

    /// Current position in the refresh cycle.
    pub fn phase(&self) -> RefreshPhase {
        self.lock().phase
    }

    /// The most recent refresh failure, cleared by the next success.
    pub fn last_error(&self) -> Option<Arc<RefreshError>> {
        self.lock().last_error.clone()
    }

    /// Registers an observer. Every completed refresh delivers exactly one
    /// [`FeedEvent`] to each receiver still alive; dropped receivers are
    /// pruned at announcement time.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<FeedEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().observers.push(tx);
        rx
    }

    /// Starts one fetch-parse-merge cycle. Fire-and-forget: the outcome is
    /// announced to subscribers, not returned.
    ///
    /// If a fetch is already in flight it is cancelled first; a second
    /// call supersedes, not queues.
    pub fn refresh(&self) {
        let mut state = self.lock();
        if let Some(handle) = state.refresh_handle.take() {
            handle.abort();
            tracing::debug!(url = %state.url, "Superseding in-flight refresh");
        }
        state.generation = state.generation.wrapping_add(1);
        state.phase = RefreshPhase::Fetching;

        let generation = state.generation;
        let url = state.url.clone();
        let weak = Arc::downgrade(&self.inner);
        let client = self.inner.client.clone();
        let options = self.inner.options.clone();

        // The task holds only a weak reference to the feed: dropping the
        // last Feed handle must not be kept alive by its own refresh.
        state.refresh_handle = Some(tokio::spawn(async move {
            run_refresh(weak, client, options, url, generation).await;
        }));
    }

    /// Marks the item with the given identity key as viewed, producing a
    /// new item list. Returns false when no item matches.
    pub fn mark_viewed(&self, identity_key: &str) -> bool {
        self.replace_item(identity_key, Item::with_viewed)
    }

    /// Marks the item with the given identity key as notified, producing a
    /// new item list. Returns false when no item matches.
    pub fn mark_notified(&self, identity_key: &str) -> bool {
        self.replace_item(identity_key, Item::with_notified)
    }

    /// Items are immutable-by-replacement: flag changes build a new list
    /// and swap it, preserving the merge engine's single-writer view.
    fn replace_item(&self, identity_key: &str, update: impl Fn(&Item) -> Item) -> bool {
        let mut state = self.lock();
        let Some(position) = state
            .items
            .iter()
            .position(|item| item.identity_key() == identity_key)
        else {
            return false;
        };
        let mut items: Vec<Item> = state.items.as_ref().clone();
        items[position] = update(&items[position]);
        state.items = Arc::new(items);
        true
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        // A panic under this short lock leaves no torn state worth
        // preserving the poison for
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for FeedState {
    fn drop(&mut self) {
        if let Some(handle) = self.refresh_handle.take() {
            handle.abort();
            tracing::debug!(url = %self.url, "Aborted in-flight refresh on feed drop");
        }
    }
}

/// One refresh cycle. The fetch is the only suspension point; everything
/// after it runs synchronously under the state lock, making the
/// generation check, the merge, the list swap, and the announcement one
/// atomic step with respect to other refreshes and mark operations.
async fn run_refresh(
    weak: Weak<FeedInner>,
    client: reqwest::Client,
    options: FetchOptions,
    url: Url,
    generation: u64,
) {
    tracing::debug!(url = %url, "Refreshing feed");
    let fetched = fetch_document(&client, &url, &options).await;

    let Some(inner) = weak.upgrade() else {
        tracing::debug!(url = %url, "Feed dropped during fetch, discarding result");
        return;
    };
    let mut state = inner
        .state
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if state.generation != generation {
        tracing::debug!(url = %url, "Discarding superseded refresh result");
        return;
    }
    state.refresh_handle = None;

    let result = match fetched {
        Err(e) => Err(RefreshError::Fetch(e)),
        Ok(bytes) => {
            state.phase = RefreshPhase::Parsing;
            match parse_document(&bytes) {
                Err(e) => Err(RefreshError::Document(e)),
                Ok(doc) => {
                    let merged = merge(&state.items, doc.items);
                    let summary = RefreshSummary {
                        format: doc.format,
                        total: merged.len(),
                        new_items: merged.len() - state.items.len(),
                        skipped_entries: doc.skipped,
                    };
                    state.items = Arc::new(merged);
                    state.phase = RefreshPhase::Merged;
                    Ok(summary)
                }
            }
        }
    };

    let result = match result {
        Ok(summary) => {
            state.last_error = None;
            tracing::info!(
                url = %url,
                total = summary.total,
                new_items = summary.new_items,
                skipped = summary.skipped_entries,
                "Feed refreshed"
            );
            Ok(summary)
        }
        Err(e) => {
            state.phase = RefreshPhase::Failed;
            let shared = Arc::new(e);
            state.last_error = Some(Arc::clone(&shared));
            tracing::warn!(url = %url, error = %shared, "Feed refresh failed, keeping previous items");
            Err(shared)
        }
    };

    state.phase = RefreshPhase::Idle;
    announce(&mut state, FeedEvent::Updated { url, result });
}

fn announce(state: &mut FeedState, event: FeedEvent) {
    state
        .observers
        .retain(|observer| observer.send(event.clone()).is_ok());
}
