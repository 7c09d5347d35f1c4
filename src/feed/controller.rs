//! Paged, filterable wallpaper feed.
//!
//! The controller owns the query, the page cursor and the merged item list.
//! Fetches run as tokio tasks and report back over a channel; the owner
//! applies completions with `poll` or `next_event`, so every state change
//! happens on the owner's task. Completions are applied in the order they
//! resolve, and any completion whose query signature is no longer current is
//! discarded.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use flume::{Receiver, Sender};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::debounce::Debouncer;
use super::signature::QuerySignature;
use crate::catalog::{params, CatalogClient, CatalogError, CategoryIndex};
use crate::config::FeedConfig;
use crate::models::{
    CatalogOption, FilterKey, FilterOptions, ImageRecord, Page, QueryChange, QueryState,
};

/// What the feed is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    Idle,
    /// First page of a new query; the item list is empty until it lands.
    Fetching,
    /// Next page of the current query.
    FetchingMore,
    /// First page again, keeping the current items on screen until it lands.
    Refreshing,
    /// The last page was short; nothing more to load for this query.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchKind {
    Replace,
    Append,
    Refresh,
}

#[derive(Debug, Clone, Copy)]
struct FetchTicket {
    id: u64,
    signature: QuerySignature,
    kind: FetchKind,
    page: u32,
    page_size: u32,
}

struct Completion {
    ticket: FetchTicket,
    result: Result<Page, CatalogError>,
}

/// Notifications produced while applying input and fetch completions.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// A debounced search was committed as a new query.
    SearchCommitted(String),
    /// The item list was replaced by a first page.
    Replaced { count: usize, exhausted: bool },
    /// A further page was appended. `skipped` counts ids already present.
    Appended {
        added: usize,
        skipped: usize,
        exhausted: bool,
    },
    /// The fetch failed; items and cursor are unchanged.
    Failed(CatalogError),
    /// A completion arrived for a query that is no longer current.
    Discarded { page: u32 },
}

pub struct FeedController<C> {
    client: Arc<C>,
    config: FeedConfig,
    query: QueryState,
    categories: CategoryIndex,
    filter_options: FilterOptions,
    items: Vec<ImageRecord>,
    ids: HashSet<String>,
    /// Last page successfully loaded for the current query (0 = none).
    page: u32,
    total: Option<u64>,
    exhausted: bool,
    last_error: Option<CatalogError>,
    generation: u64,
    signature: QuerySignature,
    in_flight: Option<FetchTicket>,
    /// Fetch tasks spawned but not yet received, stale ones included.
    outstanding: usize,
    next_ticket: u64,
    fetches_issued: u64,
    initialized: bool,
    debouncer: Debouncer,
    completion_tx: Sender<Completion>,
    completion_rx: Receiver<Completion>,
}

impl<C> FeedController<C>
where
    C: CatalogClient + 'static,
{
    /// Creates an idle feed. Nothing is fetched until `initialize`.
    pub fn new(client: Arc<C>, config: FeedConfig) -> Self {
        let query = QueryState::new(config.page_size);
        let signature = QuerySignature::new(&query, 0);
        let (completion_tx, completion_rx) = flume::unbounded();
        Self {
            client,
            debouncer: Debouncer::new(config.search_debounce),
            config,
            query,
            categories: CategoryIndex::default(),
            filter_options: FilterOptions::default(),
            items: Vec::new(),
            ids: HashSet::new(),
            page: 0,
            total: None,
            exhausted: false,
            last_error: None,
            generation: 0,
            signature,
            in_flight: None,
            outstanding: 0,
            next_ticket: 0,
            fetches_issued: 0,
            initialized: false,
            completion_tx,
            completion_rx,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn items(&self) -> &[ImageRecord] {
        &self.items
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn phase(&self) -> FeedPhase {
        match self.in_flight.map(|t| t.kind) {
            Some(FetchKind::Replace) => FeedPhase::Fetching,
            Some(FetchKind::Append) => FeedPhase::FetchingMore,
            Some(FetchKind::Refresh) => FeedPhase::Refreshing,
            None if self.exhausted => FeedPhase::Exhausted,
            None => FeedPhase::Idle,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Error from the most recent completed fetch, cleared by the next success.
    pub fn last_error(&self) -> Option<&CatalogError> {
        self.last_error.as_ref()
    }

    /// Last page loaded for the current query, 0 before the first one lands.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Backend total for the current query, if it reported one.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn signature(&self) -> QuerySignature {
        self.signature
    }

    pub fn categories(&self) -> &[CatalogOption] {
        self.categories.categories()
    }

    pub fn filter_options(&self) -> &FilterOptions {
        &self.filter_options
    }

    /// Number of fetches issued since construction.
    pub fn fetches_issued(&self) -> u64 {
        self.fetches_issued
    }

    /// True while a fetch result or a debounced search is still to come.
    pub fn has_pending_work(&self) -> bool {
        self.outstanding > 0 || self.debouncer.is_pending()
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Issues the first fetch. Later calls are no-ops and return false.
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            return false;
        }
        self.initialized = true;
        info!(page_size = self.config.page_size, "Initializing feed");
        self.issue(FetchKind::Replace, 1);
        true
    }

    /// Loads categories and filter options from the catalog.
    ///
    /// Failures leave the lists empty; an unresolvable category is then just
    /// left out of requests.
    pub async fn load_catalog_options(&mut self) {
        match self.client.fetch_categories().await {
            Ok(categories) => {
                debug!(count = categories.len(), "Loaded categories");
                self.categories = CategoryIndex::new(categories);
            }
            Err(e) => warn!("Failed to load categories: {}", e),
        }
        match self.client.fetch_filter_options().await {
            Ok(options) => self.filter_options = options,
            Err(e) => warn!("Failed to load filter options: {}", e),
        }
    }

    pub fn set_categories(&mut self, categories: Vec<CatalogOption>) {
        self.categories = CategoryIndex::new(categories);
    }

    pub fn set_filter_options(&mut self, options: FilterOptions) {
        self.filter_options = options;
    }

    // =========================================================================
    // Query changes
    // =========================================================================

    /// Applies `change`, clears the list and fetches the first page.
    pub fn set_query(&mut self, change: QueryChange) {
        self.query.apply(change);
        self.bump_generation();
        self.items.clear();
        self.ids.clear();
        self.page = 0;
        self.total = None;
        self.exhausted = false;
        self.last_error = None;
        self.initialized = true;
        debug!(
            search = %self.query.search,
            category = ?self.query.category,
            filters = self.query.filters.len(),
            "Query changed"
        );
        self.issue(FetchKind::Replace, 1);
    }

    /// Fetches the next page. No-op while a fetch is in flight or once the
    /// query is exhausted; returns whether a fetch was issued.
    pub fn load_more(&mut self) -> bool {
        if self.in_flight.is_some() || self.exhausted {
            trace!(phase = ?self.phase(), "load_more ignored");
            return false;
        }
        self.issue(FetchKind::Append, self.page + 1);
        true
    }

    /// Fetches the first page again and swaps it in when it arrives.
    ///
    /// Unlike `load_more` this does not wait for an in-flight fetch; that
    /// fetch becomes stale.
    pub fn refresh(&mut self) {
        self.bump_generation();
        self.exhausted = false;
        self.last_error = None;
        self.initialized = true;
        self.issue(FetchKind::Refresh, 1);
    }

    /// Records a search keystroke. The query changes once typing pauses.
    pub fn search_input(&mut self, text: impl Into<String>) {
        self.debouncer.input(text, Instant::now());
    }

    /// Clears the search immediately, dropping any pending keystrokes.
    pub fn clear_search(&mut self) {
        self.debouncer.cancel();
        self.set_query(QueryChange::new().search(String::new()));
    }

    /// Switches category (or back to all with `None`) and clears the search.
    pub fn select_category(&mut self, slug: Option<String>) {
        self.debouncer.cancel();
        self.set_query(QueryChange::new().category(slug).search(String::new()));
    }

    pub fn set_filter(&mut self, key: FilterKey, value: impl Into<String>) {
        self.set_query(QueryChange::new().set_filter(key, value));
    }

    pub fn clear_filter(&mut self, key: FilterKey) {
        self.set_query(QueryChange::new().clear_filter(key));
    }

    /// Replaces every filter selection at once.
    pub fn apply_filters(&mut self, filters: BTreeMap<FilterKey, String>) {
        self.set_query(QueryChange::new().replace_filters(filters));
    }

    pub fn reset_filters(&mut self) {
        self.set_query(QueryChange::new().reset_filters());
    }

    // =========================================================================
    // Driving
    // =========================================================================

    /// Applies everything that is ready without waiting.
    pub fn poll(&mut self) -> Vec<FeedEvent> {
        let mut events = Vec::new();
        if let Some(event) = self.fire_due_search() {
            events.push(event);
        }
        while let Ok(completion) = self.completion_rx.try_recv() {
            events.push(self.apply(completion));
        }
        events
    }

    /// Waits for the next debounced search or fetch completion and applies it.
    ///
    /// Returns `None` when nothing is pending.
    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        loop {
            if let Some(event) = self.fire_due_search() {
                return Some(event);
            }
            if !self.has_pending_work() {
                return None;
            }

            let deadline = self.debouncer.deadline();
            let rx = self.completion_rx.clone();
            let completion = tokio::select! {
                received = rx.recv_async() => received.ok(),
                _ = tokio::time::sleep_until(
                    deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600))
                ), if deadline.is_some() => None,
            };

            if let Some(completion) = completion {
                return Some(self.apply(completion));
            }
        }
    }

    fn fire_due_search(&mut self) -> Option<FeedEvent> {
        let text = self.debouncer.poll(Instant::now())?;
        let mut change = QueryChange::new().search(text.clone());
        if text.trim().chars().count() >= self.config.search_min_chars {
            change = change.category(None);
        }
        debug!(search = %text, "Search committed");
        self.set_query(change);
        Some(FeedEvent::SearchCommitted(text))
    }

    fn bump_generation(&mut self) {
        self.generation += 1;
        self.signature = QuerySignature::new(&self.query, self.generation);
    }

    fn issue(&mut self, kind: FetchKind, page: u32) {
        self.next_ticket += 1;
        let ticket = FetchTicket {
            id: self.next_ticket,
            signature: self.signature,
            kind,
            page,
            page_size: self.query.page_size,
        };

        let mut query = self.query.clone();
        query.page = page;
        let request = params::build(&query, &self.categories);

        self.in_flight = Some(ticket);
        self.outstanding += 1;
        self.fetches_issued += 1;
        debug!(ticket = ticket.id, ?kind, page, "Issuing fetch");

        let client = Arc::clone(&self.client);
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let fetch = tokio::spawn(async move { client.fetch_page(&request).await });
            // A panicking client still has to report, or the feed would wait
            // on this ticket forever.
            let result = match fetch.await {
                Ok(result) => result,
                Err(e) => Err(CatalogError::Transient(format!("fetch task failed: {}", e))),
            };
            // The receiver lives as long as the controller; a send error only
            // means the feed was dropped.
            let _ = tx.send(Completion { ticket, result });
        });
    }

    fn apply(&mut self, completion: Completion) -> FeedEvent {
        self.outstanding = self.outstanding.saturating_sub(1);
        let Completion { ticket, result } = completion;

        let current = self.in_flight.map(|t| t.id) == Some(ticket.id);
        if ticket.signature != self.signature || !current {
            debug!(ticket = ticket.id, page = ticket.page, "Discarding stale response");
            return FeedEvent::Discarded { page: ticket.page };
        }
        self.in_flight = None;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                warn!(page = ticket.page, "Fetch failed: {}", e);
                self.last_error = Some(e.clone());
                return FeedEvent::Failed(e);
            }
        };

        self.last_error = None;
        self.exhausted = page.is_short(ticket.page_size);
        self.page = ticket.page;
        self.query.page = ticket.page;
        if page.total.is_some() {
            self.total = page.total;
        }

        match ticket.kind {
            FetchKind::Replace | FetchKind::Refresh => {
                self.items.clear();
                self.ids.clear();
                self.merge(page.items);
                debug!(
                    count = self.items.len(),
                    exhausted = self.exhausted,
                    "Feed replaced"
                );
                FeedEvent::Replaced {
                    count: self.items.len(),
                    exhausted: self.exhausted,
                }
            }
            FetchKind::Append => {
                let (added, skipped) = self.merge(page.items);
                if skipped > 0 {
                    debug!(skipped, page = ticket.page, "Dropped duplicate ids from page");
                }
                FeedEvent::Appended {
                    added,
                    skipped,
                    exhausted: self.exhausted,
                }
            }
        }
    }

    /// Appends items whose id is not present yet. Returns (added, skipped).
    fn merge(&mut self, incoming: Vec<ImageRecord>) -> (usize, usize) {
        let mut added = 0;
        let mut skipped = 0;
        for item in incoming {
            if item.has_id() && self.ids.insert(item.id.clone()) {
                self.items.push(item);
                added += 1;
            } else {
                skipped += 1;
            }
        }
        (added, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use crate::catalog::RequestParams;
    use crate::feed::testing::{image, images, FnCatalog, GatedCatalog, PanicCatalog};

    fn config(page_size: u32) -> FeedConfig {
        FeedConfig {
            page_size,
            ..FeedConfig::default()
        }
    }

    /// Serves `total` items named `img0..` in pages of `limit`.
    fn paged(total: usize) -> FnCatalog {
        FnCatalog::new(move |p| {
            let start = ((p.page - 1) * p.limit) as usize;
            let end = (start + p.limit as usize).min(total);
            Ok(Page::new(images("img", start.min(end)..end)))
        })
    }

    async fn drain<C: CatalogClient + 'static>(feed: &mut FeedController<C>) -> Vec<FeedEvent> {
        let mut events = Vec::new();
        while let Some(event) = feed.next_event().await {
            events.push(event);
        }
        events
    }

    fn ids<C: CatalogClient + 'static>(feed: &FeedController<C>) -> Vec<&str> {
        feed.items().iter().map(|i| i.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_initialize_fetches_first_page_once() {
        let catalog = Arc::new(paged(12));
        let mut feed = FeedController::new(catalog.clone(), config(5));
        assert_eq!(feed.phase(), FeedPhase::Idle);

        assert!(feed.initialize());
        assert!(!feed.initialize());
        assert_eq!(feed.phase(), FeedPhase::Fetching);

        let events = drain(&mut feed).await;
        assert_eq!(
            events,
            vec![FeedEvent::Replaced {
                count: 5,
                exhausted: false
            }]
        );
        assert_eq!(feed.page(), 1);
        assert_eq!(feed.fetches_issued(), 1);
        assert_eq!(catalog.calls().len(), 1);
        assert_eq!(feed.phase(), FeedPhase::Idle);
    }

    #[tokio::test]
    async fn test_load_more_until_exhausted() {
        let catalog = Arc::new(paged(12));
        let mut feed = FeedController::new(catalog.clone(), config(5));
        feed.initialize();
        drain(&mut feed).await;

        assert!(feed.load_more());
        assert_eq!(feed.phase(), FeedPhase::FetchingMore);
        assert_eq!(
            feed.next_event().await,
            Some(FeedEvent::Appended {
                added: 5,
                skipped: 0,
                exhausted: false
            })
        );
        assert!(feed.load_more());
        assert_eq!(
            feed.next_event().await,
            Some(FeedEvent::Appended {
                added: 2,
                skipped: 0,
                exhausted: true
            })
        );

        assert_eq!(feed.phase(), FeedPhase::Exhausted);
        assert_eq!(feed.page(), 3);
        assert!(!feed.load_more());
        assert_eq!(feed.fetches_issued(), 3);

        let expected: Vec<String> = (0..12).map(|i| format!("img{}", i)).collect();
        assert_eq!(ids(&feed), expected);
        let pages: Vec<u32> = catalog.calls().iter().map(|p| p.page).collect();
        assert_eq!(pages, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_short_first_page_is_exhausted() {
        let catalog = Arc::new(paged(10));
        let mut feed = FeedController::new(catalog, config(25));
        feed.initialize();
        assert_eq!(
            feed.next_event().await,
            Some(FeedEvent::Replaced {
                count: 10,
                exhausted: true
            })
        );
        assert!(feed.is_exhausted());
        assert!(!feed.load_more());
        assert_eq!(feed.fetches_issued(), 1);
    }

    #[tokio::test]
    async fn test_load_more_ignored_while_fetching() {
        let catalog = Arc::new(paged(20));
        let mut feed = FeedController::new(catalog.clone(), config(5));
        feed.initialize();
        assert!(!feed.load_more());
        drain(&mut feed).await;
        assert_eq!(catalog.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_pages_are_deduplicated() {
        let catalog = Arc::new(FnCatalog::new(|p| {
            let items = match p.page {
                1 => images("img", 0..5),
                2 => images("img", 3..8),
                _ => Vec::new(),
            };
            Ok(Page::new(items))
        }));
        let mut feed = FeedController::new(catalog, config(5));
        feed.initialize();
        drain(&mut feed).await;

        feed.load_more();
        assert_eq!(
            feed.next_event().await,
            Some(FeedEvent::Appended {
                added: 3,
                skipped: 2,
                exhausted: false
            })
        );
        let unique: HashSet<&str> = ids(&feed).into_iter().collect();
        assert_eq!(unique.len(), 8);
        assert_eq!(feed.items().len(), 8);
    }

    #[tokio::test]
    async fn test_duplicates_and_blank_ids_within_a_page_are_dropped() {
        let catalog = Arc::new(FnCatalog::new(|_| {
            Ok(Page::new(vec![
                image("a"),
                image("b"),
                image("a"),
                image("  "),
                image("c"),
            ]))
        }));
        let mut feed = FeedController::new(catalog, config(5));
        feed.initialize();
        assert_eq!(
            feed.next_event().await,
            Some(FeedEvent::Replaced {
                count: 3,
                exhausted: false
            })
        );
        assert_eq!(ids(&feed), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let catalog = Arc::new(GatedCatalog::new());
        let mut feed = FeedController::new(catalog.clone(), config(5));

        feed.set_query(QueryChange::new().search("cats"));
        catalog.wait_for_calls(1).await;
        feed.set_query(QueryChange::new().search("dogs"));
        catalog.wait_for_calls(2).await;
        assert_eq!(catalog.params(0).search.as_deref(), Some("cats"));
        assert_eq!(catalog.params(1).search.as_deref(), Some("dogs"));

        // The newer query resolves first.
        catalog.respond(1, Ok(Page::new(images("dog", 0..3))));
        assert_eq!(
            feed.next_event().await,
            Some(FeedEvent::Replaced {
                count: 3,
                exhausted: true
            })
        );

        catalog.respond(0, Ok(Page::new(images("cat", 0..5))));
        assert_eq!(feed.next_event().await, Some(FeedEvent::Discarded { page: 1 }));
        assert_eq!(ids(&feed), vec!["dog0", "dog1", "dog2"]);
        assert_eq!(feed.next_event().await, None);
    }

    #[tokio::test]
    async fn test_failure_keeps_state_and_retries_same_page() {
        let fail_once = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&fail_once);
        let catalog = Arc::new(FnCatalog::new(move |p| {
            if p.page == 2 && flag.swap(false, Ordering::SeqCst) {
                return Err(CatalogError::Transient("timeout".into()));
            }
            let start = ((p.page - 1) * p.limit) as usize;
            Ok(Page::new(images("img", start..start + p.limit as usize)))
        }));
        let mut feed = FeedController::new(catalog.clone(), config(5));
        feed.initialize();
        drain(&mut feed).await;

        feed.load_more();
        assert_eq!(
            feed.next_event().await,
            Some(FeedEvent::Failed(CatalogError::Transient("timeout".into())))
        );
        assert_eq!(feed.items().len(), 5);
        assert_eq!(feed.page(), 1);
        assert!(feed.last_error().is_some());
        assert_eq!(feed.phase(), FeedPhase::Idle);

        assert!(feed.load_more());
        assert_eq!(
            feed.next_event().await,
            Some(FeedEvent::Appended {
                added: 5,
                skipped: 0,
                exhausted: false
            })
        );
        assert!(feed.last_error().is_none());
        let pages: Vec<u32> = catalog.calls().iter().map(|p| p.page).collect();
        assert_eq!(pages, vec![1, 2, 2]);
    }

    #[tokio::test]
    async fn test_refresh_keeps_items_and_supersedes_load_more() {
        let catalog = Arc::new(GatedCatalog::new());
        let mut feed = FeedController::new(catalog.clone(), config(5));
        feed.initialize();
        catalog.wait_for_calls(1).await;
        catalog.respond(0, Ok(Page::new(images("old", 0..5))));
        feed.next_event().await;

        assert!(feed.load_more());
        catalog.wait_for_calls(2).await;
        feed.refresh();
        catalog.wait_for_calls(3).await;
        assert_eq!(feed.phase(), FeedPhase::Refreshing);
        assert_eq!(feed.items().len(), 5);
        assert_eq!(catalog.params(2).page, 1);

        catalog.respond(1, Ok(Page::new(images("more", 0..5))));
        assert_eq!(feed.next_event().await, Some(FeedEvent::Discarded { page: 2 }));
        assert_eq!(feed.items()[0].id, "old0");

        catalog.respond(2, Ok(Page::new(images("fresh", 0..5))));
        assert_eq!(
            feed.next_event().await,
            Some(FeedEvent::Replaced {
                count: 5,
                exhausted: false
            })
        );
        assert_eq!(feed.items()[0].id, "fresh0");
        assert_eq!(feed.page(), 1);
    }

    #[tokio::test]
    async fn test_refresh_rederives_exhaustion() {
        let available = Arc::new(AtomicUsize::new(3));
        let count = Arc::clone(&available);
        let catalog = Arc::new(FnCatalog::new(move |p| {
            let total = count.load(Ordering::SeqCst);
            let start = ((p.page - 1) * p.limit) as usize;
            let end = (start + p.limit as usize).min(total);
            Ok(Page::new(images("img", start.min(end)..end)))
        }));
        let mut feed = FeedController::new(catalog, config(5));
        feed.initialize();
        drain(&mut feed).await;
        assert!(feed.is_exhausted());
        assert!(!feed.load_more());

        available.store(12, Ordering::SeqCst);
        feed.refresh();
        assert!(!feed.is_exhausted());
        assert_eq!(feed.phase(), FeedPhase::Refreshing);
        assert_eq!(feed.items().len(), 3);

        assert_eq!(
            feed.next_event().await,
            Some(FeedEvent::Replaced {
                count: 5,
                exhausted: false
            })
        );
        assert!(feed.load_more());
        drain(&mut feed).await;
        assert_eq!(feed.items().len(), 10);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_items() {
        let failing = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&failing);
        let catalog = Arc::new(FnCatalog::new(move |p| {
            if flag.load(Ordering::SeqCst) {
                return Err(CatalogError::Transient("offline".into()));
            }
            let start = ((p.page - 1) * p.limit) as usize;
            Ok(Page::new(images("img", start..start + p.limit as usize)))
        }));
        let mut feed = FeedController::new(catalog, config(5));
        feed.initialize();
        drain(&mut feed).await;

        failing.store(true, Ordering::SeqCst);
        feed.refresh();
        assert_eq!(
            feed.next_event().await,
            Some(FeedEvent::Failed(CatalogError::Transient("offline".into())))
        );
        assert_eq!(feed.items().len(), 5);
        assert_eq!(feed.items()[0].id, "img0");
        assert_eq!(feed.page(), 1);
        assert!(feed.last_error().is_some());
        assert_eq!(feed.phase(), FeedPhase::Idle);
    }

    #[tokio::test]
    async fn test_failed_first_page_retries_page_one() {
        let fail_once = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&fail_once);
        let catalog = Arc::new(FnCatalog::new(move |p| {
            if flag.swap(false, Ordering::SeqCst) {
                return Err(CatalogError::Transient("timeout".into()));
            }
            let start = ((p.page - 1) * p.limit) as usize;
            Ok(Page::new(images("img", start..start + p.limit as usize)))
        }));
        let mut feed = FeedController::new(catalog.clone(), config(5));

        feed.set_query(QueryChange::new().search("forest"));
        assert!(matches!(
            feed.next_event().await,
            Some(FeedEvent::Failed(_))
        ));
        assert!(feed.items().is_empty());
        assert_eq!(feed.page(), 0);

        assert!(feed.load_more());
        assert_eq!(
            feed.next_event().await,
            Some(FeedEvent::Appended {
                added: 5,
                skipped: 0,
                exhausted: false
            })
        );
        let calls = catalog.calls();
        assert_eq!(calls.iter().map(|p| p.page).collect::<Vec<_>>(), vec![1, 1]);
        assert!(calls.iter().all(|p| p.search.as_deref() == Some("forest")));
    }

    #[tokio::test]
    async fn test_panicking_client_reports_failure() {
        let mut feed = FeedController::new(Arc::new(PanicCatalog), config(5));
        feed.initialize();
        assert!(matches!(
            feed.next_event().await,
            Some(FeedEvent::Failed(CatalogError::Transient(_)))
        ));
        assert!(!feed.has_pending_work());
        assert_eq!(feed.phase(), FeedPhase::Idle);
        assert_eq!(feed.next_event().await, None);
    }

    #[tokio::test]
    async fn test_set_query_clears_items_immediately() {
        let catalog = Arc::new(paged(20));
        let mut feed = FeedController::new(catalog, config(5));
        feed.initialize();
        drain(&mut feed).await;
        assert_eq!(feed.items().len(), 5);

        feed.set_query(QueryChange::new().search("forest"));
        assert!(feed.items().is_empty());
        assert_eq!(feed.page(), 0);
        assert_eq!(feed.phase(), FeedPhase::Fetching);
        drain(&mut feed).await;
        assert_eq!(feed.items().len(), 5);
    }

    #[tokio::test]
    async fn test_poll_applies_ready_completions() {
        let catalog = Arc::new(GatedCatalog::new());
        let mut feed = FeedController::new(catalog.clone(), config(5));
        feed.initialize();
        catalog.wait_for_calls(1).await;
        assert!(feed.poll().is_empty());

        catalog.respond(0, Ok(Page::new(images("img", 0..2))));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            feed.poll(),
            vec![FeedEvent::Replaced {
                count: 2,
                exhausted: true
            }]
        );
        assert!(!feed.has_pending_work());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_keystrokes_coalesce() {
        let catalog = Arc::new(paged(3));
        let mut feed = FeedController::new(catalog.clone(), config(5));

        feed.search_input("sun");
        tokio::time::advance(Duration::from_millis(100)).await;
        feed.search_input("suns");
        tokio::time::advance(Duration::from_millis(100)).await;
        feed.search_input("sunset");
        assert!(feed.poll().is_empty());

        assert_eq!(
            feed.next_event().await,
            Some(FeedEvent::SearchCommitted("sunset".into()))
        );
        assert_eq!(
            feed.next_event().await,
            Some(FeedEvent::Replaced {
                count: 3,
                exhausted: true
            })
        );
        assert_eq!(feed.next_event().await, None);

        let calls = catalog.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].search.as_deref(), Some("sunset"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_search_fires_immediately() {
        let catalog = Arc::new(paged(3));
        let mut feed = FeedController::new(catalog.clone(), config(5));
        feed.search_input("sea");
        feed.clear_search();

        let events = drain(&mut feed).await;
        assert!(!events
            .iter()
            .any(|e| matches!(e, FeedEvent::SearchCommitted(_))));
        let calls = catalog.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].search, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_search_replaces_category() {
        let catalog = Arc::new(paged(3));
        let mut feed = FeedController::new(catalog, config(5));
        feed.select_category(Some("nature".into()));
        drain(&mut feed).await;

        feed.search_input("ab");
        drain(&mut feed).await;
        assert_eq!(feed.query().category.as_deref(), Some("nature"));

        feed.search_input("ocean");
        drain(&mut feed).await;
        assert_eq!(feed.query().search, "ocean");
        assert_eq!(feed.query().category, None);
    }

    #[tokio::test]
    async fn test_select_category_clears_search() {
        let catalog = Arc::new(paged(3));
        let mut feed = FeedController::new(catalog, config(5));
        feed.set_query(QueryChange::new().search("cats"));
        drain(&mut feed).await;

        feed.select_category(Some("nature".into()));
        assert_eq!(feed.query().search, "");
        assert_eq!(feed.query().category.as_deref(), Some("nature"));
    }

    #[tokio::test]
    async fn test_category_slug_resolves_to_catalog_id() {
        let catalog = Arc::new(paged(3).with_categories(vec![CatalogOption {
            id: "c-nature".into(),
            slug: "nature".into(),
            name: "Nature".into(),
        }]));
        let mut feed = FeedController::new(catalog.clone(), config(5));
        feed.load_catalog_options().await;
        assert_eq!(feed.categories().len(), 1);

        feed.select_category(Some("nature".into()));
        drain(&mut feed).await;
        feed.select_category(Some("space".into()));
        drain(&mut feed).await;

        let calls = catalog.calls();
        assert_eq!(calls[0].main_category.as_deref(), Some("c-nature"));
        assert_eq!(calls[1].main_category, None);
    }

    #[tokio::test]
    async fn test_filter_changes_reach_requests() {
        let catalog = Arc::new(paged(3));
        let mut feed = FeedController::new(catalog.clone(), config(5));

        feed.set_filter(FilterKey::Order, "popular");
        drain(&mut feed).await;
        feed.clear_filter(FilterKey::Order);
        drain(&mut feed).await;

        let mut filters = BTreeMap::new();
        filters.insert(FilterKey::Color, "#ffffff".to_string());
        filters.insert(FilterKey::ScreenType, "phone".to_string());
        feed.apply_filters(filters);
        drain(&mut feed).await;
        feed.reset_filters();
        drain(&mut feed).await;

        let calls = catalog.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0].sort.as_deref(), Some("popular"));
        assert_eq!(calls[1].sort, None);
        assert_eq!(calls[2].dominant_color.as_deref(), Some("#ffffff"));
        assert_eq!(calls[2].screen_type.as_deref(), Some("phone"));
        assert_eq!(calls[3], RequestParams { page: 1, limit: 5, ..Default::default() });
        assert!(feed.query().filters.is_empty());
    }
}
