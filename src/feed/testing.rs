//! Catalog doubles for feed tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::catalog::{CatalogClient, CatalogError, RequestParams};
use crate::models::{CatalogOption, ImageRecord, Page};

pub fn image(id: impl Into<String>) -> ImageRecord {
    let id = id.into();
    let url = format!("https://cdn/{}.jpg", id);
    ImageRecord::new(id, url).with_dimensions(1080, 1920)
}

pub fn images(prefix: &str, range: std::ops::Range<usize>) -> Vec<ImageRecord> {
    range.map(|i| image(format!("{}{}", prefix, i))).collect()
}

type Responder = dyn Fn(&RequestParams) -> Result<Page, CatalogError> + Send + Sync;

/// Answers immediately from a closure and records every request.
pub struct FnCatalog {
    respond: Box<Responder>,
    calls: Mutex<Vec<RequestParams>>,
    categories: Vec<CatalogOption>,
}

impl FnCatalog {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&RequestParams) -> Result<Page, CatalogError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
            categories: Vec::new(),
        }
    }

    pub fn with_categories(mut self, categories: Vec<CatalogOption>) -> Self {
        self.categories = categories;
        self
    }

    pub fn calls(&self) -> Vec<RequestParams> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CatalogClient for FnCatalog {
    async fn fetch_page(&self, params: &RequestParams) -> Result<Page, CatalogError> {
        self.calls.lock().push(params.clone());
        (self.respond)(params)
    }

    async fn fetch_categories(&self) -> Result<Vec<CatalogOption>, CatalogError> {
        Ok(self.categories.clone())
    }
}

/// Holds every request open until the test answers it.
#[derive(Default)]
pub struct GatedCatalog {
    calls: Mutex<Vec<(RequestParams, Option<oneshot::Sender<Result<Page, CatalogError>>>)>>,
}

impl GatedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn params(&self, index: usize) -> RequestParams {
        self.calls.lock()[index].0.clone()
    }

    /// Answers request `index` (in issue order).
    pub fn respond(&self, index: usize, result: Result<Page, CatalogError>) {
        let sender = self.calls.lock()[index].1.take();
        if let Some(sender) = sender {
            let _ = sender.send(result);
        }
    }

    /// Lets spawned fetch tasks run until `n` requests have arrived.
    pub async fn wait_for_calls(&self, n: usize) {
        for _ in 0..1000 {
            if self.call_count() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {} catalog calls, saw {}", n, self.call_count());
    }
}

#[async_trait]
impl CatalogClient for GatedCatalog {
    async fn fetch_page(&self, params: &RequestParams) -> Result<Page, CatalogError> {
        let (tx, rx) = oneshot::channel();
        self.calls.lock().push((params.clone(), Some(tx)));
        rx.await
            .unwrap_or_else(|_| Err(CatalogError::Transient("request dropped".into())))
    }
}

/// Panics on every request.
pub struct PanicCatalog;

#[async_trait]
impl CatalogClient for PanicCatalog {
    async fn fetch_page(&self, _params: &RequestParams) -> Result<Page, CatalogError> {
        panic!("catalog exploded");
    }
}
