//! Viewer sessions over pluggable renderers.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::domain::{Position, PositionKind, UploadedItem};

use super::position::ReadingPositionStore;
use super::ViewerError;

/// A renderer that shows one page at a time (PDF)
#[async_trait]
pub trait PageRenderer: Send {
    /// Parse the document and return its page count
    async fn load(&mut self, bytes: Arc<[u8]>) -> Result<u32, ViewerError>;

    /// Show a 1-based page
    async fn render(&mut self, page: u32) -> Result<(), ViewerError>;
}

/// A renderer that lays text out itself (EPUB)
#[async_trait]
pub trait ReflowRenderer: Send {
    async fn load(&mut self, bytes: Arc<[u8]>) -> Result<(), ViewerError>;

    /// Show the book at a saved location token, or at the start
    async fn display(&mut self, location: Option<&str>) -> Result<(), ViewerError>;

    async fn next(&mut self) -> Result<(), ViewerError>;

    async fn prev(&mut self) -> Result<(), ViewerError>;

    /// Token for the currently shown location
    fn location(&self) -> Option<String>;
}

/// What the viewer shows after an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerOutcome {
    Page { page: u32, total: u32 },
    Location(Option<String>),
    /// Rendering failed; show this message in place of the document
    ErrorPanel(String),
}

// ----------------------------------------------------------------------------
// Stale-load guard
// ----------------------------------------------------------------------------

/// Tracks the active load. Starting a new load makes every earlier one stale.
#[derive(Debug, Clone, Default)]
pub struct LoadGuard {
    generation: Arc<AtomicU64>,
}

#[derive(Debug)]
pub struct LoadTicket {
    id: u64,
    generation: Arc<AtomicU64>,
}

impl LoadTicket {
    /// No newer load has started since this ticket was issued
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.id
    }
}

impl LoadGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> LoadTicket {
        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        LoadTicket {
            id,
            generation: Arc::clone(&self.generation),
        }
    }

    /// Await `load`, dropping its result if another load began meanwhile
    pub async fn run<F: Future>(&self, load: F) -> Option<F::Output> {
        let ticket = self.begin();
        let output = load.await;
        if ticket.is_current() {
            Some(output)
        } else {
            debug!("Discarding result of a superseded load");
            None
        }
    }
}

// ----------------------------------------------------------------------------
// Paged documents
// ----------------------------------------------------------------------------

pub struct PagedSession<R> {
    renderer: R,
    positions: ReadingPositionStore,
    file_name: String,
    page: u32,
    total: u32,
    failure: Option<String>,
}

impl<R: PageRenderer> PagedSession<R> {
    /// Load an upload and show the saved page (or page 1).
    ///
    /// Returns `None` when a newer load started on `guard` while this one
    /// was in flight.
    pub async fn open(
        mut renderer: R,
        positions: ReadingPositionStore,
        item: &UploadedItem,
        guard: &LoadGuard,
    ) -> Option<Self> {
        let file_name = item.name.clone();
        let loaded = guard.run(renderer.load(item.content_handle())).await?;

        let mut session = Self {
            renderer,
            positions,
            file_name,
            page: 0,
            total: 0,
            failure: None,
        };

        match loaded {
            Ok(0) => session.fail("The document has no pages."),
            Ok(total) => {
                session.total = total;
                let saved = match session.positions.load(PositionKind::Pdf, &session.file_name).await {
                    Some(saved) => match saved.position {
                        Position::Page(page) => page,
                        _ => 1,
                    },
                    None => 1,
                };
                let start = saved.clamp(1, total);
                session.show(start).await;
            }
            Err(e) => {
                error!(file = %session.file_name, "Failed to load document: {}", e);
                session.fail("Could not load the PDF file. Check that it is not corrupted.");
            }
        }

        Some(session)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn outcome(&self) -> ViewerOutcome {
        match &self.failure {
            Some(message) => ViewerOutcome::ErrorPanel(message.clone()),
            None => ViewerOutcome::Page {
                page: self.page,
                total: self.total,
            },
        }
    }

    pub async fn next(&mut self) -> ViewerOutcome {
        self.go_to(self.page.saturating_add(1)).await
    }

    pub async fn prev(&mut self) -> ViewerOutcome {
        self.go_to(self.page.saturating_sub(1)).await
    }

    /// Jump to a page, clamped to the document
    pub async fn go_to(&mut self, page: u32) -> ViewerOutcome {
        if self.failure.is_none() {
            let target = page.clamp(1, self.total.max(1));
            if target != self.page {
                self.show(target).await;
            }
        }
        self.outcome()
    }

    async fn show(&mut self, page: u32) {
        if let Err(e) = self.renderer.render(page).await {
            error!(file = %self.file_name, page, "Failed to render page: {}", e);
            self.fail("Could not display this page.");
            return;
        }

        self.page = page;
        if let Err(e) = self
            .positions
            .save(PositionKind::Pdf, &self.file_name, Position::Page(page))
            .await
        {
            warn!(file = %self.file_name, "Could not save reading position: {}", e);
        }
    }

    fn fail(&mut self, message: &str) {
        self.failure = Some(message.to_string());
    }
}

// ----------------------------------------------------------------------------
// Reflowable books
// ----------------------------------------------------------------------------

pub struct ReflowSession<R> {
    renderer: R,
    positions: ReadingPositionStore,
    file_name: String,
    failure: Option<String>,
}

impl<R: ReflowRenderer> ReflowSession<R> {
    /// Load an upload and show it at the saved location (or the start).
    ///
    /// A saved location the renderer rejects falls back to the start.
    pub async fn open(
        mut renderer: R,
        positions: ReadingPositionStore,
        item: &UploadedItem,
        guard: &LoadGuard,
    ) -> Option<Self> {
        let file_name = item.name.clone();
        let loaded = guard.run(renderer.load(item.content_handle())).await?;

        let mut session = Self {
            renderer,
            positions,
            file_name,
            failure: None,
        };

        if let Err(e) = loaded {
            error!(file = %session.file_name, "Failed to load book: {}", e);
            session.fail();
            return Some(session);
        }

        let saved = session
            .positions
            .load(PositionKind::Epub, &session.file_name)
            .await
            .and_then(|p| match p.position {
                Position::Location(token) => Some(token),
                _ => None,
            });

        let mut shown = session.renderer.display(saved.as_deref()).await;
        if shown.is_err() && saved.is_some() {
            warn!(file = %session.file_name, "Saved location rejected, starting from the beginning");
            shown = session.renderer.display(None).await;
        }

        match shown {
            Ok(()) => session.remember().await,
            Err(e) => {
                error!(file = %session.file_name, "Failed to display book: {}", e);
                session.fail();
            }
        }

        Some(session)
    }

    pub fn location(&self) -> Option<String> {
        self.renderer.location()
    }

    pub fn outcome(&self) -> ViewerOutcome {
        match &self.failure {
            Some(message) => ViewerOutcome::ErrorPanel(message.clone()),
            None => ViewerOutcome::Location(self.renderer.location()),
        }
    }

    /// Turn forward. A failed turn is logged and the reader stays put.
    pub async fn next(&mut self) -> ViewerOutcome {
        if self.failure.is_none() {
            match self.renderer.next().await {
                Ok(()) => self.remember().await,
                Err(e) => warn!(file = %self.file_name, "Could not turn to the next page: {}", e),
            }
        }
        self.outcome()
    }

    pub async fn prev(&mut self) -> ViewerOutcome {
        if self.failure.is_none() {
            match self.renderer.prev().await {
                Ok(()) => self.remember().await,
                Err(e) => warn!(file = %self.file_name, "Could not turn to the previous page: {}", e),
            }
        }
        self.outcome()
    }

    async fn remember(&self) {
        let Some(token) = self.renderer.location() else {
            return;
        };
        if let Err(e) = self
            .positions
            .save(PositionKind::Epub, &self.file_name, Position::Location(token))
            .await
        {
            warn!(file = %self.file_name, "Could not save reading position: {}", e);
        }
    }

    fn fail(&mut self) {
        self.failure =
            Some("Could not load the EPUB file. Check that it is not corrupted.".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guard_discards_superseded_loads() {
        let guard = LoadGuard::new();
        let first = guard.begin();
        assert!(first.is_current());

        let second = guard.begin();
        assert!(!first.is_current());
        assert!(second.is_current());

        assert_eq!(guard.run(async { 7 }).await, Some(7));
    }

    #[tokio::test]
    async fn test_guard_run_superseded_midway() {
        let guard = LoadGuard::new();
        let inner = guard.clone();

        let result = guard
            .run(async move {
                // A newer load starts while this one is pending
                let _newer = inner.begin();
                "stale"
            })
            .await;
        assert_eq!(result, None);
    }
}
