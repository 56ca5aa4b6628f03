//! Paginated, searchable list of one collection.
//!
//! [`ListState`] is the pure state machine (`Idle -> Loading -> Loaded |
//! Errored`); [`ListController`] drives it with real fetches, debounced
//! search and optimistic mutations.
//!
//! Every fetch is stamped with a generation number when it is issued. A
//! response is applied only if its generation is still the latest one, so
//! the most recently issued request wins regardless of completion order.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::debounce::Debouncer;
use crate::entity::{Entity, RecordId};
use crate::error::{BackofficeError, ErrorKind, Result};
use crate::notify::{Notifier, Toast};
use crate::optimistic::{Mutation, Outcome, apply, reconcile};
use crate::resource::{ListParams, Page, ResourceClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Errored,
}

/// What the list is showing (or about to show).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub per_page: u32,
    pub search: String,
}

impl ListQuery {
    pub fn new(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page,
            search: String::new(),
        }
    }

    pub fn params(&self) -> Result<ListParams> {
        Ok(ListParams::new(self.page, self.per_page)?.with_search(&self.search))
    }
}

#[derive(Debug, Clone)]
pub struct ListState<T> {
    pub status: ListStatus,
    /// Query of the latest issued fetch
    pub query: ListQuery,
    /// Search box contents, ahead of `query.search` while debouncing
    pub search_input: String,
    /// Last successfully loaded page, kept while a later fetch fails
    pub page: Option<Page<T>>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    generation: u64,
}

impl<T: Entity> ListState<T> {
    pub fn new(per_page: u32) -> Self {
        Self {
            status: ListStatus::Idle,
            query: ListQuery::new(per_page),
            search_input: String::new(),
            page: None,
            error: None,
            error_kind: None,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn items(&self) -> &[T] {
        self.page.as_ref().map(|p| p.items.as_slice()).unwrap_or(&[])
    }

    pub fn find(&self, id: &RecordId) -> Option<&T> {
        self.items().iter().find(|item| item.id() == id)
    }

    /// Record that a fetch for `query` was issued and return its generation.
    pub fn begin_fetch(&mut self, query: ListQuery) -> u64 {
        self.generation += 1;
        self.query = query;
        self.status = ListStatus::Loading;
        self.generation
    }

    /// Apply a successful fetch. Returns false if a newer fetch was issued
    /// in the meantime and the page was discarded.
    pub fn complete_ok(&mut self, generation: u64, page: Page<T>) -> bool {
        if generation != self.generation {
            tracing::debug!(
                generation,
                latest = self.generation,
                "discarding stale list response"
            );
            return false;
        }
        self.query.page = page.current_page;
        self.query.per_page = page.per_page;
        self.page = Some(page);
        self.status = ListStatus::Loaded;
        self.error = None;
        self.error_kind = None;
        true
    }

    /// Apply the result of the fetch stamped `generation`.
    pub fn complete(&mut self, generation: u64, result: &Result<Page<T>>) -> bool {
        match result {
            Ok(page) => self.complete_ok(generation, page.clone()),
            Err(e) => self.complete_err(generation, e),
        }
    }

    /// Apply a failed fetch, keeping the last good page. Returns false for
    /// stale failures.
    pub fn complete_err(&mut self, generation: u64, error: &BackofficeError) -> bool {
        if generation != self.generation {
            tracing::debug!(generation, "discarding stale list failure: {error}");
            return false;
        }
        self.status = ListStatus::Errored;
        self.error = Some(error.to_string());
        self.error_kind = Some(error.kind());
        true
    }

    /// Check a requested page against what is known about the collection.
    ///
    /// Before the first successful load nothing is known and any page >= 1
    /// is allowed; the response clamps it.
    pub fn check_page(&self, page: u32) -> Result<()> {
        if page == 0 {
            return Err(BackofficeError::InvalidParams(
                "page must be at least 1".to_string(),
            ));
        }
        if let Some(loaded) = &self.page
            && page > loaded.last_page
        {
            return Err(BackofficeError::PageOutOfRange {
                requested: page,
                last_page: loaded.last_page,
            });
        }
        Ok(())
    }

    /// Apply an optimistic mutation to the visible items.
    ///
    /// With no page loaded there is nothing on screen to update.
    pub fn apply_mutation(&mut self, mutation: &Mutation<T>) {
        if let Some(page) = self.page.as_mut() {
            page.items = apply(&page.items, mutation);
        }
    }

    pub fn settle_mutation(&mut self, mutation: &Mutation<T>, outcome: &Outcome<T>) {
        if let Some(page) = self.page.as_mut() {
            page.items = reconcile(&page.items, mutation, outcome);
        }
    }
}

/// Construction options for a [`ListController`].
#[derive(Debug, Clone)]
pub struct ListOptions {
    pub per_page: u32,
    pub search_debounce: Duration,
    pub notifier: Notifier,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            per_page: 10,
            search_debounce: crate::debounce::DEFAULT_SEARCH_DEBOUNCE,
            notifier: Notifier::new(),
        }
    }
}

struct Inner<T: Entity> {
    client: ResourceClient<T>,
    state: Mutex<ListState<T>>,
    debouncer: Debouncer,
    revision: watch::Sender<u64>,
    notifier: Notifier,
}

/// Handle to a list. Clones share the same state.
pub struct ListController<T: Entity> {
    inner: Arc<Inner<T>>,
}

impl<T: Entity> Clone for ListController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Entity> ListController<T> {
    pub fn new(client: ResourceClient<T>, options: ListOptions) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                client,
                state: Mutex::new(ListState::new(options.per_page.max(1))),
                debouncer: Debouncer::new(options.search_debounce),
                revision,
                notifier: options.notifier,
            }),
        }
    }

    pub fn client(&self) -> &ResourceClient<T> {
        &self.inner.client
    }

    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// A copy of the current state, for rendering.
    pub fn snapshot(&self) -> ListState<T> {
        self.inner.state.lock().clone()
    }

    pub fn status(&self) -> ListStatus {
        self.inner.state.lock().status
    }

    pub fn find(&self, id: &RecordId) -> Option<T> {
        self.inner.state.lock().find(id).cloned()
    }

    /// Revision counter bumped on every state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    fn bump(&self) {
        self.inner.revision.send_modify(|rev| *rev += 1);
    }

    async fn fetch(&self, query: ListQuery) -> Result<()> {
        let params = query.params()?;
        let generation = self.inner.state.lock().begin_fetch(query);
        self.bump();

        let result = self.inner.client.list(&params).await;

        let outcome = match result {
            Ok(page) => {
                self.inner.state.lock().complete_ok(generation, page);
                Ok(())
            }
            Err(e) => {
                self.inner.state.lock().complete_err(generation, &e);
                Err(e)
            }
        };
        self.bump();
        outcome
    }

    /// Initial load of the first page.
    pub async fn load(&self) -> Result<()> {
        let query = {
            let state = self.inner.state.lock();
            ListQuery {
                page: 1,
                ..state.query.clone()
            }
        };
        self.fetch(query).await
    }

    /// Re-fetch the current query.
    pub async fn refresh(&self) -> Result<()> {
        let query = self.inner.state.lock().query.clone();
        self.fetch(query).await
    }

    /// Re-issue the last request, typically after it failed.
    pub async fn retry(&self) -> Result<()> {
        self.refresh().await
    }

    /// Go to `page`. Pages past the last known page are rejected without
    /// a request.
    pub async fn set_page(&self, page: u32) -> Result<()> {
        let query = {
            let state = self.inner.state.lock();
            state.check_page(page)?;
            ListQuery {
                page,
                ..state.query.clone()
            }
        };
        self.fetch(query).await
    }

    /// Change the page size and go back to the first page.
    pub async fn set_per_page(&self, per_page: u32) -> Result<()> {
        if per_page == 0 {
            return Err(BackofficeError::InvalidParams(
                "per_page must be greater than 0".to_string(),
            ));
        }
        let query = {
            let state = self.inner.state.lock();
            ListQuery {
                page: 1,
                per_page,
                search: state.query.search.clone(),
            }
        };
        self.fetch(query).await
    }

    /// Update the search box. The fetch for page 1 is issued once input has
    /// been quiet for the debounce window.
    pub fn set_search(&self, text: &str) {
        self.inner.state.lock().search_input = text.to_string();
        self.bump();

        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        self.inner.debouncer.call(async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let controller = ListController { inner };
            let query = {
                let state = controller.inner.state.lock();
                let search = state.search_input.trim().to_string();
                if search == state.query.search && state.status == ListStatus::Loaded {
                    return;
                }
                ListQuery {
                    page: 1,
                    per_page: state.query.per_page,
                    search,
                }
            };
            if let Err(e) = controller.fetch(query).await {
                tracing::debug!("search fetch failed: {e}");
            }
        });
    }

    /// Search right away, dropping any search still waiting out its window.
    pub async fn search_now(&self, text: &str) -> Result<()> {
        self.inner.debouncer.cancel();
        let query = {
            let mut state = self.inner.state.lock();
            state.search_input = text.to_string();
            ListQuery {
                page: 1,
                per_page: state.query.per_page,
                search: text.trim().to_string(),
            }
        };
        self.fetch(query).await
    }

    /// Fetch an explicit query, e.g. one restored from a previous session.
    pub async fn load_query(&self, query: ListQuery) -> Result<()> {
        self.inner.state.lock().check_page(query.page)?;
        self.inner.debouncer.cancel();
        self.inner.state.lock().search_input = query.search.clone();
        self.fetch(query).await
    }

    /// Whether a search is still waiting out its debounce window.
    pub fn search_pending(&self) -> bool {
        self.inner.debouncer.is_pending()
    }

    pub fn begin_mutation(&self, mutation: &Mutation<T>) {
        self.inner.state.lock().apply_mutation(mutation);
        self.bump();
    }

    pub fn settle_mutation(&self, mutation: &Mutation<T>, outcome: &Outcome<T>) {
        self.inner.state.lock().settle_mutation(mutation, outcome);
        self.bump();
    }

    /// Refresh after a successful mutation. The mutation already succeeded,
    /// so a failing refresh is only logged; the list shows its error state.
    pub(crate) async fn refresh_after_mutation(&self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!("refresh after mutation failed: {e}");
        }
    }

    /// Delete a record, removing it from the list immediately and putting it
    /// back at its original position if the server refuses.
    pub async fn delete(&self, id: &RecordId) -> Result<()> {
        let mutation = {
            let state = self.inner.state.lock();
            Mutation::delete_of(state.items(), id)
        };
        if let Some(m) = &mutation {
            self.begin_mutation(m);
        }

        match self.inner.client.delete(id).await {
            Ok(()) => {
                if let Some(m) = &mutation {
                    self.settle_mutation(m, &Outcome::Success(None));
                }
                self.inner.notifier.notify(Toast::success(format!(
                    "Deleted {} {}",
                    self.inner.client.collection().entity_key,
                    id
                )));
                self.refresh_after_mutation().await;
                Ok(())
            }
            Err(e) => {
                if let Some(m) = &mutation {
                    self.settle_mutation(m, &Outcome::Failure);
                }
                tracing::debug!(%id, "delete rolled back: {e}");
                if e.kind() != ErrorKind::Auth {
                    self.inner.notifier.notify(Toast::error(e.to_string()));
                }
                Err(e)
            }
        }
    }
}
