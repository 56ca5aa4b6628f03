//! Per-collection REST client.
//!
//! [`ResourceClient`] turns the list/get/create/update/delete contract of a
//! collection into typed calls over a [`Transport`]. Responses pass through
//! [`normalize`] so callers only ever see a [`Page`] or an entity.

pub mod normalize;

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::entity::{Entity, RecordId};
use crate::error::{BackofficeError, Result};
use crate::http::{ApiRequest, FilePart, METHOD_OVERRIDE_PARAM, Transport};
use crate::schema::Collection;

pub use normalize::{normalize_entity, normalize_page};

/// Parameters of a list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub page: u32,
    pub per_page: u32,
    pub search: Option<String>,
}

impl ListParams {
    pub fn new(page: u32, per_page: u32) -> Result<Self> {
        let params = Self {
            page,
            per_page,
            search: None,
        };
        params.validate()?;
        Ok(params)
    }

    /// Attach a search term. Blank terms are dropped.
    pub fn with_search(mut self, search: &str) -> Self {
        let search = search.trim();
        self.search = (!search.is_empty()).then(|| search.to_string());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.page < 1 {
            return Err(BackofficeError::InvalidParams(
                "page must be at least 1".to_string(),
            ));
        }
        if self.per_page == 0 {
            return Err(BackofficeError::InvalidParams(
                "per_page must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// One page of a collection.
///
/// Invariants: `1 <= current_page <= last_page` and `items.len() <= per_page`
/// for every page built from a server response.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u32,
}

impl<T> Page<T> {
    pub fn empty(per_page: u32) -> Self {
        Self {
            items: Vec::new(),
            current_page: 1,
            last_page: 1,
            per_page: per_page.max(1),
            total: 0,
        }
    }

    /// `max(1, ceil(total / per_page))`
    pub fn last_page_for(total: u32, per_page: u32) -> u32 {
        if per_page == 0 {
            return 1;
        }
        total.div_ceil(per_page).max(1)
    }

    /// Slice a full, unpaginated collection into the requested page.
    pub fn paginate_locally(all: Vec<T>, page: u32, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        let total = all.len() as u32;
        let last_page = Self::last_page_for(total, per_page);
        let current_page = page.clamp(1, last_page);
        let start = ((current_page - 1) * per_page) as usize;
        let items = all
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect();
        Self {
            items,
            current_page,
            last_page,
            per_page,
            total,
        }
    }

    pub fn try_map<U>(self, f: impl FnMut(T) -> Result<U>) -> Result<Page<U>> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<Vec<U>>>()?,
            current_page: self.current_page,
            last_page: self.last_page,
            per_page: self.per_page,
            total: self.total,
        })
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }
}

/// Fields and uploads of a create/update request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    pub fields: Map<String, Value>,
    pub files: Vec<FilePart>,
}

impl Payload {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            files: Vec::new(),
        }
    }

    pub fn with_files(mut self, files: Vec<FilePart>) -> Self {
        self.files = files;
        self
    }

    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }
}

/// Typed client for one collection.
pub struct ResourceClient<T> {
    transport: Arc<dyn Transport>,
    collection: &'static Collection,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            collection: self.collection,
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> ResourceClient<T> {
    pub fn new(transport: Arc<dyn Transport>, collection: &'static Collection) -> Self {
        Self {
            transport,
            collection,
            _entity: PhantomData,
        }
    }

    pub fn collection(&self) -> &'static Collection {
        self.collection
    }

    fn item_path(&self, id: &RecordId) -> Result<String> {
        if id.is_local() {
            return Err(BackofficeError::InvalidInput(format!(
                "'{id}' is a local placeholder id and does not exist on the server"
            )));
        }
        Ok(format!("{}/{}", self.collection.path, id))
    }

    pub async fn list(&self, params: &ListParams) -> Result<Page<T>> {
        params.validate()?;
        let mut request = ApiRequest::get(self.collection.path)
            .query("page", params.page)
            .query("per_page", params.per_page);
        if let Some(search) = &params.search {
            request = request.query("search", search);
        }

        let body = self.transport.send(request).await?;
        let page = normalize_page(&body, params)?;
        tracing::debug!(
            collection = self.collection.name,
            page = page.current_page,
            last_page = page.last_page,
            items = page.items.len(),
            "listed records"
        );
        page.try_map(T::from_json)
    }

    pub async fn get(&self, id: &RecordId) -> Result<T> {
        let body = self
            .transport
            .send(ApiRequest::get(self.item_path(id)?))
            .await?;
        T::from_json(normalize_entity(&body, self.collection.entity_key)?)
    }

    pub async fn create(&self, payload: &Payload) -> Result<T> {
        let request = ApiRequest::post(self.collection.path);
        let request = if payload.has_files() {
            request.multipart(payload.fields.clone(), payload.files.clone())
        } else {
            request.json(Value::Object(payload.fields.clone()))
        };

        let body = self.transport.send(request).await?;
        T::from_json(normalize_entity(&body, self.collection.entity_key)?)
    }

    /// Update a record. Multipart updates go out as
    /// `POST {path}/{id}?_method=PUT`, JSON updates as `PUT`.
    pub async fn update(&self, id: &RecordId, payload: &Payload) -> Result<T> {
        let path = self.item_path(id)?;
        let request = if payload.has_files() {
            ApiRequest::post(path)
                .query(METHOD_OVERRIDE_PARAM, "PUT")
                .multipart(payload.fields.clone(), payload.files.clone())
        } else {
            ApiRequest::put(path).json(Value::Object(payload.fields.clone()))
        };

        let body = self.transport.send(request).await?;
        T::from_json(normalize_entity(&body, self.collection.entity_key)?)
    }

    pub async fn delete(&self, id: &RecordId) -> Result<()> {
        self.transport
            .send(ApiRequest::delete(self.item_path(id)?))
            .await?;
        Ok(())
    }
}
