pub mod macros;

pub mod auth;
pub mod autofill;
pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod debounce;
pub mod display;
pub mod entity;
pub mod error;
pub mod form;
pub mod http;
pub mod list;
pub mod notify;
pub mod optimistic;
pub mod resource;
pub mod schema;
pub mod stock;
pub mod validation;

pub use auth::{AuthSession, FileTokenStore, MemoryTokenStore, SessionEvent, SignOutReason, TokenStore};
pub use autofill::{AddressAutofill, AddressFragment, PublicAutofill};
pub use backend::InMemoryBackend;
pub use config::Config;
pub use entity::{Entity, Record, RecordId};
pub use error::{BackofficeError, ErrorKind, Result};
pub use form::{Draft, DrawerFormController, FormMode};
pub use http::{ApiRequest, FilePart, HttpClient, RequestBody, Transport};
pub use list::{ListController, ListOptions, ListQuery, ListState, ListStatus};
pub use notify::{Notifier, Toast, ToastLevel};
pub use optimistic::{Mutation, Outcome};
pub use resource::{ListParams, Page, Payload, ResourceClient};
pub use schema::{COLLECTIONS, Collection, FieldKind, FieldSpec};
pub use stock::{Movement, StockAdjustment, StockClient, StockEntry, StockLedger};
pub use validation::ValidationErrors;
