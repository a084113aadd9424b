#[macro_use]
extern crate log;

pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod query;
pub mod server;
pub mod store;
pub mod upload;

pub use backend::{Backend, DemoBackend, Latency, RemoteBackend, RemoteOptions};
pub use catalog::{CatalogClient, Submission};
pub use error::{Error, ErrorKind, Result};
pub use model::{Actor, Category, Difficulty, Worksheet, WorksheetDraft, WorksheetPatch};
pub use query::{CatalogStats, Filter, SortField, SortSpec};
pub use upload::{FilePayload, UploadedFile};
