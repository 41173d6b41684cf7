//! partnertag-backend: collaborator adapters for the categorization flow.
//!
//! `HttpBackend` talks to the statement service; `LocalBackend` serves a
//! pre-aggregated partner file and keeps the mapping tables on disk.

pub mod catalog;
pub mod http;
pub mod local;
pub mod mapping;
pub mod wire;

pub use catalog::{default_catalog, load_catalog_file};
pub use http::{DEFAULT_BASE_URL, HttpBackend};
pub use local::{LocalBackend, load_partners};
pub use mapping::{EXPENSE_MAPPING_FILE, INCOME_MAPPING_FILE, MappingStore, MappingTables};
pub use wire::PartnerPayload;
