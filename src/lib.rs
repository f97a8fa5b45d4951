//! Serves resources packaged inside a binary as HTTP-style responses.
//!
//! A host binds URL prefixes to resource catalogs with [`EmbeddedDirectory`]
//! and hands each request to [`EmbeddedConventions::resolve`], which answers
//! with a 200, 304 or 404 [`ResponseDescriptor`] whose body is written lazily.

pub mod catalog;
pub mod compression;
pub mod config;
pub mod convention;
pub mod error;
pub mod fingerprint;
pub mod logging;
pub mod path_utils;
pub mod response;
pub mod views;

pub use catalog::{DirectoryCatalog, ResourceCatalog, ResourceStream, StaticCatalog};
pub use config::ServeOptions;
pub use convention::{EmbeddedConventions, EmbeddedDirectory};
pub use error::{EmbedError, Result};
pub use fingerprint::{CacheDecision, Fingerprint};
pub use response::{HeaderMap, RequestDescriptor, ResponseDescriptor, Status};
pub use views::{
    DefaultResourceReader, EmbeddedViewLocationProvider, ModuleProvider, ResourceReader,
    ViewLocationConfig, ViewLocationResult,
};
