//! eviction_export
//!
//! Content-addressed export cache and chart engine for Eviction Lab report downloads.
//! Pairs with the `eviction-export` CLI.
//!
//! ### Features
//! - Deterministic storage keys derived from the request; stored files are never rebuilt
//! - Multi-format zip bundles that reuse already stored per-format files
//! - Bar and line comparison charts with confidence bands, as SVG or PNG
//! - Map legends whose bubble sizes match the live map at the screenshot's zoom
//! - Translated, formatted per-feature text with reliability flags
//!
//! ### Example
//! ```no_run
//! use eviction_export::{ExportCache, ExportConfig, ExportFormat, ExportRequest};
//!
//! let cache = ExportCache::from_config(ExportConfig::default())?;
//! let request: ExportRequest = serde_json::from_str(&std::fs::read_to_string("request.json")?)?;
//! let url = cache.get_or_create(&request, ExportFormat::Csv)?;
//! println!("{url}");
//! let bundle = cache.get_or_create_bundle(&request)?;
//! println!("{bundle}");
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod archive;
pub mod cache;
pub mod config;
pub mod error;
pub mod expr;
pub mod flags;
pub mod format;
pub mod models;
pub mod producer;
pub mod report;
pub mod scale;
pub mod screenshot;
pub mod sibling;
pub mod storage;
pub mod tables;
pub mod translate;
pub mod viz;

pub use cache::{ExportArtifact, ExportCache, derive_bundle_key, derive_key};
pub use config::ExportConfig;
pub use error::{ExportError, Result};
pub use flags::Flag;
pub use models::{BBox, ExportRequest, Feature, LayerKind, YearRange};
pub use producer::{ExportFormat, Producer, ProducerSet};
pub use report::{RenderedFeature, ReportContext};
pub use storage::{MemoryStore, ObjectStore};
