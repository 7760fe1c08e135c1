//! # harlens
//!
//! Analysis engines for HTTP Archive (HAR) captures.
//!
//! ## Features
//!
//! - CDN provider and cache-state classification from response headers
//! - Browser and CDN freshness from Cache-Control, Expires, Age and Date
//! - Mermaid and PlantUML sequence diagrams of the request timeline
//! - HAR import with POST body normalization
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    ┌───────────────┐    ┌──────────────────────┐
//! │  HAR import  │───▶│ HttpExchange  │───▶│ cdn / freshness      │──▶ reports
//! │  (har)       │    └───────────────┘    └──────────────────────┘
//! │              │    ┌───────────────┐    ┌──────────────────────┐
//! │              │───▶│ EntryView     │───▶│ diagram (mermaid,    │──▶ diagram text
//! └──────────────┘    └───────────────┘    │          plantuml)   │
//!                                          └──────────────────────┘
//! ```

pub mod cdn;
pub mod diagram;
pub mod format;
pub mod freshness;
pub mod har;
pub mod headers;
pub mod models;
pub mod report;
pub mod status;

pub use cdn::{analyze_cdn, CdnClassification, CdnProvider};
pub use diagram::{render_diagram, DiagramOptions, DiagramSyntax};
pub use freshness::{calculate_freshness, calculate_freshness_at, FreshnessResult, FreshnessStatus};
pub use har::{import_har_from_path, import_har_from_str, HarEntry, HarError};
pub use models::{EntryView, HttpExchange};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
