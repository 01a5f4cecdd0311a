//! AI use case inventory consolidation.
//!
//! Reads each agency's published inventory (CSV, spreadsheet or saved HTML),
//! finds the header row, maps columns onto one canonical schema, normalizes
//! the records and writes a single consolidated CSV plus a run log.

pub mod adapters;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod header;
pub mod manifest;
pub mod mapper;
pub mod normalize;
pub mod runlog;
pub mod schema;
pub mod source;

pub use config::Config;
pub use consolidate::{run, ConsolidatedInventory, ConsolidationRun, Consolidator};
pub use manifest::{AgencyEntry, Manifest};
pub use runlog::{FileStatus, RunEntry, RunLog};
pub use schema::{CanonicalField, SCHEMA_VERSION};
