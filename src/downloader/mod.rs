// Downloader module - format selection, acquisition, merge, packaging and
// delivery of online videos

pub mod acquisition;
pub mod backends;
pub mod cleanup;
pub mod config;
pub mod errors;
pub mod extractors;
pub mod format_selector;
pub mod merge;
pub mod models;
pub mod orchestrator;
pub mod packaging;
pub mod tools;
pub mod traits;
pub mod utils;

#[cfg(test)]
mod testing;

pub use config::{PipelineConfig, ToolConfig};
pub use errors::{NotificationCategory, PipelineError, ServiceError};
pub use format_selector::FormatSelector;
pub use models::{Catalog, DeliveryReport, DownloadRequest, FormatDescriptor, SelectionResult};
pub use orchestrator::{Pipeline, Services};
pub use traits::{ArchiveService, DeliveryService, DownloadService, MetadataService, RemuxService};
