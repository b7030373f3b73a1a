pub mod downloader;

pub use downloader::{
    Catalog, DeliveryReport, DownloadRequest, FormatDescriptor, FormatSelector,
    NotificationCategory, Pipeline, PipelineConfig, PipelineError, SelectionResult, ServiceError,
    Services, ToolConfig,
};
