// Metadata extraction - turns a link into a catalog of formats

mod cli;

pub use cli::YtDlpMetadata;
