//! Message ingestion: pull, decode, enrich, settle

pub mod subscriber;
pub mod updater;

pub use subscriber::{IngestError, Ingestor, PoolConfig, DEFAULT_BACKLOG, DEFAULT_WORKER_COUNT};
pub use updater::{merge_volume, secure_image_url, RecordUpdater, UpdateError, UpdateOutcome};
