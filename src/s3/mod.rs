pub mod backend;
pub mod client;
pub mod memory;
pub mod metrics;

pub use backend::{BucketInfo, ObjectMetadata, StorageBackend};
pub use client::S3Client;
pub use memory::MemoryBackend;
pub use metrics::ListingMetrics;
