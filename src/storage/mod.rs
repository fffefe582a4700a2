

pub mod blob;
pub mod memory;
pub mod s3;

pub use blob::{key_from_url, BlobError, BlobRef, BlobStore};
pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;
