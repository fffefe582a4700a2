

pub mod client;
pub mod helix_store;
pub mod memory;
pub mod store;

pub use client::{HelixClient, HelixClientError};
pub use helix_store::HelixStore;
pub use memory::MemoryStore;
pub use store::{
    document_id, fetch, fetch_many, persist, remove, Collection, Document, DocumentStore, Filter,
    Record, StoreError,
};
