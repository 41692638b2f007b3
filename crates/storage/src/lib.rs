#![forbid(unsafe_code)]

pub mod notion;
pub mod repository;

pub use notion::{NotionConfig, NotionStore};
pub use repository::{
    CardStore, HealthReport, InMemoryStore, SessionStore, StorageError, StoreHealth, Stores,
};
