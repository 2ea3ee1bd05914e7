//! Data layer module
//!
//! Handles all data persistence:
//! - MongoDB document store
//! - In-memory store for development and tests

mod memory;
mod models;
mod mongo;
mod store;

pub use memory::MemoryStore;
pub use models::*;
pub use mongo::MongoStore;
pub use store::Store;

#[cfg(test)]
mod mongo_test;
