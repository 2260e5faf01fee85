//! In-memory store for tests and embedded use

mod store;

pub use store::InMemoryStore;
