mod store;

pub use store::{InMemoryStore, InMemoryStoreError};
