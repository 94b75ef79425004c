//! Persistence stage: record the uploaded image on the user's document.

mod error;
mod memory;
mod service;
mod store;
mod types;

pub use error::{DocumentStoreError, PersistenceError};
pub use memory::InMemoryDocumentStore;
pub use service::{IMAGE_FIELD, ProfileService};
pub use store::DocumentStore;
pub use types::{Ack, UserImageRecord};
