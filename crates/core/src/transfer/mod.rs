//! Transfer stage: put a transformed asset into durable object storage.

mod error;
mod service;
mod store;
mod types;

pub use error::TransferError;
pub use service::TransferService;
pub use store::ObjectStore;
pub use types::UploadLocator;
