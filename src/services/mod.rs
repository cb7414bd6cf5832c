// Service exports
pub mod credentials;
pub mod memory;
pub mod postgres;
pub mod registry;
pub mod store;
pub mod upload;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use registry::{BroadcastReport, ConnectionId, ConnectionRegistry, ConnectionState};
pub use store::{RatingStore, StoreError};
pub use upload::{UploadClient, UploadError};
