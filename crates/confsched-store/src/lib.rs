pub mod database;
pub mod error;
pub mod row_helpers;
pub mod schema;
pub mod seed;
pub mod sessions;
pub mod store;

pub use database::Database;
pub use error::StoreError;
pub use store::{SessionStore, SessionWatch};
