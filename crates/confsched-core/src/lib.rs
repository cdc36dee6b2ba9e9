pub mod changes;
pub mod session;

pub use changes::{diff_snapshots, Changes};
pub use session::Session;
