pub mod anchors;
pub mod company;
pub mod error;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod wells;

pub use error::StorageError;
pub use sqlite::{ApprovalTx, SqliteStorage};
pub use traits::*;
