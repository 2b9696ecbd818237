pub mod clock;
pub mod error;
pub mod ids;
pub mod principal;
pub mod proposal;

pub use clock::{Clock, Timestamp};
pub use error::CoreError;
pub use ids::*;
pub use principal::{Principal, Role};
pub use proposal::*;
