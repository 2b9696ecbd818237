pub mod portal;
pub mod shared;

pub use portal::{TestPortal, anchor, well};
pub use shared::SharedStore;
