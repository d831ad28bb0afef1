//! Data models

pub mod message;
pub mod payload;
pub mod timeline;

pub use message::*;
pub use payload::*;
pub use timeline::*;
