pub mod document;
pub mod members;
pub mod topology;

pub use document::*;
pub use members::*;
pub use topology::*;
