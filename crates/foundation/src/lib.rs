pub mod arena;
pub mod bounds;
pub mod coord;
pub mod handles;
pub mod math;

// Foundation crate: small, well-tested primitives only.
pub use arena::*;
pub use bounds::*;
pub use coord::*;
pub use handles::*;
