pub mod cluster;
pub mod hints;
pub mod locate;
pub mod rank;

pub use cluster::*;
pub use hints::*;
pub use locate::*;
pub use rank::*;
