pub mod buildings;
pub mod layer;
pub mod markers;
pub mod pins;
pub mod popup;
pub mod symbology;
pub mod viewport;

pub use buildings::*;
pub use layer::*;
pub use markers::*;
pub use pins::*;
pub use popup::*;
pub use viewport::*;
