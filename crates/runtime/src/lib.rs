pub mod event_bus;
pub mod geolocation;

pub use event_bus::*;
pub use geolocation::*;
