pub mod app;
pub mod config;
pub mod session;

pub use app::*;
pub use config::*;
pub use session::*;
