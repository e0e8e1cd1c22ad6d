pub mod config;
pub mod controller;
pub mod tool;

pub use config::*;
pub use controller::*;
pub use tool::*;
