pub mod context;
pub mod grid;
pub mod selection;

pub use context::*;
pub use grid::*;
pub use selection::*;
