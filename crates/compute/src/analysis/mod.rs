pub mod simplify;
pub mod spatial;
pub mod statistics;

pub use simplify::*;
pub use spatial::*;
pub use statistics::*;
