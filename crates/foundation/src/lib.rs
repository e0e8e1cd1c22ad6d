pub mod bounds;
pub mod geometry;
pub mod math;
pub mod time;
pub mod viewport;
pub mod wrap;

// Foundation crate: small, well-tested primitives only.
pub use bounds::*;
pub use geometry::*;
pub use time::*;
pub use viewport::*;
pub use wrap::*;
