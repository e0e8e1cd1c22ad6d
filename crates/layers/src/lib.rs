pub mod colormap;
pub mod labels;
pub mod layer;
pub mod overlay;
pub mod symbology;
pub mod temperature;

pub use layer::*;
