pub mod canny;
pub mod chain;
pub mod contours;
pub mod draw;
pub mod gradient;
pub mod kernel;
pub mod lines;
pub mod morphology;
pub mod traits;

pub use chain::{BlurVariant, EdgeChain, EdgeMap, BLUR_VARIANTS};
pub use traits::EdgeFilter;
