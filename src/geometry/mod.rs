//! Widget-space to texture-space geometry for the scan window.

mod fit;
mod mapper;
mod types;

pub use fit::{apply_fit, FitMode, FitTransform, FittedSizes};
pub use mapper::compute_texture_relative_window;
pub use types::{Offset, Rect, Size};
