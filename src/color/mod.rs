//! Color space conversion, naming and statistics
//!
//! This module handles sRGB, linear RGB, CIELAB and HSL conversions, maps
//! Lab values to human-readable names and computes hue, lightness and
//! saturation statistics over analyzed photos.

pub mod conversion;
pub mod naming;
pub mod statistics;

pub use conversion::{delta_e, lab_to_rgb, rgb_to_lab};
pub use naming::{are_names_similar, color_name};
pub use statistics::{ClusterColorStatistics, GlobalColorStatistics};
