//! Helper functions for rendering
//!
//! HTML escaping for text placed into templates, and resolution of image
//! asset references to CDN URLs.

mod html;
mod image;

pub use html::*;
pub use image::ImageResolver;
