//! Content module - backend documents and rich-text rendering

pub mod portable_text;
mod post;

pub use portable_text::{Block, BodyRenderer};
pub use post::{AssetRef, Author, Comment, ImageRef, Post, PostSummary, Slug, SlugEntry};
