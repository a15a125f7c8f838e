//! Generate static files

use anyhow::Result;
use std::sync::Arc;

use crate::generator::{Generator, PageRenderer};
use crate::Blog;

/// Export the list page and every post page into the public directory
pub async fn run(blog: &Blog) -> Result<usize> {
    let start = std::time::Instant::now();

    let renderer = Arc::new(PageRenderer::new(&blog.config)?);
    let generator = Generator::new(Arc::clone(&blog.source), renderer, &blog.config);
    let written = generator.generate(&blog.public_dir).await?;

    tracing::info!(
        "Generated {} post pages into {:?} in {:?}",
        written,
        blog.public_dir,
        start.elapsed()
    );

    Ok(written)
}
