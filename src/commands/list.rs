//! List site content

use anyhow::Result;

use crate::Blog;

/// Print every post known to the backend
pub async fn run(blog: &Blog) -> Result<()> {
    let posts = blog.source.list_posts().await?;

    println!("Posts ({}):", posts.len());
    for post in posts {
        let author = post.author_name();
        if author.is_empty() {
            println!("  {} - {}", post.slug.current, post.title);
        } else {
            println!("  {} - {} [{}]", post.slug.current, post.title, author);
        }
    }

    Ok(())
}
