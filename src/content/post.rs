//! Post, author and comment documents as returned by the backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::portable_text::{deserialize_body, Block};

/// URL-safe post identifier (`slug { current }`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slug {
    #[serde(default)]
    pub current: String,
}

impl Slug {
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: current.into(),
        }
    }
}

/// Reference to an image asset, resolved to a URL by [`crate::helpers::ImageResolver`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    #[serde(default)]
    pub asset: Option<AssetRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    #[serde(rename = "_ref")]
    pub reference: String,
}

impl ImageRef {
    /// Build an image reference from an asset id such as `image-abc-10x10-png`
    pub fn from_asset(reference: impl Into<String>) -> Self {
        Self {
            asset: Some(AssetRef {
                reference: reference.into(),
            }),
            alt: None,
        }
    }

    /// The raw asset id, if any
    pub fn asset_ref(&self) -> Option<&str> {
        self.asset.as_ref().map(|a| a.reference.as_str())
    }
}

/// Post author, dereferenced from the post's `author` reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<ImageRef>,
}

/// An approved comment attached to a post.
///
/// The commenter's email is never part of the detail projection, so it has
/// no field here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub approved: bool,
}

/// List projection of a post (home page cards)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "mainImage", default)]
    pub main_image: Option<ImageRef>,
    #[serde(default)]
    pub slug: Slug,
}

/// Result row of the slug enumeration query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlugEntry {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub slug: Slug,
}

/// A full post as shown on its detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,

    /// Creation timestamp
    #[serde(rename = "_createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub author: Option<Author>,

    /// Approved comments, filtered by the backend
    #[serde(default)]
    pub comments: Vec<Comment>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(rename = "mainImage", default)]
    pub main_image: Option<ImageRef>,

    #[serde(default)]
    pub slug: Slug,

    /// Rich-text body
    #[serde(default, deserialize_with = "deserialize_body")]
    pub body: Vec<Block>,
}

impl Post {
    /// Comments safe to display.
    pub fn approved_comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter(|c| c.approved)
    }

    pub fn author_name(&self) -> &str {
        self.author.as_ref().map(|a| a.name.as_str()).unwrap_or("")
    }
}

impl PostSummary {
    pub fn author_name(&self) -> &str {
        self.author.as_ref().map(|a| a.name.as_str()).unwrap_or("")
    }
}
