//! Portable-text body rendering
//!
//! Post bodies arrive as an array of typed blocks. Each block variant has its
//! own renderer; blocks and inline children of a type we do not know render
//! as nothing so that new content types in the backend never break a page.

use serde::{Deserialize, Deserializer, Serialize};

use super::post::ImageRef;
use crate::helpers::{html_escape, ImageResolver};

/// A top-level body block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum Block {
    /// Paragraphs, headings, quotes and list items
    #[serde(rename = "block")]
    Text(TextBlock),
    #[serde(rename = "image")]
    Image(ImageBlock),
    #[serde(rename = "code")]
    Code(CodeBlock),
    #[serde(rename = "embed")]
    Embed(EmbedBlock),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub style: Option<String>,
    #[serde(rename = "listItem", default)]
    pub list_item: Option<String>,
    #[serde(default)]
    pub children: Vec<Inline>,
    #[serde(rename = "markDefs", default)]
    pub mark_defs: Vec<MarkDef>,
}

/// Inline child of a text block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum Inline {
    #[serde(rename = "span")]
    Span(Span),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Span {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub marks: Vec<String>,
}

/// Annotation referenced from a span's marks by key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkDef {
    #[serde(rename = "_key", default)]
    pub key: String,
    #[serde(rename = "_type", default)]
    pub kind: String,
    #[serde(default)]
    pub href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(flatten)]
    pub image: ImageRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedBlock {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Deserialize a body block by block.
///
/// A block that does not match its variant's shape becomes [`Block::Unknown`]
/// instead of failing the whole document. A `null` body is empty.
pub fn deserialize_body<'de, D>(deserializer: D) -> Result<Vec<Block>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|value| {
            serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!("Skipping malformed body block: {}", e);
                Block::Unknown
            })
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Number,
}

impl ListKind {
    fn open_tag(self) -> &'static str {
        match self {
            ListKind::Bullet => "<ul>",
            ListKind::Number => "<ol>",
        }
    }

    fn close_tag(self) -> &'static str {
        match self {
            ListKind::Bullet => "</ul>",
            ListKind::Number => "</ol>",
        }
    }
}

impl TextBlock {
    fn list_kind(&self) -> Option<ListKind> {
        match self.list_item.as_deref() {
            Some("number") => Some(ListKind::Number),
            Some(_) => Some(ListKind::Bullet),
            None => None,
        }
    }

    fn tag(&self) -> &'static str {
        if self.list_item.is_some() {
            return "li";
        }
        match self.style.as_deref() {
            Some("h1") => "h1",
            Some("h2") => "h2",
            Some("h3") => "h3",
            Some("h4") => "h4",
            Some("h5") => "h5",
            Some("h6") => "h6",
            Some("blockquote") => "blockquote",
            _ => "p",
        }
    }
}

/// Renders portable-text blocks to HTML
#[derive(Debug, Clone)]
pub struct BodyRenderer {
    images: ImageResolver,
}

impl BodyRenderer {
    pub fn new(images: ImageResolver) -> Self {
        Self { images }
    }

    /// Render a body to HTML
    pub fn render(&self, blocks: &[Block]) -> String {
        let mut html = String::new();
        let mut open_list: Option<ListKind> = None;

        for block in blocks {
            // Consecutive list items share one list element
            let list = match block {
                Block::Text(text) => text.list_kind(),
                _ => None,
            };
            if open_list != list {
                if let Some(kind) = open_list {
                    html.push_str(kind.close_tag());
                }
                if let Some(kind) = list {
                    html.push_str(kind.open_tag());
                }
                open_list = list;
            }

            match block {
                Block::Text(text) => self.render_text(&mut html, text),
                Block::Image(image) => self.render_image(&mut html, image),
                Block::Code(code) => render_code(&mut html, code),
                Block::Embed(embed) => render_embed(&mut html, embed),
                Block::Unknown => {}
            }
        }

        if let Some(kind) = open_list {
            html.push_str(kind.close_tag());
        }

        html
    }

    fn render_text(&self, html: &mut String, block: &TextBlock) {
        let tag = block.tag();
        html.push('<');
        html.push_str(tag);
        html.push('>');
        for child in &block.children {
            if let Inline::Span(span) = child {
                html.push_str(&render_span(span, &block.mark_defs));
            }
        }
        html.push_str("</");
        html.push_str(tag);
        html.push('>');
    }

    fn render_image(&self, html: &mut String, block: &ImageBlock) {
        let Some(src) = self.images.url_for(&block.image) else {
            return;
        };
        let alt = block.image.alt.as_deref().unwrap_or("");
        html.push_str(&format!(
            r#"<figure><img src="{}" alt="{}"></figure>"#,
            html_escape(&src),
            html_escape(alt)
        ));
    }
}

fn render_code(html: &mut String, block: &CodeBlock) {
    match block.language.as_deref() {
        Some(lang) if !lang.is_empty() => html.push_str(&format!(
            r#"<pre><code class="language-{}">{}</code></pre>"#,
            html_escape(lang),
            html_escape(&block.code)
        )),
        _ => html.push_str(&format!(
            "<pre><code>{}</code></pre>",
            html_escape(&block.code)
        )),
    }
}

fn render_embed(html: &mut String, block: &EmbedBlock) {
    if !is_safe_href(&block.url) || block.url.starts_with('/') || block.url.starts_with('#') {
        return;
    }
    let title = block.title.as_deref().unwrap_or("");
    html.push_str(&format!(
        r#"<figure class="embed"><iframe src="{}" title="{}" loading="lazy" allowfullscreen></iframe></figure>"#,
        html_escape(&block.url),
        html_escape(title)
    ));
}

/// Render one span, applying its marks (first mark outermost)
fn render_span(span: &Span, mark_defs: &[MarkDef]) -> String {
    let mut out = html_escape(&span.text).replace('\n', "<br/>");

    for mark in span.marks.iter().rev() {
        out = match mark.as_str() {
            "strong" => format!("<strong>{}</strong>", out),
            "em" => format!("<em>{}</em>", out),
            "code" => format!("<code>{}</code>", out),
            "underline" => format!("<u>{}</u>", out),
            "strike-through" => format!("<s>{}</s>", out),
            key => match mark_defs.iter().find(|d| d.key == key) {
                Some(def) if def.kind == "link" => match def.href.as_deref() {
                    Some(href) if is_safe_href(href) => {
                        format!(r#"<a href="{}">{}</a>"#, html_escape(href), out)
                    }
                    _ => out,
                },
                _ => out,
            },
        };
    }

    out
}

fn is_safe_href(href: &str) -> bool {
    let href = href.trim();
    href.starts_with("https://")
        || href.starts_with("http://")
        || href.starts_with("mailto:")
        || href.starts_with('/')
        || href.starts_with('#')
}
