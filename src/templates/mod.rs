//! Built-in site templates using the Tera template engine
//!
//! All templates are embedded directly in the binary. Autoescaping is off
//! because page bodies arrive as pre-rendered HTML; every text value coming
//! from the backend or the visitor goes through the `html` filter instead.

use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::helpers;

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> tera::Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("index.html", include_str!("site/index.html")),
            ("post.html", include_str!("site/post.html")),
            ("not_found.html", include_str!("site/not_found.html")),
            ("error.html", include_str!("site/error.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("site/partials/header.html"),
            ),
        ])?;

        tera.register_filter("html", html_filter);
        tera.register_filter("truncate_chars", truncate_chars_filter);
        tera.register_filter("date_format", date_format_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> tera::Result<String> {
        self.tera.render(template_name, context)
    }
}

/// Tera filter: escape HTML special characters
fn html_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = match value {
        tera::Value::Null => String::new(),
        tera::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Ok(tera::Value::String(helpers::html_escape(&s)))
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };

    Ok(tera::Value::String(helpers::truncate(
        &s,
        length,
        Some(&omission),
    )))
}

/// Tera filter: format an RFC 3339 timestamp with a chrono format string
fn date_format_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("date_format", "value", String, value);
    let format = match args.get("format") {
        Some(val) => tera::try_get_value!("date_format", "format", String, val),
        None => "%B %-d, %Y".to_string(),
    };

    match chrono::DateTime::parse_from_rfc3339(&s) {
        Ok(date) => Ok(tera::Value::String(date.format(&format).to_string())),
        // Not a timestamp: show it as is
        Err(_) => Ok(tera::Value::String(helpers::html_escape(&s))),
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
}

/// One card on the home page
#[derive(Debug, Clone, Serialize)]
pub struct CardData {
    pub title: String,
    pub description: String,
    pub author_name: String,
    pub author_image: String,
    pub main_image: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub id: String,
    pub title: String,
    pub description: String,
    pub author_name: String,
    pub author_image: String,
    pub main_image: String,
    pub created_at: String,
    /// Rendered body HTML
    pub body: String,
    pub comments: Vec<CommentData>,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentData {
    pub name: String,
    pub comment: String,
}

/// Comment form as it should be drawn
#[derive(Debug, Clone, Serialize)]
pub struct FormData {
    pub action: String,
    pub submitted: bool,
    pub failure: Option<String>,
    pub name: String,
    pub email: String,
    pub comment: String,
    /// Inline validation messages
    pub errors: Vec<&'static str>,
}
