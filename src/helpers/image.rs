//! Image asset URL resolution

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::BackendConfig;
use crate::content::ImageRef;

const CDN_BASE: &str = "https://cdn.sanity.io/images";

lazy_static! {
    /// `image-<asset id>-<width>x<height>-<format>`
    static ref ASSET_REF: Regex =
        Regex::new(r"^image-([A-Za-z0-9]+)-(\d+x\d+)-([a-z0-9]+)$").unwrap();
}

/// Resolves image references to display URLs for one project and dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResolver {
    project_id: String,
    dataset: String,
}

impl ImageResolver {
    pub fn new(backend: &BackendConfig) -> Self {
        Self {
            project_id: backend.project_id.clone(),
            dataset: backend.dataset.clone(),
        }
    }

    /// Display URL for an image reference
    ///
    /// # Examples
    /// ```ignore
    /// // image-Tb9Ew8CXIwaY6R1kjMvI0uRR-2000x3000-jpg
    /// // -> https://cdn.sanity.io/images/<project>/<dataset>/Tb9Ew8CXIwaY6R1kjMvI0uRR-2000x3000.jpg
    /// ```
    pub fn url_for(&self, image: &ImageRef) -> Option<String> {
        self.url_for_asset(image.asset_ref()?)
    }

    /// Display URL for an optional image reference, empty when unresolvable
    pub fn url_or_empty(&self, image: Option<&ImageRef>) -> String {
        image.and_then(|i| self.url_for(i)).unwrap_or_default()
    }

    fn url_for_asset(&self, reference: &str) -> Option<String> {
        let caps = ASSET_REF.captures(reference)?;
        Some(format!(
            "{}/{}/{}/{}-{}.{}",
            CDN_BASE, self.project_id, self.dataset, &caps[1], &caps[2], &caps[3]
        ))
    }
}
