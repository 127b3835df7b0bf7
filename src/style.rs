//! Style delivery
//!
//! Builds the document head for a run: stylesheet links for the style targets that were
//! requested and whose asset exists, followed by the aggregated highlighter stylesheet.

use crate::config::AssetsConfig;
use crate::engine::CssAssetRequestList;
use crate::highlight::escape_html;
use std::path::{Path, PathBuf};

/// Maps style target names to stylesheet assets on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResolver {
    dir: PathBuf,
    base_url: String,
}

impl AssetResolver {
    pub fn new(dir: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            dir: dir.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AssetsConfig) -> Self {
        Self::new(&config.dir, &config.url)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// URL of the stylesheet for `name`, when `{dir}/{name}.css` exists
    pub fn resolve(&self, name: &str) -> Option<String> {
        if !is_safe_asset_name(name) {
            log::warn!("Refusing stylesheet asset name '{name}'");
            return None;
        }

        let file_name = format!("{name}.css");
        if self.dir.join(&file_name).is_file() {
            Some(format!("{}/{file_name}", self.base_url))
        } else {
            log::debug!("No stylesheet asset '{file_name}' in {}", self.dir.display());
            None
        }
    }
}

fn is_safe_asset_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && !name.contains("..")
}

/// A `<link>` element for the stylesheet at `url`
pub fn stylesheet_link(url: &str) -> String {
    format!(
        "<link rel=\"stylesheet\" href=\"{}\" type=\"text/css\" media=\"screen\" />\n",
        escape_html(url)
    )
}

/// Head markup for a run.
///
/// The default asset comes first, then every other requested asset once, in request order.
/// Missing assets are skipped. The aggregated stylesheet follows in a single `<style>`
/// element when it is not empty.
pub fn head_markup(
    default_asset: Option<&str>,
    requests: &CssAssetRequestList,
    stylesheet: &str,
    resolver: &AssetResolver,
) -> String {
    let mut head = String::new();

    let names = default_asset
        .into_iter()
        .chain(requests.unique().into_iter().filter(|name| Some(*name) != default_asset));
    for name in names {
        if let Some(url) = resolver.resolve(name) {
            head.push_str(&stylesheet_link(&url));
        }
    }

    if !stylesheet.is_empty() {
        head.push_str("<style type=\"text/css\">\n");
        head.push_str(stylesheet);
        if !stylesheet.ends_with('\n') {
            head.push('\n');
        }
        head.push_str("</style>\n");
    }

    head
}
