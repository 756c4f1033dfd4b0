use crate::catalog::{CatalogItem, ImageLinks};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

static ZOOM_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"zoom=\d+").expect("zoom pattern compiles"));
static PAGE_POINTER_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&pg=PP\d+").expect("page pointer pattern compiles"));

/// Image variants a catalog item may expose, lowest resolution first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    Thumbnail,
    Small,
    Medium,
    Large,
    ExtraLarge,
}

impl QualityTier {
    /// Selection order, best first.
    pub const PRECEDENCE: [QualityTier; 5] = [
        QualityTier::ExtraLarge,
        QualityTier::Large,
        QualityTier::Medium,
        QualityTier::Small,
        QualityTier::Thumbnail,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            QualityTier::Thumbnail => "thumbnail",
            QualityTier::Small => "small",
            QualityTier::Medium => "medium",
            QualityTier::Large => "large",
            QualityTier::ExtraLarge => "extraLarge",
        }
    }
}

impl ImageLinks {
    pub fn get(&self, tier: QualityTier) -> Option<&str> {
        let slot = match tier {
            QualityTier::Thumbnail => &self.thumbnail,
            QualityTier::Small => &self.small,
            QualityTier::Medium => &self.medium,
            QualityTier::Large => &self.large,
            QualityTier::ExtraLarge => &self.extra_large,
        };
        slot.as_deref().filter(|url| !url.trim().is_empty())
    }

    /// Highest tier present, with its URL.
    pub fn best(&self) -> Option<(QualityTier, &str)> {
        QualityTier::PRECEDENCE
            .iter()
            .find_map(|tier| self.get(*tier).map(|url| (*tier, url)))
    }
}

/// Picks the best image for an item and normalizes it, or `None` when the item
/// carries no usable links.
pub fn select_image(item: &CatalogItem) -> Option<String> {
    let (tier, url) = item.image_links.as_ref()?.best()?;
    trace!(target = "covers.selector", tier = tier.label(), url, "image_selected");
    Some(normalize_url(url))
}

/// Upgrades the scheme, maximizes zoom, drops the page curl and the page
/// pointer. Applying it twice yields the same URL.
pub fn normalize_url(url: &str) -> String {
    let mut current = url.trim().to_string();
    // Stripping the page pointer can splice a new token together, so the
    // rewrites repeat until nothing changes. Each pass shortens or settles.
    loop {
        let next = rewrite_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn rewrite_once(url: &str) -> String {
    let secured = match url.strip_prefix("http:") {
        Some(rest) => format!("https:{rest}"),
        None => url.to_string(),
    };
    let zoomed = ZOOM_PARAM.replace_all(&secured, "zoom=3");
    let flat = zoomed.replace("edge=curl", "edge=none");
    PAGE_POINTER_PARAM.replace_all(&flat, "").into_owned()
}
