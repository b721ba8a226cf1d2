//! Extraction of downloadable resources from the portal's dataset page.
//!
//! Pure markup-in, references-out. Everything tied to the portal's page
//! layout lives here so it can be replaced without touching downloads.

use crate::error::CrawlError;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Caption the portal puts on its format buttons; never a useful name
pub const GENERIC_CAPTION: &str = "CSV";
/// Resources whose name contains this marker are dropped entirely
pub const EXCLUDED_MARKER: &str = "Google";

static ITEM_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("li.resource-item").expect("static selector"));
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("static selector"));
static LABEL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span").expect("static selector"));

/// One downloadable item listed on the portal page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub link: Url,
    pub display_name: String,
}

/// Parse every resource item on the page. Malformed items are logged and
/// skipped; an empty result is not an error here.
pub fn parse_resource_items(html: &str, base: &Url) -> Vec<ResourceRef> {
    let document = Html::parse_document(html);
    let items: Vec<ElementRef> = document.select(&ITEM_SELECTOR).collect();
    info!("Found {} resource items", items.len());

    let mut resources: Vec<ResourceRef> = Vec::new();
    for item in items {
        match parse_item(item, base, resources.len() + 1) {
            Ok(Some(resource)) => {
                if resource.display_name.contains(EXCLUDED_MARKER) {
                    info!("Skipping {} resource: {}", EXCLUDED_MARKER, resource.display_name);
                    continue;
                }
                info!("Found resource: {}", resource.display_name);
                resources.push(resource);
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping malformed resource item: {}", e),
        }
    }

    info!("{} usable resources found", resources.len());
    resources
}

/// `position` is the 1-based index the item would take if accepted.
fn parse_item(
    item: ElementRef,
    base: &Url,
    position: usize,
) -> Result<Option<ResourceRef>, CrawlError> {
    let Some(anchor) = item.select(&LINK_SELECTOR).next() else {
        debug!("Resource item without a link");
        return Ok(None);
    };
    let href = match anchor.value().attr("href").map(str::trim) {
        Some(href) if !href.is_empty() => href,
        _ => {
            debug!("Resource item link without href");
            return Ok(None);
        }
    };

    let link = base
        .join(href)
        .map_err(|source| CrawlError::InvalidUrl { href: href.to_string(), source })?;

    let display_name = label_text(item)
        .or_else(|| name_query_param(&link))
        .unwrap_or_else(|| format!("calendar_{}", position));

    Ok(Some(ResourceRef { link, display_name }))
}

/// First non-empty label outside any button, ignoring the generic caption
fn label_text(item: ElementRef) -> Option<String> {
    item.select(&LABEL_SELECTOR)
        .filter(|label| !inside_button(*label, item))
        .map(stripped_text)
        .find(|text| !text.is_empty() && text != GENERIC_CAPTION)
}

fn inside_button(label: ElementRef, item: ElementRef) -> bool {
    label
        .ancestors()
        .take_while(|node| node.id() != item.id())
        .filter_map(ElementRef::wrap)
        .any(|element| element.value().name() == "button")
}

fn stripped_text(element: ElementRef) -> String {
    element.text().map(str::trim).filter(|piece| !piece.is_empty()).collect()
}

fn name_query_param(link: &Url) -> Option<String> {
    link.query_pairs()
        .find(|(key, _)| key == "name")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
