//! HTML parsing collaborator: link discovery plus the fragment contract.

use scraper::{Html, Selector};
use sitewalker_core::fragments::{FragmentParseError, FragmentSource};

/// Anything a page can reference that is worth checking.
const LINK_SELECTORS: &[(&str, &str)] = &[
    ("a[href]", "href"),
    ("link[href]", "href"),
    ("script[src]", "src"),
    ("img[src]", "src"),
];

/// Extracts every discoverable href/src from a document. Non-fetchable
/// schemes and bare same-page fragments are skipped at the source, the way
/// a fetch queue would never accept them anyway.
pub fn extract_links(body: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    let mut links = Vec::new();
    for (selector, attr) in LINK_SELECTORS {
        let selector = Selector::parse(selector).unwrap();
        for element in document.select(&selector) {
            if let Some(value) = element.value().attr(attr)
                && !value.is_empty()
                && !value.starts_with("javascript:")
                && !value.starts_with("mailto:")
                && !value.starts_with("tel:")
                && !value.starts_with('#')
            {
                links.push(value.to_string());
            }
        }
    }
    links
}

/// `scraper`-backed implementation of the fragment contract.
pub struct HtmlDocumentSource;

impl FragmentSource for HtmlDocumentSource {
    fn fragment_hrefs(&self, body: &str) -> Vec<String> {
        let document = Html::parse_document(body);
        let selector = Selector::parse(r##"a[href*="#"]"##).unwrap();
        document
            .select(&selector)
            .filter_map(|element| element.value().attr("href"))
            .map(str::to_string)
            .collect()
    }

    fn fragment_exists(&self, body: &str, selector: &str) -> Result<bool, FragmentParseError> {
        let parsed = Selector::parse(selector).map_err(|_| FragmentParseError {
            selector: selector.to_string(),
        })?;
        let document = Html::parse_document(body);
        Ok(document.select(&parsed).next().is_some())
    }
}
