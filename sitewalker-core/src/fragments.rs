//! Seam for the HTML-parser collaborator.
//!
//! The controller never parses HTML itself; it asks an implementation of
//! [`FragmentSource`] about fragment anchors and fragment targets in a
//! fetched document. A zero-match lookup and an unparsable selector are
//! distinguishable, which is what separates a `fragment_not_found` outcome
//! from a `bad_fragment` one.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unparsable fragment selector: {selector}")]
pub struct FragmentParseError {
    pub selector: String,
}

pub trait FragmentSource {
    /// Every anchor href in the document that carries a fragment reference.
    fn fragment_hrefs(&self, body: &str) -> Vec<String>;

    /// Whether the document contains an element matching the fragment
    /// selector (e.g. `#section-2`). `Ok(false)` means the selector parsed
    /// but matched nothing; `Err` means the selector itself is malformed.
    fn fragment_exists(&self, body: &str, selector: &str) -> Result<bool, FragmentParseError>;
}
