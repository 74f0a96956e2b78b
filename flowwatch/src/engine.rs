use crate::errors::HarvestError;
use std::fmt;

/// Opaque handle to an element in the live page, as issued by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rendered element size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementSize {
    pub width: f64,
    pub height: f64,
}

impl ElementSize {
    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.width == f64::from(width) && self.height == f64::from(height)
    }
}

/// The operations the harvester needs from a live browser page.
///
/// Implementations hold a single pointer; `hover` moves it, so callers must
/// never issue hovers concurrently.
#[async_trait::async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Load `url` in the current tab.
    async fn navigate(&self, url: &str) -> Result<(), HarvestError>;

    /// All elements currently matching an XPath expression, in document order.
    async fn find_elements(&self, xpath: &str) -> Result<Vec<ElementRef>, HarvestError>;

    /// Value of an element attribute, `None` when the attribute is absent.
    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, HarvestError>;

    /// Rendered size of the element.
    async fn size(&self, element: &ElementRef) -> Result<ElementSize, HarvestError>;

    /// Visible text of the element.
    async fn text(&self, element: &ElementRef) -> Result<String, HarvestError>;

    async fn click(&self, element: &ElementRef) -> Result<(), HarvestError>;

    /// Move the pointer to `(dx, dy)` relative to the element's pointer origin.
    async fn hover(&self, element: &ElementRef, dx: i32, dy: i32) -> Result<(), HarvestError>;

    /// End the browser session. Further calls fail.
    async fn quit(&self) -> Result<(), HarvestError>;
}
