//! Page adapter boundary — all environment-specific DOM access lives behind
//! this trait so the solver and observer can run against a mock in tests.

use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;

/// Snapshot of a captcha image element's load state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageState {
    /// Whether the element exists at all.
    pub present: bool,
    /// Whether the browser considers the load finished (success or failure).
    pub complete: bool,
    /// Intrinsic pixel width, 0 until loaded (and 0 for a broken image).
    pub natural_width: u32,
    /// Intrinsic pixel height.
    pub natural_height: u32,
}

impl ImageState {
    /// True when the image has loaded and has real pixels to capture.
    pub fn ready(&self) -> bool {
        self.present && self.complete && self.natural_width > 0
    }
}

/// One detected mutation of the watched image's source attribute.
#[derive(Debug, Clone)]
pub struct SourceChange {
    /// The new `src` value, if the element still has one.
    pub src: Option<String>,
}

/// Access to the page hosting the captcha.
///
/// [`LivePage`](crate::LivePage) implements this over a real browser page;
/// tests implement it over in-memory state.
#[async_trait]
pub trait PageAdapter: Send + Sync {
    /// Inspect the captcha image element.
    async fn image_state(&self, id: &str) -> Result<ImageState>;

    /// Wait until the image element signals load completion.
    ///
    /// Resolves once the image is [`ready`](ImageState::ready); fails with
    /// [`Error::ImageLoad`](crate::Error::ImageLoad) if the element reports
    /// a broken load. May wait forever — callers bound it with a timeout.
    async fn wait_for_image_load(&self, id: &str) -> Result<()>;

    /// Render the image's current pixels at natural size and encode as PNG.
    async fn render_image_png(&self, id: &str) -> Result<Vec<u8>>;

    /// Write `value` into the input element with the given id.
    ///
    /// Returns `false` if the element is missing (non-fatal for callers).
    async fn fill_input(&self, id: &str, value: &str) -> Result<bool>;

    /// Install the `src` watch for the image with the given id.
    ///
    /// Called once before the first [`wait_for_source_change`] so mutations
    /// landing in between (e.g. during the initial-solve delay) are buffered
    /// rather than lost. Adapters whose watch needs no setup keep the
    /// default.
    ///
    /// [`wait_for_source_change`]: PageAdapter::wait_for_source_change
    async fn install_source_watch(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    /// Wait for the next mutation of the image's `src` attribute.
    ///
    /// Returns `None` when the watch has ended (page gone, browser closed).
    async fn wait_for_source_change(&self, id: &str) -> Result<Option<SourceChange>>;
}
