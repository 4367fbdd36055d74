//! Live page adapter — drives a real browser page through injected
//! JavaScript evaluated over CDP.

use crate::page::{ImageState, PageAdapter, SourceChange};
use crate::{Config, Error, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use eoka::Page;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Reports the captcha image element's load state.
const IMAGE_STATE_JS: &str = r#"
(() => {
    const img = document.getElementById(__ID__);
    if (!img) {
        return JSON.stringify({ present: false, complete: false, natural_width: 0, natural_height: 0 });
    }
    return JSON.stringify({
        present: true,
        complete: img.complete,
        natural_width: img.naturalWidth,
        natural_height: img.naturalHeight
    });
})()
"#;

/// Draws the image onto an offscreen canvas at natural size and returns the
/// pixels as a PNG data URL. Reading back a cross-origin image throws a
/// SecurityError, reported through the error field.
const RENDER_PNG_JS: &str = r#"
(() => {
    const img = document.getElementById(__ID__);
    if (!img) return JSON.stringify({ error: 'element missing' });
    try {
        const canvas = document.createElement('canvas');
        canvas.width = img.naturalWidth;
        canvas.height = img.naturalHeight;
        canvas.getContext('2d').drawImage(img, 0, 0);
        return JSON.stringify({ data: canvas.toDataURL('image/png') });
    } catch (e) {
        return JSON.stringify({ error: String(e) });
    }
})()
"#;

/// Sets the input's value and fires the events frameworks listen for.
const FILL_INPUT_JS: &str = r#"
(() => {
    const input = document.getElementById(__ID__);
    if (!input) return JSON.stringify({ found: false });
    input.value = __VALUE__;
    input.dispatchEvent(new Event('input', { bubbles: true }));
    input.dispatchEvent(new Event('change', { bubbles: true }));
    return JSON.stringify({ found: true });
})()
"#;

/// Installs a MutationObserver on the image's src attribute. Each mutation
/// bumps a generation counter the Rust side polls. Idempotent.
const INSTALL_WATCH_JS: &str = r#"
(() => {
    const img = document.getElementById(__ID__);
    if (!img) return JSON.stringify({ installed: false });
    if (!window.__captchaAutofillWatch) {
        window.__captchaAutofillWatch = { gen: 0, src: img.getAttribute('src') };
        new MutationObserver((mutations) => {
            for (const m of mutations) {
                if (m.type === 'attributes' && m.attributeName === 'src') {
                    window.__captchaAutofillWatch.gen += 1;
                    window.__captchaAutofillWatch.src = img.getAttribute('src');
                }
            }
        }).observe(img, { attributes: true, attributeFilter: ['src'] });
    }
    return JSON.stringify({ installed: true });
})()
"#;

const POLL_WATCH_JS: &str = "JSON.stringify(window.__captchaAutofillWatch || null)";

#[derive(Deserialize)]
struct RenderResult {
    data: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct FillResult {
    found: bool,
}

#[derive(Deserialize)]
struct InstallResult {
    installed: bool,
}

#[derive(Deserialize)]
struct WatchState {
    gen: u64,
    src: Option<String>,
}

/// [`PageAdapter`] over a live `eoka::Page`.
pub struct LivePage {
    page: Page,
    poll_interval: Duration,
    load_poll: Duration,
    last_gen: AtomicU64,
}

impl LivePage {
    pub fn new(page: Page, config: &Config) -> Self {
        Self {
            page,
            poll_interval: Duration::from_millis(config.watch_poll_ms),
            load_poll: Duration::from_millis(100),
            last_gen: AtomicU64::new(0),
        }
    }

    /// The underlying page, for callers that need direct access.
    pub fn page(&self) -> &Page {
        &self.page
    }

    async fn eval_json<T: serde::de::DeserializeOwned>(&self, js: String) -> Result<T> {
        let json: String = self.page.evaluate(&js).await?;
        serde_json::from_str(&json)
            .map_err(|e| Error::Protocol(format!("unexpected page script result: {}", e)))
    }
}

/// Substitute element id (and optional value) into a JS template as safe
/// string literals.
fn render_js(template: &str, id: &str, value: Option<&str>) -> String {
    let mut js = template.replace("__ID__", &json_literal(id));
    if let Some(value) = value {
        js = js.replace("__VALUE__", &json_literal(value));
    }
    js
}

fn json_literal(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".into())
}

#[async_trait]
impl PageAdapter for LivePage {
    async fn image_state(&self, id: &str) -> Result<ImageState> {
        self.eval_json(render_js(IMAGE_STATE_JS, id, None)).await
    }

    async fn install_source_watch(&self, id: &str) -> Result<()> {
        let install: InstallResult = self.eval_json(render_js(INSTALL_WATCH_JS, id, None)).await?;
        if !install.installed {
            return Err(Error::TargetNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn wait_for_image_load(&self, id: &str) -> Result<()> {
        // CDP exposes no push channel for element load events, so poll the
        // complete/naturalWidth pair the way the page itself would observe it.
        // The caller bounds this loop with a timeout.
        loop {
            let state = self.image_state(id).await?;
            if !state.present {
                return Err(Error::TargetNotFound(id.to_string()));
            }
            if state.complete {
                if state.natural_width == 0 {
                    // complete with no pixels means the load failed
                    return Err(Error::ImageLoad(format!("#{} has no natural size", id)));
                }
                return Ok(());
            }
            tokio::time::sleep(self.load_poll).await;
        }
    }

    async fn render_image_png(&self, id: &str) -> Result<Vec<u8>> {
        let result: RenderResult = self.eval_json(render_js(RENDER_PNG_JS, id, None)).await?;
        if let Some(error) = result.error {
            return Err(Error::Capture(error));
        }
        let data_url = result
            .data
            .ok_or_else(|| Error::Capture("canvas produced no data".into()))?;
        let b64 = data_url
            .strip_prefix("data:image/png;base64,")
            .ok_or_else(|| Error::Capture(format!("unexpected data URL: {:.40}", data_url)))?;
        BASE64
            .decode(b64)
            .map_err(|e| Error::Capture(format!("invalid base64 payload: {}", e)))
    }

    async fn fill_input(&self, id: &str, value: &str) -> Result<bool> {
        let result: FillResult = self
            .eval_json(render_js(FILL_INPUT_JS, id, Some(value)))
            .await?;
        Ok(result.found)
    }

    async fn wait_for_source_change(&self, id: &str) -> Result<Option<SourceChange>> {
        // Idempotent re-check; the observer installs the watch up front.
        let install: InstallResult =
            match self.eval_json(render_js(INSTALL_WATCH_JS, id, None)).await {
                Ok(install) => install,
                Err(err) => {
                    debug!("source watch ended: {}", err);
                    return Ok(None);
                }
            };
        if !install.installed {
            return Ok(None);
        }
        loop {
            tokio::time::sleep(self.poll_interval).await;
            let state: Option<WatchState> = match self.eval_json(POLL_WATCH_JS.to_string()).await {
                Ok(state) => state,
                Err(err) => {
                    // Page or browser went away; end the watch cleanly.
                    debug!("source watch ended: {}", err);
                    return Ok(None);
                }
            };
            let Some(state) = state else {
                // Navigation wiped the page globals; reinstall if the image
                // survived, otherwise the watch is over. A failing reinstall
                // means the page died too, which is the same clean shutdown.
                let install: InstallResult =
                    match self.eval_json(render_js(INSTALL_WATCH_JS, id, None)).await {
                        Ok(install) => install,
                        Err(err) => {
                            debug!("source watch ended: {}", err);
                            return Ok(None);
                        }
                    };
                if !install.installed {
                    return Ok(None);
                }
                self.last_gen.store(0, Ordering::Relaxed);
                continue;
            };
            let seen = self.last_gen.swap(state.gen, Ordering::Relaxed);
            if state.gen > seen {
                return Ok(Some(SourceChange { src: state.src }));
            }
        }
    }
}
