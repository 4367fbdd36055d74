//! Solve pipeline — capture, recognize, fill, at most one attempt in flight.

use crate::page::PageAdapter;
use crate::service::Recognizer;
use crate::{Config, Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// What became of one trigger.
#[derive(Debug)]
pub enum Outcome {
    /// The pipeline ran to completion; carries the solved text even when the
    /// input field was missing.
    Solved(String),
    /// An attempt was already in flight; this trigger was dropped with no
    /// side effects.
    Busy,
    /// The attempt failed. Already logged; carried for callers that want to
    /// inspect it.
    Failed(Error),
}

/// Runs the capture → recognize → fill pipeline for one captcha widget.
///
/// The in-flight guard is scoped to the instance, so independent widgets get
/// independent solvers.
pub struct Solver {
    page: Arc<dyn PageAdapter>,
    recognizer: Arc<dyn Recognizer>,
    config: Config,
    in_flight: AtomicBool,
}

impl Solver {
    pub fn new(page: Arc<dyn PageAdapter>, recognizer: Arc<dyn Recognizer>, config: Config) -> Self {
        Self {
            page,
            recognizer,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run one solve attempt.
    ///
    /// Never propagates pipeline failures: they are logged here at the
    /// attempt boundary and reported through [`Outcome`], so a failed
    /// attempt cannot affect the next trigger.
    pub async fn solve(&self) -> Outcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("solve already in flight, dropping trigger");
            return Outcome::Busy;
        };
        match self.attempt().await {
            Ok(text) => {
                info!(text = %text, "captcha solved");
                Outcome::Solved(text)
            }
            Err(err) => {
                warn!("solve attempt failed: {}", err);
                Outcome::Failed(err)
            }
        }
    }

    async fn attempt(&self) -> Result<String> {
        let image_id = &self.config.image_id;

        let state = self.page.image_state(image_id).await?;
        if !state.present {
            return Err(Error::TargetNotFound(image_id.clone()));
        }
        if !state.ready() {
            debug!("captcha image not loaded yet, waiting");
            timeout(
                Duration::from_millis(self.config.load_timeout_ms),
                self.page.wait_for_image_load(image_id),
            )
            .await
            .map_err(|_| Error::Timeout("captcha image load".into()))??;
        }

        let png = self.page.render_image_png(image_id).await?;
        if png.is_empty() {
            return Err(Error::Capture("empty image payload".into()));
        }
        debug!(bytes = png.len(), "captured captcha image");

        let text = timeout(
            Duration::from_millis(self.config.request_timeout_ms),
            self.recognizer.recognize(&png),
        )
        .await
        .map_err(|_| Error::Timeout("recognition service response".into()))??;

        if self.page.fill_input(&self.config.input_id, &text).await? {
            debug!(id = %self.config.input_id, "captcha input filled");
        } else {
            // Non-fatal: the page may not have the field yet, or may take
            // the answer through some other channel.
            warn!(
                id = %self.config.input_id,
                "captcha input not found, leaving result unapplied"
            );
        }
        Ok(text)
    }
}

/// RAII re-entrancy guard: acquired with a compare-exchange, released on
/// drop so every exit path of an attempt clears it.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
