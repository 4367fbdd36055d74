//! Observer — turns page events (initial load, image refresh) into solve
//! attempts.

use crate::page::PageAdapter;
use crate::solver::Solver;
use crate::{Config, Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Watches the captcha image and triggers the solver once per event.
///
/// Each trigger spawns its own solve task rather than awaiting inline, so a
/// trigger arriving while an attempt is in flight is dropped by the solver's
/// guard instead of queued behind it.
pub struct Observer {
    page: Arc<dyn PageAdapter>,
    solver: Arc<Solver>,
    config: Config,
}

impl Observer {
    pub fn new(page: Arc<dyn PageAdapter>, solver: Arc<Solver>, config: Config) -> Self {
        Self {
            page,
            solver,
            config,
        }
    }

    /// Watch the captcha image until the page goes away.
    ///
    /// Fails with [`Error::TargetNotFound`] if the image element is absent
    /// at startup — the system is inert for this page, nothing is watched.
    /// Otherwise solves once after the configured initial delay, then once
    /// per `src` mutation, and returns `Ok(())` when the watch ends.
    pub async fn run(&self) -> Result<()> {
        let image_id = &self.config.image_id;

        let state = self.page.image_state(image_id).await?;
        if !state.present {
            error!(id = %image_id, "captcha image not found, nothing to watch");
            return Err(Error::TargetNotFound(image_id.clone()));
        }

        // Install the watch before the delay: a refresh landing while the
        // page's own scripts finish wiring the image must be buffered, not
        // lost.
        self.page.install_source_watch(image_id).await?;
        tokio::time::sleep(Duration::from_millis(self.config.initial_delay_ms)).await;
        info!(id = %image_id, "solving initial captcha");
        self.trigger();

        while let Some(change) = self.page.wait_for_source_change(image_id).await? {
            debug!(src = ?change.src, "captcha image source changed, re-solving");
            self.trigger();
        }
        info!("captcha watch ended");
        Ok(())
    }

    fn trigger(&self) {
        let solver = Arc::clone(&self.solver);
        tokio::spawn(async move {
            solver.solve().await;
        });
    }
}
