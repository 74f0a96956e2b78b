use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::{ChartTarget, PopupDismissal};
use crate::engine::{BrowserEngine, ElementRef};
use crate::errors::HarvestError;
use crate::snapshot::ChartPoint;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A live browser page with the target chart located.
///
/// The chart element is resolved once, in [`ExtractionSession::locate`], and
/// held for the lifetime of the session. Hovers take `&mut self`: the page has
/// a single pointer, so reads are serialized by ownership.
pub struct ExtractionSession {
    engine: Box<dyn BrowserEngine>,
    chart: ElementRef,
    tooltip_xpath: String,
    settle_delay: Duration,
}

impl std::fmt::Debug for ExtractionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionSession")
            .field("chart", &self.chart)
            .field("tooltip_xpath", &self.tooltip_xpath)
            .field("settle_delay", &self.settle_delay)
            .finish()
    }
}

impl ExtractionSession {
    /// Navigate to `url`, try to dismiss the onboarding dialog, then locate the chart.
    pub async fn open(
        engine: Box<dyn BrowserEngine>,
        url: &str,
        popup: &PopupDismissal,
        target: &ChartTarget,
    ) -> Result<Self, HarvestError> {
        if let Err(e) = engine.navigate(url).await {
            release(engine.as_ref()).await;
            return Err(e);
        }
        dismiss_onboarding(engine.as_ref(), popup).await;
        Self::locate(engine, target).await
    }

    /// Find the one canvas under the chart heading whose renderer id and
    /// pixel size both match, waiting up to `target.ready_timeout`.
    ///
    /// On failure the browser session is released before the error is returned.
    #[instrument(level = "debug", skip(engine, target), fields(label = %target.heading_label))]
    pub async fn locate(
        engine: Box<dyn BrowserEngine>,
        target: &ChartTarget,
    ) -> Result<Self, HarvestError> {
        let xpath = target.canvas_xpath();
        let deadline = Instant::now() + target.ready_timeout;

        loop {
            match find_chart(engine.as_ref(), target, &xpath).await {
                Ok(Some(chart)) => {
                    info!(element = %chart, "Located chart canvas");
                    return Ok(Self {
                        engine,
                        chart,
                        tooltip_xpath: target.tooltip_xpath(),
                        settle_delay: target.settle_delay,
                    });
                }
                Ok(None) => {}
                // The chart re-renders while loading; a vanished candidate just means "not yet".
                Err(HarvestError::WebDriver { error, message })
                    if error == "stale element reference" =>
                {
                    debug!(%message, "Candidate went stale, retrying");
                }
                Err(e) => {
                    release(engine.as_ref()).await;
                    return Err(e);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }

        release(engine.as_ref()).await;
        Err(HarvestError::ElementNotFound(format!(
            "no canvas under heading '{}' with data-zr-dom-id='{}' and size {}x{} within {:?}",
            target.heading_label, target.render_id, target.width, target.height, target.ready_timeout
        )))
    }

    pub fn chart(&self) -> &ElementRef {
        &self.chart
    }

    /// Hover `point` and return the first non-empty tooltip text, or an empty
    /// string when no tooltip is showing. Not retried.
    #[instrument(level = "debug", skip(self), fields(point = %point))]
    pub async fn hover_and_read(&mut self, point: ChartPoint) -> Result<String, HarvestError> {
        self.engine.hover(&self.chart, point.x, point.y).await?;
        tokio::time::sleep(self.settle_delay).await;

        let overlays = self.engine.find_elements(&self.tooltip_xpath).await?;
        for overlay in &overlays {
            let text = self.engine.text(overlay).await?;
            let text = text.trim();
            if !text.is_empty() {
                debug!(%text, "Tooltip found");
                return Ok(text.to_string());
            }
        }

        debug!(overlays = overlays.len(), "No tooltip text at point");
        Ok(String::new())
    }

    /// Release the browser session.
    pub async fn close(self) -> Result<(), HarvestError> {
        self.engine.quit().await
    }
}

async fn find_chart(
    engine: &dyn BrowserEngine,
    target: &ChartTarget,
    xpath: &str,
) -> Result<Option<ElementRef>, HarvestError> {
    let candidates = engine.find_elements(xpath).await?;
    debug!(count = candidates.len(), "Chart candidates");

    for candidate in candidates {
        let render_id = engine.attribute(&candidate, "data-zr-dom-id").await?;
        if render_id.as_deref() != Some(target.render_id.as_str()) {
            continue;
        }
        let size = engine.size(&candidate).await?;
        if size.matches(target.width, target.height) {
            return Ok(Some(candidate));
        }
        debug!(element = %candidate, ?size, "Renderer id matched but size differs");
    }
    Ok(None)
}

async fn release(engine: &dyn BrowserEngine) {
    if let Err(e) = engine.quit().await {
        warn!(error = %e, "Failed to release browser session");
    }
}

/// Best-effort click on the onboarding dialog's "later" button.
///
/// Returns whether the dialog was dismissed; absence or any failure is logged
/// and ignored.
pub async fn dismiss_onboarding(engine: &dyn BrowserEngine, popup: &PopupDismissal) -> bool {
    let xpath = popup.button_xpath();
    let deadline = Instant::now() + popup.timeout;

    loop {
        match engine.find_elements(&xpath).await {
            Ok(buttons) => {
                if let Some(button) = buttons.first() {
                    return match engine.click(button).await {
                        Ok(()) => {
                            info!("Dismissed onboarding popup");
                            true
                        }
                        Err(e) => {
                            info!(error = %e, "Onboarding popup found but could not be dismissed");
                            false
                        }
                    };
                }
            }
            Err(e) => {
                info!(error = %e, "Onboarding popup lookup failed");
                return false;
            }
        }

        let now = Instant::now();
        if now >= deadline {
            info!("No onboarding popup shown");
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}
