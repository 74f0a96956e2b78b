//! Static configuration for the harvested page and the browser session.
//!
//! The defaults encode the page contract of the money-flow allocation chart on
//! the dashboard: the heading label, the renderer id and pixel size that single
//! out the right canvas among its identical siblings, and the style marker of
//! the tooltip overlay.

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::HarvestError;
use crate::snapshot::ChartPoint;

pub const DEFAULT_DASHBOARD_URL: &str = "https://fireant.vn/dashboard";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_HISTORY_PATH: &str = "chart-jsdata.json";

const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_POPUP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_COLLECT_INTERVAL: Duration = Duration::from_secs(10);

/// Points hovered every cycle, in order.
pub const DEFAULT_POINTS: [ChartPoint; 3] = [
    ChartPoint::new(-100, 40),
    ChartPoint::new(-20, 40),
    ChartPoint::new(180, 0),
];

/// Everything needed to find the chart and read its tooltips.
#[derive(Debug, Clone)]
pub struct ChartTarget {
    /// Text contained in the `h6` heading above the chart containers.
    pub heading_label: String,
    /// Expected value of the canvas `data-zr-dom-id` attribute.
    pub render_id: String,
    /// Exact rendered width of the canvas, in CSS pixels.
    pub width: u32,
    /// Exact rendered height of the canvas, in CSS pixels.
    pub height: u32,
    /// Substring of the overlay `style` attribute that marks a tooltip.
    pub tooltip_style_marker: String,
    /// How long to wait for the chart to be rendered.
    pub ready_timeout: Duration,
    /// Pause after each hover so the chart can redraw its tooltip.
    pub settle_delay: Duration,
}

impl Default for ChartTarget {
    fn default() -> Self {
        Self {
            heading_label: "Phân bổ dòng tiền".to_string(),
            render_id: "zr_0".to_string(),
            width: 468,
            height: 184,
            tooltip_style_marker: "z-index: 9999999".to_string(),
            ready_timeout: DEFAULT_READY_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl ChartTarget {
    pub fn canvas_xpath(&self) -> String {
        format!(
            "//h6[contains(text(), '{}')]/following-sibling::div//canvas",
            self.heading_label
        )
    }

    pub fn tooltip_xpath(&self) -> String {
        format!(
            "//div[contains(@style, '{}')]",
            self.tooltip_style_marker
        )
    }
}

/// Onboarding dialog shown on first visit.
#[derive(Debug, Clone)]
pub struct PopupDismissal {
    pub button_label: String,
    pub timeout: Duration,
}

impl Default for PopupDismissal {
    fn default() -> Self {
        Self {
            button_label: "Để sau".to_string(),
            timeout: DEFAULT_POPUP_TIMEOUT,
        }
    }
}

impl PopupDismissal {
    pub fn button_xpath(&self) -> String {
        format!(
            "//button[.//span[contains(text(), '{}')]]",
            self.button_label
        )
    }
}

/// Browser capabilities requested from the WebDriver endpoint.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub window_size: (u32, u32),
    /// Profile directory; a fresh temporary one is created when `None`.
    pub user_data_dir: Option<PathBuf>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1920, 1080),
            user_data_dir: None,
        }
    }
}

/// Parses a `WIDTH,HEIGHT` (or `WIDTHxHEIGHT`) window size.
pub fn parse_window_size(raw: &str) -> Result<(u32, u32), HarvestError> {
    let (w, h) = raw
        .split_once([',', 'x'])
        .ok_or_else(|| HarvestError::InvalidArgument(format!("window size '{raw}'")))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|e| HarvestError::InvalidArgument(format!("window size '{raw}': {e}")))
    };
    let (w, h) = (parse(w)?, parse(h)?);
    if w == 0 || h == 0 {
        return Err(HarvestError::InvalidArgument(format!(
            "window size '{raw}' must be non-zero"
        )));
    }
    Ok((w, h))
}

/// Top-level configuration for one harvester process.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub dashboard_url: String,
    pub webdriver_url: String,
    pub history_path: PathBuf,
    pub points: Vec<ChartPoint>,
    pub interval: Duration,
    pub target: ChartTarget,
    pub popup: PopupDismissal,
    pub browser: BrowserOptions,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            history_path: PathBuf::from(DEFAULT_HISTORY_PATH),
            points: DEFAULT_POINTS.to_vec(),
            interval: DEFAULT_COLLECT_INTERVAL,
            target: ChartTarget::default(),
            popup: PopupDismissal::default(),
            browser: BrowserOptions::default(),
        }
    }
}
