#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use flowwatch::{BrowserEngine, ChartTarget, Clock, ElementRef, ElementSize, HarvestError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Test helper to setup logging for debugging
pub fn setup_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

/// Chart target with instant settling and a short readiness timeout.
pub fn fast_target(ready_timeout: Duration) -> ChartTarget {
    ChartTarget {
        ready_timeout,
        settle_delay: Duration::ZERO,
        ..ChartTarget::default()
    }
}

/// Clock whose sleeps advance time instantly.
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
        })
    }

    pub fn set(&self, at: NaiveDateTime) {
        *self.now.lock().unwrap() = at;
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(duration).unwrap();
    }

    fn name(&self) -> &str {
        "ManualClock"
    }
}

#[derive(Debug, Clone)]
pub struct Canvas {
    pub id: String,
    pub render_id: Option<String>,
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    pub fn new(id: &str, render_id: &str, width: f64, height: f64) -> Self {
        Self {
            id: id.to_string(),
            render_id: Some(render_id.to_string()),
            width,
            height,
        }
    }
}

/// Observable state of the fake dashboard page.
#[derive(Debug, Default)]
pub struct PageState {
    pub canvases: Vec<Canvas>,
    /// Number of canvas lookups that come back empty before the chart renders.
    pub canvas_hidden_lookups: usize,
    pub canvas_lookups: usize,
    /// Overlay texts shown while the pointer rests at an offset.
    pub tooltips: HashMap<(i32, i32), Vec<String>>,
    pub pointer: Option<(i32, i32)>,
    pub hovers: Vec<(String, i32, i32)>,
    pub fail_hover_at: Option<(i32, i32)>,
    pub popup_shown: bool,
    pub clicked: Vec<String>,
    pub navigated: Vec<String>,
    pub quit: bool,
}

/// In-memory stand-in for a browser page showing the dashboard.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    pub state: Arc<Mutex<PageState>>,
}

impl ScriptedEngine {
    pub fn with_canvases(canvases: Vec<Canvas>) -> Self {
        let engine = Self::default();
        engine.state.lock().unwrap().canvases = canvases;
        engine
    }

    /// Dashboard with the target chart next to a same-size sibling from another renderer.
    pub fn dashboard() -> Self {
        Self::with_canvases(vec![
            Canvas::new("c-other", "zr_1", 468.0, 184.0),
            Canvas::new("c-chart", "zr_0", 468.0, 184.0),
        ])
    }

    pub fn tooltip(self, x: i32, y: i32, texts: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .tooltips
            .insert((x, y), texts.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn hovered(&self) -> Vec<(i32, i32)> {
        self.state
            .lock()
            .unwrap()
            .hovers
            .iter()
            .map(|(_, x, y)| (*x, *y))
            .collect()
    }

    pub fn is_quit(&self) -> bool {
        self.state.lock().unwrap().quit
    }
}

fn no_such_element(id: &str) -> HarvestError {
    HarvestError::WebDriver {
        error: "no such element".to_string(),
        message: format!("unknown element {id}"),
    }
}

#[async_trait::async_trait]
impl BrowserEngine for ScriptedEngine {
    async fn navigate(&self, url: &str) -> Result<(), HarvestError> {
        self.state.lock().unwrap().navigated.push(url.to_string());
        Ok(())
    }

    async fn find_elements(&self, xpath: &str) -> Result<Vec<ElementRef>, HarvestError> {
        let mut state = self.state.lock().unwrap();
        if xpath.ends_with("//canvas") {
            state.canvas_lookups += 1;
            if state.canvas_lookups <= state.canvas_hidden_lookups {
                return Ok(Vec::new());
            }
            return Ok(state
                .canvases
                .iter()
                .map(|c| ElementRef::new(c.id.clone()))
                .collect());
        }
        if xpath.contains("z-index: 9999999") {
            let count = state
                .pointer
                .and_then(|p| state.tooltips.get(&p))
                .map(Vec::len)
                .unwrap_or(0);
            return Ok((0..count).map(|i| ElementRef::new(format!("tip-{i}"))).collect());
        }
        if xpath.starts_with("//button") && state.popup_shown {
            return Ok(vec![ElementRef::new("popup-later")]);
        }
        Ok(Vec::new())
    }

    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, HarvestError> {
        let state = self.state.lock().unwrap();
        let canvas = state
            .canvases
            .iter()
            .find(|c| c.id == element.id())
            .ok_or_else(|| no_such_element(element.id()))?;
        Ok(match name {
            "data-zr-dom-id" => canvas.render_id.clone(),
            _ => None,
        })
    }

    async fn size(&self, element: &ElementRef) -> Result<ElementSize, HarvestError> {
        let state = self.state.lock().unwrap();
        let canvas = state
            .canvases
            .iter()
            .find(|c| c.id == element.id())
            .ok_or_else(|| no_such_element(element.id()))?;
        Ok(ElementSize {
            width: canvas.width,
            height: canvas.height,
        })
    }

    async fn text(&self, element: &ElementRef) -> Result<String, HarvestError> {
        let state = self.state.lock().unwrap();
        let index: usize = element
            .id()
            .strip_prefix("tip-")
            .and_then(|i| i.parse().ok())
            .ok_or_else(|| no_such_element(element.id()))?;
        state
            .pointer
            .and_then(|p| state.tooltips.get(&p))
            .and_then(|texts| texts.get(index))
            .cloned()
            .ok_or_else(|| no_such_element(element.id()))
    }

    async fn click(&self, element: &ElementRef) -> Result<(), HarvestError> {
        let mut state = self.state.lock().unwrap();
        state.clicked.push(element.id().to_string());
        if element.id() == "popup-later" {
            state.popup_shown = false;
        }
        Ok(())
    }

    async fn hover(&self, element: &ElementRef, dx: i32, dy: i32) -> Result<(), HarvestError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_hover_at == Some((dx, dy)) {
            return Err(HarvestError::WebDriver {
                error: "move target out of bounds".to_string(),
                message: format!("({dx},{dy}) is outside the viewport"),
            });
        }
        state.pointer = Some((dx, dy));
        state.hovers.push((element.id().to_string(), dx, dy));
        Ok(())
    }

    async fn quit(&self) -> Result<(), HarvestError> {
        self.state.lock().unwrap().quit = true;
        Ok(())
    }
}
