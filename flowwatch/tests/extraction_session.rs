mod common;

use common::{fast_target, setup_logging, Canvas, ScriptedEngine};
use flowwatch::session::dismiss_onboarding;
use flowwatch::{ChartPoint, ElementRef, ExtractionSession, HarvestError, PopupDismissal};
use std::time::Duration;

#[tokio::test]
async fn test_locate_picks_canvas_matching_renderer_and_size() {
    setup_logging();
    let engine = ScriptedEngine::with_canvases(vec![
        Canvas::new("c-small", "zr_0", 300.0, 100.0),
        Canvas::new("c-other", "zr_1", 468.0, 184.0),
        Canvas::new("c-chart", "zr_0", 468.0, 184.0),
        Canvas::new("c-twin", "zr_0", 468.0, 184.0),
    ]);

    let session = ExtractionSession::locate(Box::new(engine.clone()), &fast_target(Duration::from_secs(1)))
        .await
        .expect("chart should be located");

    // First candidate satisfying both predicates wins
    assert_eq!(session.chart(), &ElementRef::new("c-chart"));
    assert!(!engine.is_quit());
}

#[tokio::test]
async fn test_locate_waits_for_chart_to_render() {
    let engine = ScriptedEngine::dashboard();
    engine.state.lock().unwrap().canvas_hidden_lookups = 2;

    let session = ExtractionSession::locate(Box::new(engine.clone()), &fast_target(Duration::from_secs(5)))
        .await
        .expect("chart appears after two polls");

    assert_eq!(session.chart(), &ElementRef::new("c-chart"));
    assert_eq!(engine.state.lock().unwrap().canvas_lookups, 3);
}

#[tokio::test]
async fn test_locate_fails_when_no_candidate_matches() {
    let engine = ScriptedEngine::with_canvases(vec![
        Canvas::new("c-other", "zr_1", 468.0, 184.0),
        Canvas::new("c-resized", "zr_0", 470.0, 184.0),
    ]);

    let result =
        ExtractionSession::locate(Box::new(engine.clone()), &fast_target(Duration::from_millis(200))).await;

    match result {
        Err(HarvestError::ElementNotFound(msg)) => {
            assert!(msg.contains("zr_0"), "unexpected message: {msg}");
            assert!(msg.contains("468x184"), "unexpected message: {msg}");
        }
        other => panic!("Expected ElementNotFound, got {other:?}"),
    }
    // The session is released on setup failure
    assert!(engine.is_quit());
}

#[tokio::test]
async fn test_hover_and_read_returns_first_non_empty_tooltip() {
    let engine = ScriptedEngine::dashboard()
        .tooltip(-100, 40, &["   ", "\n Tăng: 1.234 tỷ \n", "ignored"])
        .tooltip(180, 0, &["", ""]);
    let mut session =
        ExtractionSession::locate(Box::new(engine.clone()), &fast_target(Duration::from_secs(1)))
            .await
            .unwrap();

    let text = session.hover_and_read(ChartPoint::new(-100, 40)).await.unwrap();
    assert_eq!(text, "Tăng: 1.234 tỷ");

    // Blank overlays and no overlay at all both read as empty
    assert_eq!(session.hover_and_read(ChartPoint::new(180, 0)).await.unwrap(), "");
    assert_eq!(session.hover_and_read(ChartPoint::new(-20, 40)).await.unwrap(), "");

    let hovers = engine.state.lock().unwrap().hovers.clone();
    assert_eq!(hovers.len(), 3);
    assert!(hovers.iter().all(|(element, _, _)| element == "c-chart"));
}

#[tokio::test]
async fn test_hover_error_is_not_swallowed() {
    let engine = ScriptedEngine::dashboard();
    engine.state.lock().unwrap().fail_hover_at = Some((180, 0));
    let mut session =
        ExtractionSession::locate(Box::new(engine.clone()), &fast_target(Duration::from_secs(1)))
            .await
            .unwrap();

    let err = session
        .hover_and_read(ChartPoint::new(180, 0))
        .await
        .expect_err("hover outside the viewport must fail");
    assert!(matches!(err, HarvestError::WebDriver { ref error, .. } if error == "move target out of bounds"));
}

#[tokio::test]
async fn test_open_navigates_dismisses_popup_and_locates() {
    let engine = ScriptedEngine::dashboard();
    engine.state.lock().unwrap().popup_shown = true;
    let popup = PopupDismissal {
        timeout: Duration::from_millis(100),
        ..PopupDismissal::default()
    };

    let session = ExtractionSession::open(
        Box::new(engine.clone()),
        "https://fireant.vn/dashboard",
        &popup,
        &fast_target(Duration::from_secs(1)),
    )
    .await
    .unwrap();

    let state = engine.state.lock().unwrap();
    assert_eq!(state.navigated, vec!["https://fireant.vn/dashboard"]);
    assert_eq!(state.clicked, vec!["popup-later"]);
    assert!(!state.popup_shown);
    assert_eq!(session.chart(), &ElementRef::new("c-chart"));
}

#[tokio::test]
async fn test_missing_popup_is_tolerated() {
    let engine = ScriptedEngine::dashboard();
    let popup = PopupDismissal {
        timeout: Duration::from_millis(50),
        ..PopupDismissal::default()
    };

    assert!(!dismiss_onboarding(&engine, &popup).await);
    assert!(engine.state.lock().unwrap().clicked.is_empty());
}

#[tokio::test]
async fn test_close_releases_browser() {
    let engine = ScriptedEngine::dashboard();
    let session = ExtractionSession::locate(Box::new(engine.clone()), &fast_target(Duration::from_secs(1)))
        .await
        .unwrap();

    session.close().await.unwrap();
    assert!(engine.is_quit());
}
