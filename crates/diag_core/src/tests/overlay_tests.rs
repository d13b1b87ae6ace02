use super::*;
use std::sync::Mutex as StdMutex;

#[derive(Debug, Clone, PartialEq)]
enum SurfaceCall {
    Show,
    Hide,
    Fraction(f64),
    Text(String),
}

#[derive(Default)]
struct RecordingSurface {
    calls: StdMutex<Vec<SurfaceCall>>,
}

impl RecordingSurface {
    fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn fractions(&self) -> Vec<f64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SurfaceCall::Fraction(value) => Some(value),
                _ => None,
            })
            .collect()
    }
}

impl OverlaySurface for RecordingSurface {
    fn show(&self) {
        self.calls.lock().expect("calls lock").push(SurfaceCall::Show);
    }

    fn hide(&self) {
        self.calls.lock().expect("calls lock").push(SurfaceCall::Hide);
    }

    fn set_fraction(&self, fraction: f64) {
        self.calls
            .lock()
            .expect("calls lock")
            .push(SurfaceCall::Fraction(fraction));
    }

    fn set_text(&self, text: &str) {
        self.calls
            .lock()
            .expect("calls lock")
            .push(SurfaceCall::Text(text.to_string()));
    }
}

fn recorded_overlay() -> (ProgressOverlay, Arc<RecordingSurface>) {
    let surface = Arc::new(RecordingSurface::default());
    let overlay = ProgressOverlay::new(OverlayConfig::default(), Some(surface.clone()));
    (overlay, surface)
}

#[tokio::test(start_paused = true)]
async fn start_shows_overlay_with_given_message() {
    let (overlay, surface) = recorded_overlay();

    overlay.start(Some("Running network diagnostics")).await;

    let snapshot = overlay.snapshot().await;
    assert!(snapshot.is_active);
    assert!(snapshot.visible);
    assert_eq!(snapshot.fraction, 0.0);
    assert_eq!(snapshot.message, "Running network diagnostics");
    assert_eq!(
        surface.calls(),
        vec![
            SurfaceCall::Show,
            SurfaceCall::Fraction(0.0),
            SurfaceCall::Text("Running network diagnostics".into()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn start_without_message_uses_default() {
    let (overlay, _surface) = recorded_overlay();
    overlay.start(None).await;
    assert_eq!(overlay.snapshot().await.message, "Loading");
}

#[tokio::test(start_paused = true)]
async fn second_start_while_active_keeps_progress_and_message() {
    let (overlay, _surface) = recorded_overlay();

    overlay.start(Some("first caller")).await;
    overlay.update(1, 2, None).await;
    overlay.start(Some("second caller")).await;

    let snapshot = overlay.snapshot().await;
    assert_eq!(snapshot.fraction, 50.0);
    assert_eq!(snapshot.message, "first caller");
}

#[tokio::test(start_paused = true)]
async fn update_on_idle_overlay_starts_it_first() {
    let (overlay, surface) = recorded_overlay();

    overlay.update(1, 4, None).await;

    let snapshot = overlay.snapshot().await;
    assert!(snapshot.is_active);
    assert!(snapshot.visible);
    assert_eq!(snapshot.fraction, 25.0);
    assert_eq!(snapshot.message, "Loading");
    assert_eq!(surface.calls().first(), Some(&SurfaceCall::Show));
}

#[tokio::test(start_paused = true)]
async fn update_with_zero_total_only_changes_message() {
    let (overlay, _surface) = recorded_overlay();
    overlay.start(None).await;

    overlay.update(3, 0, Some("still working")).await;

    let snapshot = overlay.snapshot().await;
    assert_eq!(snapshot.fraction, 0.0);
    assert_eq!(snapshot.message, "still working");
}

#[tokio::test(start_paused = true)]
async fn update_clamps_fraction_to_one_hundred() {
    let (overlay, _surface) = recorded_overlay();
    overlay.update(5, 4, None).await;
    assert_eq!(overlay.snapshot().await.fraction, 100.0);
}

#[tokio::test(start_paused = true)]
async fn sequential_updates_are_monotonic_and_end_at_one_hundred() {
    let (overlay, _surface) = recorded_overlay();
    overlay.start(None).await;

    let total = 7;
    let mut fractions = Vec::new();
    for current in 1..=total {
        overlay.update(current, total, None).await;
        fractions.push(overlay.snapshot().await.fraction);
    }

    assert!(fractions.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(fractions.last().copied(), Some(100.0));
}

#[tokio::test(start_paused = true)]
async fn pseudo_progress_alone_never_passes_the_cap() {
    let (overlay, surface) = recorded_overlay();
    overlay.start(None).await;

    let mut previous = 0.0;
    for _ in 0..30 {
        sleep(Duration::from_millis(330)).await;
        let fraction = overlay.snapshot().await.fraction;
        assert!(fraction <= 90.0, "pseudo progress reached {fraction}");
        assert!(fraction >= previous);
        previous = fraction;
    }

    assert!(previous > 0.0);
    assert!(surface.fractions().iter().all(|value| *value <= 90.0));
}

#[tokio::test(start_paused = true)]
async fn pseudo_progress_does_not_pull_back_real_progress() {
    let (overlay, _surface) = recorded_overlay();
    overlay.start(None).await;
    overlay.update(19, 20, None).await;

    sleep(Duration::from_millis(1_050)).await;

    assert_eq!(overlay.snapshot().await.fraction, 95.0);
}

#[test]
fn pseudo_step_is_positive_and_bounded() {
    for _ in 0..1_000 {
        let step = pseudo_step(20.0);
        assert!(step > 0.0 && step <= 20.0, "step {step} out of range");
    }
    assert_eq!(pseudo_step(0.0), 0.0);
    assert_eq!(pseudo_step(f64::NAN), 0.0);
    assert_eq!(pseudo_step(f64::INFINITY), 0.0);
}

#[test]
fn sanitized_config_replaces_unusable_values() {
    let config = OverlayConfig {
        progress_tick: Duration::ZERO,
        dots_tick: Duration::ZERO,
        max_pseudo_step: f64::NAN,
        pseudo_cap: 250.0,
        ..OverlayConfig::default()
    }
    .sanitized();

    assert_eq!(config.progress_tick, Duration::from_millis(200));
    assert_eq!(config.dots_tick, Duration::from_millis(500));
    assert_eq!(config.max_pseudo_step, 0.0);
    assert_eq!(config.pseudo_cap, 100.0);
}

#[tokio::test(start_paused = true)]
async fn zero_ticks_and_bad_step_keep_animating_without_panics() {
    let overlay = ProgressOverlay::detached(OverlayConfig {
        progress_tick: Duration::ZERO,
        dots_tick: Duration::ZERO,
        max_pseudo_step: f64::INFINITY,
        ..OverlayConfig::default()
    });
    overlay.start(Some("Checking")).await;

    sleep(Duration::from_millis(520)).await;

    let snapshot = overlay.snapshot().await;
    assert!(snapshot.is_active);
    assert_eq!(snapshot.fraction, 0.0);
    assert_eq!(snapshot.text, "Checking.");
}

#[tokio::test(start_paused = true)]
async fn dots_cycle_independently_of_progress() {
    let (overlay, _surface) = recorded_overlay();
    overlay.start(Some("Checking")).await;

    sleep(Duration::from_millis(520)).await;
    assert_eq!(overlay.snapshot().await.text, "Checking.");

    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(overlay.snapshot().await.text, "Checking...");

    overlay.update(1, 2, Some("Halfway")).await;
    let snapshot = overlay.snapshot().await;
    assert_eq!(snapshot.message, "Halfway");
    assert_eq!(snapshot.text, "Halfway...");

    sleep(Duration::from_millis(500)).await;
    assert_eq!(overlay.snapshot().await.text, "Halfway");
}

#[tokio::test(start_paused = true)]
async fn done_shows_full_bar_then_hides_after_delay() {
    let (overlay, surface) = recorded_overlay();
    overlay.start(Some("Working")).await;
    overlay.update(1, 3, None).await;

    overlay.done().await;

    let finishing = overlay.snapshot().await;
    assert!(!finishing.is_active);
    assert!(finishing.visible);
    assert_eq!(finishing.fraction, 100.0);

    sleep(Duration::from_millis(350)).await;

    let idle = overlay.snapshot().await;
    assert!(!idle.is_active);
    assert!(!idle.visible);
    assert_eq!(idle.fraction, 0.0);
    assert_eq!(idle.message, "Loading");

    let calls = surface.calls();
    let full = calls
        .iter()
        .position(|call| *call == SurfaceCall::Fraction(100.0))
        .expect("full bar rendered");
    let hidden = calls
        .iter()
        .rposition(|call| *call == SurfaceCall::Hide)
        .expect("overlay hidden");
    assert!(full < hidden);
}

#[tokio::test(start_paused = true)]
async fn done_while_idle_leaves_overlay_hidden_and_empty() {
    let (overlay, surface) = recorded_overlay();

    overlay.done().await;

    let snapshot = overlay.snapshot().await;
    assert!(!snapshot.is_active);
    assert!(!snapshot.visible);
    assert_eq!(snapshot.fraction, 0.0);
    assert!(surface.calls().contains(&SurfaceCall::Hide));
}

#[tokio::test(start_paused = true)]
async fn animations_stop_after_done() {
    let (overlay, surface) = recorded_overlay();
    overlay.start(None).await;
    sleep(Duration::from_millis(450)).await;
    overlay.done().await;
    sleep(Duration::from_millis(400)).await;

    let settled = surface.calls().len();
    sleep(Duration::from_secs(3)).await;
    assert_eq!(surface.calls().len(), settled);
}

#[tokio::test(start_paused = true)]
async fn restart_during_hide_delay_is_not_hidden_by_stale_timer() {
    let (overlay, _surface) = recorded_overlay();
    overlay.start(None).await;
    overlay.done().await;

    sleep(Duration::from_millis(100)).await;
    overlay.start(Some("second session")).await;
    sleep(Duration::from_millis(400)).await;

    let snapshot = overlay.snapshot().await;
    assert!(snapshot.is_active);
    assert!(snapshot.visible);
    assert_eq!(snapshot.message, "second session");
}

#[tokio::test(start_paused = true)]
async fn detached_overlay_still_tracks_state() {
    let overlay = ProgressOverlay::detached(OverlayConfig::default());

    overlay.start(Some("no surface")).await;
    overlay.update(2, 4, None).await;
    assert_eq!(overlay.snapshot().await.fraction, 50.0);

    overlay.done().await;
    sleep(Duration::from_millis(350)).await;
    let snapshot = overlay.snapshot().await;
    assert!(!snapshot.visible);
    assert_eq!(snapshot.fraction, 0.0);
}

#[tokio::test(start_paused = true)]
async fn clones_share_one_overlay() {
    let (overlay, _surface) = recorded_overlay();
    let other_flow = overlay.clone();

    overlay.start(Some("sequence")).await;
    other_flow.start(Some("navigation")).await;

    assert!(other_flow.is_active().await);
    assert_eq!(other_flow.snapshot().await.message, "sequence");
}

#[tokio::test(start_paused = true)]
async fn mask_navigation_reopens_idle_overlay() {
    let (overlay, _surface) = recorded_overlay();
    overlay.mask_navigation().await;
    let snapshot = overlay.snapshot().await;
    assert!(snapshot.visible);
    assert_eq!(snapshot.message, "Loading");
}
