//! Shared busy indicator: a progress bar plus a headline, driven by whoever
//! is currently doing asynchronous work.
//!
//! The overlay is a cheap, clonable handle. Every clone drives the same
//! state, and `start` is idempotent while a session is active so a second
//! caller cannot reset progress halfway through someone else's work.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use async_trait::async_trait;
use rand::Rng;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{interval_at, sleep, Instant},
};
use tracing::debug;

const DEFAULT_PROGRESS_TICK: Duration = Duration::from_millis(200);
const DEFAULT_MAX_PSEUDO_STEP: f64 = 20.0;
/// The last stretch of the bar is reserved for real completion signals.
const DEFAULT_PSEUDO_CAP: f64 = 90.0;
const DEFAULT_DOTS_TICK: Duration = Duration::from_millis(500);
const DEFAULT_HIDE_DELAY: Duration = Duration::from_millis(300);
const DEFAULT_MESSAGE: &str = "Loading";
const MAX_DOTS: usize = 3;

/// Rendering target for the overlay. Implementations must be cheap; they are
/// called while the overlay state is locked.
pub trait OverlaySurface: Send + Sync {
    fn show(&self);
    fn hide(&self);
    fn set_fraction(&self, fraction: f64);
    fn set_text(&self, text: &str);
}

/// The control surface the sequencer (or any other flow) drives.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn start(&self, message: Option<&str>);
    async fn update(&self, current: usize, total: usize, message: Option<&str>);
    async fn done(&self);
}

#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub progress_tick: Duration,
    pub max_pseudo_step: f64,
    pub pseudo_cap: f64,
    pub dots_tick: Duration,
    pub hide_delay: Duration,
    pub default_message: String,
}

impl OverlayConfig {
    /// Replaces values the animation tasks cannot run with: zero ticks fall
    /// back to the defaults, an unusable step disables pseudo progress and
    /// the cap is kept inside `0..=100`.
    pub fn sanitized(mut self) -> Self {
        if self.progress_tick.is_zero() {
            self.progress_tick = DEFAULT_PROGRESS_TICK;
        }
        if self.dots_tick.is_zero() {
            self.dots_tick = DEFAULT_DOTS_TICK;
        }
        if !self.max_pseudo_step.is_finite() || self.max_pseudo_step < 0.0 {
            self.max_pseudo_step = 0.0;
        }
        self.pseudo_cap = if self.pseudo_cap.is_finite() {
            self.pseudo_cap.clamp(0.0, 100.0)
        } else {
            DEFAULT_PSEUDO_CAP
        };
        self
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            progress_tick: DEFAULT_PROGRESS_TICK,
            max_pseudo_step: DEFAULT_MAX_PSEUDO_STEP,
            pseudo_cap: DEFAULT_PSEUDO_CAP,
            dots_tick: DEFAULT_DOTS_TICK,
            hide_delay: DEFAULT_HIDE_DELAY,
            default_message: DEFAULT_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySnapshot {
    pub is_active: bool,
    pub fraction: f64,
    /// Base headline without the animated dots.
    pub message: String,
    /// What the surface currently shows, dots included.
    pub text: String,
    pub visible: bool,
}

struct OverlayState {
    is_active: bool,
    fraction: f64,
    message: String,
    dots: usize,
    visible: bool,
    /// Bumped on every activation so a stale delayed hide can tell it lost.
    generation: u64,
    progress_task: Option<JoinHandle<()>>,
    dots_task: Option<JoinHandle<()>>,
    hide_task: Option<JoinHandle<()>>,
}

impl OverlayState {
    fn idle(default_message: &str) -> Self {
        Self {
            is_active: false,
            fraction: 0.0,
            message: default_message.to_string(),
            dots: 0,
            visible: false,
            generation: 0,
            progress_task: None,
            dots_task: None,
            hide_task: None,
        }
    }

    fn text(&self) -> String {
        format!("{}{}", self.message, ".".repeat(self.dots))
    }

    fn stop_animations(&mut self) {
        if let Some(task) = self.progress_task.take() {
            task.abort();
        }
        if let Some(task) = self.dots_task.take() {
            task.abort();
        }
    }
}

struct OverlayInner {
    config: OverlayConfig,
    surface: Option<Arc<dyn OverlaySurface>>,
    state: Mutex<OverlayState>,
}

impl OverlayInner {
    fn render(&self, paint: impl FnOnce(&dyn OverlaySurface)) {
        if let Some(surface) = &self.surface {
            paint(surface.as_ref());
        }
    }

    fn reset_idle(&self, state: &mut OverlayState) {
        state.is_active = false;
        state.fraction = 0.0;
        state.message = self.config.default_message.clone();
        state.dots = 0;
        state.visible = false;
        let text = state.text();
        self.render(|surface| {
            surface.hide();
            surface.set_fraction(0.0);
            surface.set_text(&text);
        });
    }

    async fn advance_pseudo_progress(&self) {
        let step = pseudo_step(self.config.max_pseudo_step);
        let mut state = self.state.lock().await;
        if !state.is_active || state.fraction >= self.config.pseudo_cap {
            return;
        }
        state.fraction = (state.fraction + step).min(self.config.pseudo_cap);
        let fraction = state.fraction;
        self.render(|surface| surface.set_fraction(fraction));
    }

    async fn cycle_dots(&self) {
        let mut state = self.state.lock().await;
        if !state.is_active {
            return;
        }
        state.dots = (state.dots + 1) % (MAX_DOTS + 1);
        let text = state.text();
        self.render(|surface| surface.set_text(&text));
    }

    async fn finish_hide(&self, generation: u64) {
        let mut state = self.state.lock().await;
        if state.generation != generation || state.is_active {
            return;
        }
        state.hide_task = None;
        self.reset_idle(&mut state);
        debug!("overlay hidden");
    }
}

impl Drop for OverlayInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        state.stop_animations();
        if let Some(task) = state.hide_task.take() {
            task.abort();
        }
    }
}

/// A random step in `(0, max_step]`, or zero when stepping is disabled.
fn pseudo_step(max_step: f64) -> f64 {
    if !max_step.is_finite() || max_step <= 0.0 {
        return 0.0;
    }
    rand::rng().random_range(f64::MIN_POSITIVE.min(max_step)..=max_step)
}

/// Runs `tick` on every period until the overlay is dropped or the task is
/// aborted. Only a weak reference is held so the task never keeps the
/// overlay alive.
fn spawn_repeating<F, Fut>(inner: &Arc<OverlayInner>, period: Duration, tick: F) -> JoinHandle<()>
where
    F: Fn(Arc<OverlayInner>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let weak: Weak<OverlayInner> = Arc::downgrade(inner);
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        loop {
            interval.tick().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };
            tick(inner).await;
        }
    })
}

#[derive(Clone)]
pub struct ProgressOverlay {
    inner: Arc<OverlayInner>,
}

impl ProgressOverlay {
    pub fn new(config: OverlayConfig, surface: Option<Arc<dyn OverlaySurface>>) -> Self {
        let config = config.sanitized();
        let state = OverlayState::idle(&config.default_message);
        Self {
            inner: Arc::new(OverlayInner {
                config,
                surface,
                state: Mutex::new(state),
            }),
        }
    }

    /// An overlay with no bound surface. State is tracked, nothing renders.
    pub fn detached(config: OverlayConfig) -> Self {
        Self::new(config, None)
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.inner.config
    }

    pub async fn snapshot(&self) -> OverlaySnapshot {
        let state = self.inner.state.lock().await;
        OverlaySnapshot {
            is_active: state.is_active,
            fraction: state.fraction,
            message: state.message.clone(),
            text: state.text(),
            visible: state.visible,
        }
    }

    pub async fn is_active(&self) -> bool {
        self.inner.state.lock().await.is_active
    }

    /// Re-shows the overlay while the caller hands off to another view.
    /// Nothing in flight is cancelled.
    pub async fn mask_navigation(&self) {
        self.start(None).await;
    }

    fn activate(&self, state: &mut OverlayState, message: Option<&str>) {
        let config = &self.inner.config;
        if let Some(task) = state.hide_task.take() {
            task.abort();
        }
        state.stop_animations();

        state.generation = state.generation.wrapping_add(1);
        state.is_active = true;
        state.fraction = 0.0;
        state.message = message
            .map(str::to_string)
            .unwrap_or_else(|| config.default_message.clone());
        state.dots = 0;
        state.visible = true;

        let text = state.text();
        self.inner.render(|surface| {
            surface.show();
            surface.set_fraction(0.0);
            surface.set_text(&text);
        });

        state.progress_task = Some(spawn_repeating(
            &self.inner,
            config.progress_tick,
            |inner| async move { inner.advance_pseudo_progress().await },
        ));
        state.dots_task = Some(spawn_repeating(
            &self.inner,
            config.dots_tick,
            |inner| async move { inner.cycle_dots().await },
        ));
        debug!(message = %state.message, "overlay started");
    }
}

#[async_trait]
impl ProgressReporter for ProgressOverlay {
    async fn start(&self, message: Option<&str>) {
        let mut state = self.inner.state.lock().await;
        if state.is_active {
            debug!("overlay already active; start ignored");
            return;
        }
        self.activate(&mut state, message);
    }

    async fn update(&self, current: usize, total: usize, message: Option<&str>) {
        let mut state = self.inner.state.lock().await;
        if !state.is_active {
            self.activate(&mut state, None);
        }

        if total > 0 {
            state.fraction = (100.0 * current as f64 / total as f64).min(100.0);
            let fraction = state.fraction;
            self.inner.render(|surface| surface.set_fraction(fraction));
        }

        if let Some(message) = message {
            state.message = message.to_string();
            let text = state.text();
            self.inner.render(|surface| surface.set_text(&text));
        }
    }

    async fn done(&self) {
        let mut state = self.inner.state.lock().await;
        state.stop_animations();

        if !state.is_active {
            if let Some(task) = state.hide_task.take() {
                task.abort();
            }
            self.inner.reset_idle(&mut state);
            return;
        }

        state.is_active = false;
        state.fraction = 100.0;
        self.inner.render(|surface| surface.set_fraction(100.0));

        let generation = state.generation;
        let delay = self.inner.config.hide_delay;
        let weak = Arc::downgrade(&self.inner);
        state.hide_task = Some(tokio::spawn(async move {
            sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.finish_hide(generation).await;
            }
        }));
        debug!("overlay done");
    }
}

#[cfg(test)]
#[path = "tests/overlay_tests.rs"]
mod tests;
