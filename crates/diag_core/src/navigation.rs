use async_trait::async_trait;
use tracing::info;

use crate::overlay::ProgressOverlay;

/// Hands the user off to another view once the sequence is over.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, destination: &str);
}

/// Re-shows the overlay before delegating, so the hand-off is covered by
/// the busy indicator. Nothing in flight is cancelled.
pub struct MaskedNavigator<N> {
    overlay: ProgressOverlay,
    inner: N,
}

impl<N: Navigator> MaskedNavigator<N> {
    pub fn new(overlay: ProgressOverlay, inner: N) -> Self {
        Self { overlay, inner }
    }
}

#[async_trait]
impl<N: Navigator> Navigator for MaskedNavigator<N> {
    async fn navigate(&self, destination: &str) {
        self.overlay.mask_navigation().await;
        info!(destination, "navigating");
        self.inner.navigate(destination).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::overlay::{OverlayConfig, ProgressReporter};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    #[async_trait]
    impl Navigator for Recorder {
        async fn navigate(&self, destination: &str) {
            self.0.lock().expect("recorder lock").push(destination.to_string());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn masked_navigation_reopens_the_overlay() {
        let overlay = ProgressOverlay::detached(OverlayConfig::default());
        overlay.start(None).await;
        overlay.done().await;

        let navigator = MaskedNavigator::new(overlay.clone(), Recorder::default());
        navigator.navigate("http://127.0.0.1:5000/vps").await;

        assert!(overlay.is_active().await);
        assert_eq!(
            navigator.inner.0.lock().unwrap().as_slice(),
            ["http://127.0.0.1:5000/vps".to_string()]
        );
    }
}
