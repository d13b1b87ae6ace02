use std::{collections::HashMap, fmt, sync::Arc};

use shared::domain::ProbeId;
use tracing::debug;

/// A per-probe status indicator.
pub trait StatusSink: Send + Sync {
    fn write(&self, text: &str);
}

/// Status sinks addressed by probe id. Writes to an unbound id are dropped.
#[derive(Clone, Default)]
pub struct StatusBoard {
    sinks: HashMap<ProbeId, Arc<dyn StatusSink>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, id: ProbeId, sink: Arc<dyn StatusSink>) -> Option<Arc<dyn StatusSink>> {
        self.sinks.insert(id, sink)
    }

    pub fn with_sink(mut self, id: impl Into<ProbeId>, sink: Arc<dyn StatusSink>) -> Self {
        self.bind(id.into(), sink);
        self
    }

    pub fn resolve(&self, id: &ProbeId) -> Option<&Arc<dyn StatusSink>> {
        self.sinks.get(id)
    }

    pub fn write(&self, id: &ProbeId, text: &str) {
        match self.resolve(id) {
            Some(sink) => sink.write(text),
            None => debug!(probe = %id, status = text, "no status sink bound"),
        }
    }
}

impl fmt::Debug for StatusBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusBoard")
            .field("bound", &self.sinks.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct LastLine(Mutex<Option<String>>);

    impl StatusSink for LastLine {
        fn write(&self, text: &str) {
            *self.0.lock().expect("sink lock") = Some(text.to_string());
        }
    }

    #[test]
    fn writes_reach_the_bound_sink_only() {
        let ping = Arc::new(LastLine::default());
        let trace = Arc::new(LastLine::default());
        let board = StatusBoard::new()
            .with_sink("ping", ping.clone())
            .with_sink("traceroute", trace.clone());

        board.write(&ProbeId::from("ping"), "Ping: running");

        assert_eq!(ping.0.lock().unwrap().as_deref(), Some("Ping: running"));
        assert_eq!(trace.0.lock().unwrap().as_deref(), None);
    }

    #[test]
    fn unbound_ids_are_ignored() {
        let board = StatusBoard::new();
        board.write(&ProbeId::from("speedtest"), "Speedtest: running");
        assert!(board.resolve(&ProbeId::from("speedtest")).is_none());
    }
}
