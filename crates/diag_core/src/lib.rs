//! Network diagnostics engine: a shared progress overlay and a sequencer that
//! runs an ordered list of probes against the diagnostics server, reporting
//! per-probe status and overall progress as it goes.

pub mod navigation;
pub mod outcome;
pub mod overlay;
pub mod probes;
pub mod sequencer;
pub mod status;

pub use navigation::{MaskedNavigator, Navigator};
pub use outcome::ProbeOutcome;
pub use overlay::{
    OverlayConfig, OverlaySnapshot, OverlaySurface, ProgressOverlay, ProgressReporter,
};
pub use probes::{
    CatalogError, FnProbe, HttpProbe, ProbeCatalog, ProbeInvoker, ProbePayload, ProbeSpec,
    ResponseShape,
};
pub use sequencer::{
    ProbeRecord, ProbeSequencer, ProbeSequencerBuilder, SequenceMessages, SequenceReport,
    SequencerError,
};
pub use status::{StatusBoard, StatusSink};
