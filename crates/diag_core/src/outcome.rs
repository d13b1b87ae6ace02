use serde::Serialize;
use shared::{
    error::{FailureRecord, ProbeError},
    protocol::SpeedtestReport,
};

use crate::probes::ProbePayload;

/// How a single probe ended, as shown to the user.
///
/// `Degraded` is a successful call whose payload reports an error. `Failed`
/// is a call that never produced a usable payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Succeeded { details: Option<String> },
    Degraded { error: String },
    Failed { failure: FailureRecord },
}

impl ProbeOutcome {
    pub fn from_result(result: Result<ProbePayload, ProbeError>) -> Self {
        match result {
            Ok(ProbePayload::Text(text)) => ProbeOutcome::Succeeded {
                details: text_details(&text),
            },
            Ok(ProbePayload::Throughput(report)) => match report.soft_error() {
                Some(error) => ProbeOutcome::Degraded {
                    error: error.trim().to_string(),
                },
                None => ProbeOutcome::Succeeded {
                    details: throughput_details(&report),
                },
            },
            Err(err) => ProbeOutcome::Failed {
                failure: FailureRecord::from(&err),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ProbeOutcome::Failed { .. })
    }

    pub fn status_line(&self, label: &str) -> String {
        match self {
            ProbeOutcome::Succeeded {
                details: Some(details),
            } => format!("{label}: done ({details})"),
            ProbeOutcome::Succeeded { details: None } => format!("{label}: done"),
            ProbeOutcome::Degraded { error } => format!("{label}: done (error: {error})"),
            ProbeOutcome::Failed { .. } => format!("{label}: failed"),
        }
    }
}

pub fn running_line(label: &str) -> String {
    format!("{label}: running")
}

fn text_details(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn throughput_details(report: &SpeedtestReport) -> Option<String> {
    let figures: Vec<String> = [
        report.download.map(|v| format!("download {v:.2} Mbps")),
        report.upload.map(|v| format!("upload {v:.2} Mbps")),
        report.ping_ms.map(|v| format!("ping {v:.2} ms")),
        report.jitter_ms.map(|v| format!("jitter {v:.2} ms")),
    ]
    .into_iter()
    .flatten()
    .collect();

    (!figures.is_empty()).then(|| figures.join(", "))
}
