use serde::{Deserialize, Serialize};

/// Body of `GET /speedtest`.
///
/// The server reports either figures or an `error` string; both arrive with
/// an HTTP success status. Older servers spell the throughput fields with an
/// `_mbps` suffix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedtestReport {
    #[serde(default, alias = "download_mbps", skip_serializing_if = "Option::is_none")]
    pub download: Option<f64>,
    #[serde(default, alias = "upload_mbps", skip_serializing_if = "Option::is_none")]
    pub upload: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SpeedtestReport {
    /// In-payload failure reported by the server despite a successful call.
    pub fn soft_error(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.trim().is_empty())
    }
}
