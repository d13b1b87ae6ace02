use std::{fmt, future::Future, sync::Arc};

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{ProbeId, ProbeKind},
    error::ProbeError,
    protocol::SpeedtestReport,
};
use thiserror::Error;
use url::Url;

/// Successful response of a probe endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbePayload {
    Text(String),
    Throughput(SpeedtestReport),
}

#[async_trait]
pub trait ProbeInvoker: Send + Sync {
    async fn invoke(&self) -> Result<ProbePayload, ProbeError>;
}

/// Adapts an async closure into a [`ProbeInvoker`].
pub struct FnProbe<F>(pub F);

#[async_trait]
impl<F, Fut> ProbeInvoker for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<ProbePayload, ProbeError>> + Send + 'static,
{
    async fn invoke(&self) -> Result<ProbePayload, ProbeError> {
        (self.0)().await
    }
}

#[derive(Clone)]
pub struct ProbeSpec {
    pub id: ProbeId,
    pub label: String,
    pub invoker: Arc<dyn ProbeInvoker>,
}

impl ProbeSpec {
    pub fn new(
        id: impl Into<ProbeId>,
        label: impl Into<String>,
        invoker: impl ProbeInvoker + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            invoker: Arc::new(invoker),
        }
    }

    pub fn from_fn<F, Fut>(id: impl Into<ProbeId>, label: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ProbePayload, ProbeError>> + Send + 'static,
    {
        Self::new(id, label, FnProbe(f))
    }
}

impl fmt::Debug for ProbeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeSpec")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Text,
    Throughput,
}

impl From<ProbeKind> for ResponseShape {
    fn from(kind: ProbeKind) -> Self {
        match kind {
            ProbeKind::Ping | ProbeKind::Traceroute => ResponseShape::Text,
            ProbeKind::Speedtest => ResponseShape::Throughput,
        }
    }
}

/// One `GET` against a probe endpoint of the diagnostics server.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    http: Client,
    url: Url,
    shape: ResponseShape,
}

impl HttpProbe {
    pub fn new(http: Client, url: Url, shape: ResponseShape) -> Self {
        Self { http, url, shape }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ProbeInvoker for HttpProbe {
    async fn invoke(&self) -> Result<ProbePayload, ProbeError> {
        let response = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .map_err(probe_error)?
            .error_for_status()
            .map_err(probe_error)?;

        match self.shape {
            ResponseShape::Text => Ok(ProbePayload::Text(
                response.text().await.map_err(probe_error)?,
            )),
            ResponseShape::Throughput => {
                let report: SpeedtestReport = response.json().await.map_err(probe_error)?;
                Ok(ProbePayload::Throughput(report))
            }
        }
    }
}

fn probe_error(err: reqwest::Error) -> ProbeError {
    if let Some(status) = err.status() {
        return ProbeError::Status(status.as_u16());
    }
    if err.is_decode() {
        return ProbeError::Decode(err.to_string());
    }
    ProbeError::Transport(err.to_string())
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid server url: {0}")]
    InvalidServerUrl(#[from] url::ParseError),
    #[error("server url cannot carry a path: {0}")]
    CannotBeABase(String),
    #[error("{0:?} probe needs a target address")]
    MissingTarget(ProbeKind),
}

/// Builds probe specs for the endpoints of one diagnostics server.
#[derive(Debug, Clone)]
pub struct ProbeCatalog {
    http: Client,
    base: Url,
}

impl ProbeCatalog {
    pub fn new(server_url: &str) -> Result<Self, CatalogError> {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> Result<Self, CatalogError> {
        let base = Url::parse(server_url)?;
        if base.cannot_be_a_base() {
            return Err(CatalogError::CannotBeABase(server_url.to_string()));
        }
        Ok(Self { http, base })
    }

    /// Appends `segments` to the server url, percent-encoding each one.
    fn join(&self, segments: &[&str]) -> Result<Url, CatalogError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| CatalogError::CannotBeABase(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn endpoint(&self, kind: ProbeKind, target: Option<&str>) -> Result<Url, CatalogError> {
        let name = kind.id();
        if !kind.needs_target() {
            return self.join(&[name.as_str()]);
        }
        let target = target
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(CatalogError::MissingTarget(kind))?;
        self.join(&[name.as_str(), target])
    }

    pub fn spec(&self, kind: ProbeKind, target: Option<&str>) -> Result<ProbeSpec, CatalogError> {
        let url = self.endpoint(kind, target)?;
        Ok(ProbeSpec::new(
            kind.id(),
            kind.label(),
            HttpProbe::new(self.http.clone(), url, kind.into()),
        ))
    }

    /// Ping, traceroute and speedtest, in that order. Without a target only
    /// the speedtest can run.
    pub fn standard(&self, target: Option<&str>) -> Result<Vec<ProbeSpec>, CatalogError> {
        let has_target = target.is_some_and(|t| !t.trim().is_empty());
        ProbeKind::ALL
            .into_iter()
            .filter(|kind| has_target || !kind.needs_target())
            .map(|kind| self.spec(kind, target))
            .collect()
    }

    /// Where the user lands once the sequence is over.
    pub fn results_url(&self, path: &str) -> Result<Url, CatalogError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.join(&segments)
    }
}

#[cfg(test)]
#[path = "tests/probes_tests.rs"]
mod tests;
