use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "netprobe.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub target: Option<String>,
    pub results_path: String,
    pub probe_timeout_secs: u64,
    pub quiet: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            target: None,
            results_path: "/vps".into(),
            probe_timeout_secs: 120,
            quiet: false,
        }
    }
}

impl Settings {
    /// `0` means probes may take as long as they like.
    pub fn probe_timeout(&self) -> Option<Duration> {
        (self.probe_timeout_secs > 0).then(|| Duration::from_secs(self.probe_timeout_secs))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    target: Option<String>,
    results_path: Option<String>,
    probe_timeout_secs: Option<u64>,
    quiet: Option<bool>,
}

/// Defaults, then the config file, then the environment. An explicitly
/// requested file must exist; the default one is optional.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(&path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound && config_path.is_none() => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings.server_url = normalize_server_url(&settings.server_url);
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.target {
        settings.target = non_empty(v);
    }
    if let Some(v) = file_cfg.results_path {
        settings.results_path = v;
    }
    if let Some(v) = file_cfg.probe_timeout_secs {
        settings.probe_timeout_secs = v;
    }
    if let Some(v) = file_cfg.quiet {
        settings.quiet = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let var = |names: [&str; 2]| names.into_iter().filter_map(&lookup).last();

    if let Some(v) = var(["NETPROBE_SERVER_URL", "APP__SERVER_URL"]) {
        settings.server_url = v;
    }
    if let Some(v) = var(["NETPROBE_TARGET", "APP__TARGET"]) {
        settings.target = non_empty(v);
    }
    if let Some(v) = var(["NETPROBE_RESULTS_PATH", "APP__RESULTS_PATH"]) {
        settings.results_path = v;
    }
    if let Some(v) = var(["NETPROBE_PROBE_TIMEOUT_SECS", "APP__PROBE_TIMEOUT_SECS"]) {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.probe_timeout_secs = parsed;
        }
    }
    if let Some(v) = var(["NETPROBE_QUIET", "APP__QUIET"]) {
        settings.quiet = parse_flag(&v);
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn normalize_server_url(raw_server_url: &str) -> String {
    let raw_server_url = raw_server_url.trim();

    if raw_server_url.is_empty() {
        return Settings::default().server_url;
    }

    let with_scheme = if raw_server_url.contains("://") {
        raw_server_url.to_string()
    } else {
        format!("http://{raw_server_url}")
    };

    with_scheme.trim_end_matches('/').to_string()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
