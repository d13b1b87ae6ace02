use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn normalizes_bare_host_to_http_url() {
    assert_eq!(
        normalize_server_url("diag.example.com:5000/"),
        "http://diag.example.com:5000"
    );
}

#[test]
fn keeps_explicit_scheme_and_strips_trailing_slashes() {
    assert_eq!(
        normalize_server_url(" https://diag.example.com/tools// "),
        "https://diag.example.com/tools"
    );
}

#[test]
fn empty_server_url_falls_back_to_default() {
    assert_eq!(normalize_server_url("   "), Settings::default().server_url);
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
server_url = "http://10.0.0.2:8080"
target = "1.1.1.1"
probe_timeout_secs = 30
quiet = true
"#,
    )
    .expect("valid file");

    assert_eq!(settings.server_url, "http://10.0.0.2:8080");
    assert_eq!(settings.target.as_deref(), Some("1.1.1.1"));
    assert_eq!(settings.results_path, "/vps");
    assert_eq!(settings.probe_timeout(), Some(Duration::from_secs(30)));
    assert!(settings.quiet);
}

#[test]
fn malformed_file_is_an_error() {
    let mut settings = Settings::default();
    assert!(apply_file(&mut settings, "probe_timeout_secs = \"soon\"").is_err());
}

#[test]
fn app_prefixed_env_wins_over_plain_env() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_from(&[
            ("NETPROBE_SERVER_URL", "http://plain:1"),
            ("APP__SERVER_URL", "http://prefixed:2"),
            ("NETPROBE_TARGET", "  "),
            ("NETPROBE_QUIET", "yes"),
        ]),
    );

    assert_eq!(settings.server_url, "http://prefixed:2");
    assert_eq!(settings.target, None);
    assert!(settings.quiet);
}

#[test]
fn unparsable_timeout_keeps_previous_value() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_from(&[("NETPROBE_PROBE_TIMEOUT_SECS", "forever")]),
    );
    assert_eq!(settings.probe_timeout_secs, 120);
}

#[test]
fn zero_timeout_disables_the_bound() {
    let settings = Settings {
        probe_timeout_secs: 0,
        ..Settings::default()
    };
    assert_eq!(settings.probe_timeout(), None);
}

#[test]
fn explicit_missing_config_file_is_an_error() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let missing = env::temp_dir().join(format!("netprobe_missing_{suffix}.toml"));

    let err = load_settings(Some(&missing)).expect_err("file does not exist");
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
fn loads_and_normalizes_explicit_config_file() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("netprobe_config_test_{suffix}.toml"));
    fs::write(&path, "server_url = \"diag.internal:5000/\"\n").expect("write config");

    let settings = load_settings(Some(&path)).expect("load settings");

    if env::var("NETPROBE_SERVER_URL").is_err() && env::var("APP__SERVER_URL").is_err() {
        assert_eq!(settings.server_url, "http://diag.internal:5000");
    }

    fs::remove_file(path).expect("cleanup");
}
