use super::{layer_settings, load_settings, normalize_api_base_url, Settings};

use std::{
    collections::HashMap,
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = layer_settings(None, env_of(&[])).expect("settings");
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.request_timeout().as_secs(), 30);
}

#[test]
fn file_values_override_defaults() {
    let raw = r#"
        api_url = "http://review.internal:9000"
        request_timeout_secs = 5
        log = "debug"
    "#;
    let settings = layer_settings(Some(raw), env_of(&[])).expect("settings");
    assert_eq!(settings.api_base_url, "http://review.internal:9000");
    assert_eq!(settings.request_timeout_secs, 5);
    assert_eq!(settings.log_filter, "debug");
}

#[test]
fn environment_overrides_file_and_app_prefix_wins() {
    let raw = r#"api_url = "http://from-file""#;
    let settings = layer_settings(
        Some(raw),
        env_of(&[
            ("PICSORT_API_URL", "http://from-picsort"),
            ("APP__API_URL", "http://from-app"),
            ("PICSORT_REQUEST_TIMEOUT_SECS", "12"),
            ("PICSORT_LOG", "warn"),
        ]),
    )
    .expect("settings");
    assert_eq!(settings.api_base_url, "http://from-app");
    assert_eq!(settings.request_timeout_secs, 12);
    assert_eq!(settings.log_filter, "warn");
}

#[test]
fn unparsable_timeout_is_ignored() {
    let settings = layer_settings(None, env_of(&[("APP__REQUEST_TIMEOUT_SECS", "soon")]))
        .expect("settings");
    assert_eq!(settings.request_timeout_secs, 30);
}

#[test]
fn malformed_file_is_an_error() {
    assert!(layer_settings(Some("api_url = "), env_of(&[])).is_err());
}

#[test]
fn explicit_config_path_must_exist() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("picsort_config_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");

    let missing = temp_root.join("missing.toml");
    assert!(load_settings(Some(missing.as_path())).is_err());

    let present = temp_root.join("picsort.toml");
    fs::write(&present, "request_timeout_secs = 7\n").expect("write config");
    let settings = load_settings(Some(present.as_path())).expect("settings");
    assert_eq!(settings.request_timeout_secs, 7);

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn normalizes_host_without_scheme() {
    assert_eq!(
        normalize_api_base_url(" localhost:8080/ ").expect("url"),
        "http://localhost:8080"
    );
}

#[test]
fn keeps_path_prefix_and_drops_trailing_slash() {
    assert_eq!(
        normalize_api_base_url("https://api.example.com/review/").expect("url"),
        "https://api.example.com/review"
    );
}

#[test]
fn empty_url_falls_back_to_default() {
    assert_eq!(
        normalize_api_base_url("   ").expect("url"),
        Settings::default().api_base_url
    );
}

#[test]
fn rejects_non_http_urls() {
    assert!(normalize_api_base_url("ftp://files.example.com").is_err());
    assert!(normalize_api_base_url("http://").is_err());
}
