use mediawatch_core::config::Config;
use std::io::Write;

fn with_env_vars<F, T>(vars: &[(&str, &str)], f: F) -> T
where
    F: FnOnce() -> T,
{
    for (key, value) in vars {
        std::env::set_var(key, value);
    }
    let result = f();
    for (key, _) in vars {
        std::env::remove_var(key);
    }
    result
}

#[test]
fn test_environment_overrides_file_values() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(
        br#"
        [monitor]
        scan_interval_secs = 300

        [emby]
        server_url = "http://localhost:8096"
        api_key = "from-file"

        [[roots]]
        path = "/media/movies"
        library_id = "M"
    "#,
    )
    .unwrap();
    file.flush().unwrap();

    let config = with_env_vars(
        &[
            ("MEDIAWATCH_MONITOR__SCAN_INTERVAL_SECS", "900"),
            ("MEDIAWATCH_MONITOR__VIDEO_EXTENSIONS", "mkv,mp4"),
            ("EMBY_API_KEY", "from-env"),
            ("TELEGRAM_BOT_TOKEN", "1:token"),
            ("TELEGRAM_CHAT_ID", "99"),
        ],
        || Config::from_file(file.path()),
    )
    .unwrap();

    assert_eq!(config.monitor.scan_interval_secs, 900);
    assert_eq!(
        config.monitor.video_extensions,
        vec!["mkv".to_string(), "mp4".to_string()]
    );
    assert_eq!(config.emby.api_key, "from-env");
    assert!(config.telegram.is_configured());
    assert!(config.validate().is_ok());
}

#[test]
fn test_prefixed_variables_reach_nested_sections() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(
        br#"
        [emby]
        server_url = "http://localhost:8096"
        api_key = "from-file"
    "#,
    )
    .unwrap();
    file.flush().unwrap();

    let config = with_env_vars(&[("MEDIAWATCH_EMBY__TIMEOUT_SECS", "45")], || {
        Config::from_file(file.path())
    })
    .unwrap();
    assert_eq!(config.emby.timeout_secs, 45);
}

#[test]
fn test_missing_file_without_required_sections_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let result = Config::from_file(&dir.path().join("absent.toml"));
    // [emby] has no defaults for server_url
    assert!(result.is_err());
}
