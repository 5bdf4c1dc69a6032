use std::sync::Mutex;

use tempfile::NamedTempFile;

use wastewatch::config::WatchConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "WASTEWATCH_CONFIG",
        "WASTEWATCH_DB_PATH",
        "WASTEWATCH_ARTIFACT_DIR",
        "WASTEWATCH_SOURCE_URI",
        "WASTEWATCH_DEFAULT_THRESHOLD",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "db_path": "waste_prod.db",
        "artifact_dir": "prod_artifacts",
        "source": {
            "uri": "dir://frames",
            "target_fps": 12,
            "width": 800,
            "height": 600
        },
        "thresholds": {
            "default": 0.6,
            "overrides": { "botol kaca": 0.3 }
        },
        "detector": {
            "backend": "stub",
            "labels": ["plastik", "kardus", "botol kaca"]
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("WASTEWATCH_CONFIG", file.path());
    std::env::set_var("WASTEWATCH_DB_PATH", "override.db");
    std::env::set_var("WASTEWATCH_DEFAULT_THRESHOLD", "0.45");

    let cfg = WatchConfig::load().expect("load config");

    assert_eq!(cfg.db_path, "override.db");
    assert_eq!(cfg.artifact_dir, "prod_artifacts");
    assert_eq!(cfg.source.uri, "dir://frames");
    assert_eq!(cfg.source.target_fps, 12);
    assert_eq!(cfg.source.width, 800);
    assert_eq!(cfg.source.height, 600);
    assert_eq!(cfg.thresholds.default, 0.45);
    assert_eq!(cfg.thresholds.overrides.get("botol kaca"), Some(&0.3));
    assert_eq!(cfg.detector.backend, "stub");
    assert_eq!(cfg.detector.labels.len(), 3);

    clear_env();
}

#[test]
fn defaults_apply_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = WatchConfig::load().expect("load config");

    assert_eq!(cfg.db_path, "wastewatch.db");
    assert_eq!(cfg.artifact_dir, "artifacts");
    assert_eq!(cfg.source.uri, "stub://camera");
    assert_eq!(cfg.source.target_fps, 10);
    assert_eq!(cfg.source.width, 640);
    assert_eq!(cfg.source.height, 480);
    assert_eq!(cfg.thresholds.default, 0.5);
    assert!(cfg.thresholds.overrides.is_empty());
    assert_eq!(cfg.detector.backend, "stub");

    let policy = cfg.threshold_policy().expect("policy");
    assert!(policy.passes("plastik", 0.5));
    assert!(!policy.passes("plastik", 0.49));

    clear_env();
}

#[test]
fn rejects_out_of_range_threshold_override() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{ "thresholds": { "overrides": { "kardus": 1.5 } } }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("WASTEWATCH_CONFIG", file.path());

    assert!(WatchConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_unknown_detector_backend() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{ "detector": { "backend": "darknet" } }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("WASTEWATCH_CONFIG", file.path());

    assert!(WatchConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_zero_fps() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{ "source": { "target_fps": 0 } }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("WASTEWATCH_CONFIG", file.path());

    assert!(WatchConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_unparseable_threshold_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("WASTEWATCH_DEFAULT_THRESHOLD", "very high");
    assert!(WatchConfig::load().is_err());

    clear_env();
}
