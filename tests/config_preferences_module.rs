use finacrew::config::{load_preferences, load_settings, save_preferences, Preferences, Settings};
use finacrew::runtime::{bootstrap_state_root, StatePaths, DEFAULT_STATE_ROOT_DIR};
use finacrew::wizard::configuration::{ConfigDraft, TuningField, PRETESTED_MODEL};
use finacrew::wizard::WizardOptions;
use std::fs;
use tempfile::tempdir;

fn state_paths() -> (tempfile::TempDir, StatePaths) {
    let temp = tempdir().expect("tempdir");
    let paths = StatePaths::new(temp.path().join(DEFAULT_STATE_ROOT_DIR));
    bootstrap_state_root(&paths).expect("bootstrap");
    (temp, paths)
}

#[test]
fn config_preferences_module_never_writes_the_api_key() {
    let (_temp, paths) = state_paths();
    let mut draft = ConfigDraft::default();
    draft.set_api_key("gsk_super_secret_value").expect("key");
    draft.set_model("qwen/qwen3-32b").expect("model");
    draft
        .edit_tuning(TuningField::RequestDelay, 5)
        .expect("delay");

    let path = save_preferences(&paths, &draft.to_preferences()).expect("save");

    let raw = fs::read_to_string(path).expect("read back");
    assert!(!raw.contains("gsk_super_secret_value"));
    assert!(!raw.to_lowercase().contains("api"));
    assert!(raw.contains("qwen/qwen3-32b"));

    let mut restored = ConfigDraft::default();
    restored.apply_preferences(&load_preferences(&paths).expect("load"));
    assert_eq!(restored.model, "qwen/qwen3-32b");
    assert_eq!(restored.request_delay, 5);
    assert!(restored.api_key.is_empty());
}

#[test]
fn config_preferences_module_clamps_and_filters_restored_values() {
    let prefs = Preferences {
        model: Some("not-a-model".to_string()),
        request_delay: Some(99),
        request_timeout: Some(5),
        max_retries: None,
    };
    let mut draft = ConfigDraft::default();

    draft.apply_preferences(&prefs);

    assert_eq!(draft.model, ConfigDraft::default().model);
    assert_eq!(draft.request_delay, 10);
    assert_eq!(draft.request_timeout, 30);
    assert_eq!(draft.max_retries, 3);
}

#[test]
fn config_preferences_module_default_toggle_locks_and_restores() {
    let mut draft = ConfigDraft::default();
    draft.set_api_key("gsk_mine_0000000000").expect("key");
    draft
        .edit_tuning(TuningField::MaxRetries, 7)
        .expect("retries");

    draft
        .set_use_default_with_key(true, Some("gsk_env_default_key".to_string()))
        .expect("enable default");
    assert!(draft.use_default());
    assert_eq!(draft.model, PRETESTED_MODEL);
    assert!(draft.set_api_key("other").is_err());
    assert!(draft.edit_tuning(TuningField::MaxRetries, 2).is_err());

    draft
        .set_use_default_with_key(false, None)
        .expect("disable default");
    assert_eq!(draft.api_key, "gsk_mine_0000000000");
    assert_eq!(draft.max_retries, 7);
}

#[test]
fn config_preferences_module_settings_file_drives_wizard_options() {
    let (_temp, paths) = state_paths();
    fs::write(
        paths.settings_file(),
        "backend_url: http://finacrew.local:5001\nrequired_files:\n  - ATIVOS.xlsx\nauto_advance_min_files: 1\n",
    )
    .expect("write settings");

    let settings = load_settings(&paths).expect("load");
    let options = WizardOptions::from_settings(&settings);

    assert_eq!(settings.backend_url, "http://finacrew.local:5001");
    assert_eq!(options.roster.len(), 1);
    assert_eq!(options.auto_advance_min_files, Some(1));
    assert_eq!(settings.max_upload_bytes, Settings::default().max_upload_bytes);
}

#[test]
fn config_preferences_module_rejects_invalid_settings_file() {
    let (_temp, paths) = state_paths();
    fs::write(paths.settings_file(), "backend_url: localhost\n").expect("write settings");

    let err = load_settings(&paths).expect_err("invalid url");

    assert!(err.to_string().contains("backend_url"));
}
