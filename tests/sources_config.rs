// tests/sources_config.rs
use goodscoop::ingest::config::{load_disabled_default, load_disabled_from};
use std::{env, fs};

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("sources.toml");
    fs::write(
        &p_toml,
        r#"
disabled = [" weather ", "", "nhs_newcastle", "nhs_newcastle"]
"#,
    )
    .unwrap();
    let v = load_disabled_from(&p_toml).unwrap();
    assert_eq!(v, vec!["nhs_newcastle".to_string(), "weather".to_string()]);

    let p_json = dir.path().join("sources.json");
    fs::write(&p_json, r#"["tech_news"," calendar  ", ""]"#).unwrap();
    let vj = load_disabled_from(&p_json).unwrap();
    assert_eq!(vj, vec!["calendar".to_string(), "tech_news".to_string()]);
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Run from an empty dir so the repo's own config/ is not picked up.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    env::remove_var("SOURCES_CONFIG_PATH");

    // 1) nothing configured: everything enabled
    let v = load_disabled_default().unwrap();
    assert!(v.is_empty());

    // 2) ./config/sources.toml
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("sources.toml"), r#"disabled = ["on_this_day"]"#).unwrap();
    let vt = load_disabled_default().unwrap();
    assert_eq!(vt, vec!["on_this_day".to_string()]);

    // 3) env path wins
    let p_env = tmp.path().join("custom.json");
    fs::write(&p_env, r#"["google_news"]"#).unwrap();
    env::set_var("SOURCES_CONFIG_PATH", p_env.display().to_string());
    let ve = load_disabled_default().unwrap();
    assert_eq!(ve, vec!["google_news".to_string()]);

    // 4) env path to nowhere is an error, not a silent fallback
    env::set_var("SOURCES_CONFIG_PATH", tmp.path().join("missing.toml").display().to_string());
    assert!(load_disabled_default().is_err());
    env::remove_var("SOURCES_CONFIG_PATH");

    env::set_current_dir(&old).unwrap();
}
