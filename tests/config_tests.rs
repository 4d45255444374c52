//! Tests for the type-safe configuration builder pattern (§6.1).

use kodegen_tools_citescrape::Config;

mod common;

#[test]
fn builder_requires_cache_dir_before_build_is_callable() {
    // This should not compile if uncommented - testing compile-time guarantees
    // let config = Config::builder().build();

    let dir = common::create_test_dir();
    let config = Config::builder()
        .cache_dir(dir.path())
        .build()
        .expect("duckduckgo is enabled by default, build should succeed");

    assert_eq!(config.cache_dir(), dir.path());
}

#[test]
fn builder_optional_fields_have_documented_defaults() {
    let dir = common::create_test_dir();
    let config = Config::builder().cache_dir(dir.path()).build().unwrap();

    assert_eq!(config.cache_ttl_seconds(), 86_400);
    assert_eq!(config.cache_max_entries(), 100);
    assert_eq!(config.max_concurrent_scrapes(), 5);
    assert!(config.duckduckgo().enabled());
    assert!(!config.brave().enabled());
    assert!(!config.tavily().enabled());
}

#[test]
fn builder_relative_cache_dir_is_normalized_to_absolute() {
    let config = Config::builder()
        .cache_dir("relative/cache/path")
        .build()
        .unwrap();

    assert!(config.cache_dir().is_absolute());
}

#[test]
fn builder_rejects_enabled_engine_with_no_api_key() {
    use kodegen_tools_citescrape::config::EngineConfig;

    let dir = common::create_test_dir();
    let err = Config::builder()
        .cache_dir(dir.path())
        .brave(EngineConfig::new(true, None, 5, 30, 3))
        .build()
        .unwrap_err();

    assert!(format!("{err}").contains("brave"));
}

#[test]
fn builder_rejects_no_engine_enabled() {
    use kodegen_tools_citescrape::config::EngineConfig;

    let dir = common::create_test_dir();
    let err = Config::builder()
        .cache_dir(dir.path())
        .duckduckgo(EngineConfig::new(false, None, 5, 30, 3))
        .build()
        .unwrap_err();

    assert!(format!("{err}").contains("at least one search engine"));
}

#[test]
fn builder_field_override_keeps_last_write() {
    let dir = common::create_test_dir();
    let config = Config::builder()
        .cache_dir(dir.path())
        .max_concurrent_scrapes(2)
        .max_concurrent_scrapes(9)
        .build()
        .unwrap();

    assert_eq!(config.max_concurrent_scrapes(), 9);
}

#[test]
fn config_round_trips_through_json() {
    let dir = common::create_test_dir();
    let config = Config::builder().cache_dir(dir.path()).build().unwrap();

    let json = serde_json::to_string(&config).unwrap();
    let restored: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.cache_dir(), config.cache_dir());
    assert_eq!(restored.user_agent(), config.user_agent());
}
