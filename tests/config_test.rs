//! Config loading integration tests

use std::io::Write;

use proverbs::{ProverbError, ProverbsConfig};

#[test]
fn test_load_full_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[collections]
write_posts = "posts"
write_user_posts = "user-posts"
comments = "remarks"

[view]
recent_limit = 25
anonymous_name = "Someone"
placeholder_avatar = "/img/blank.png"

[backend]
transaction_retries = 5
"#
    )
    .unwrap();

    let config = ProverbsConfig::load(file.path()).unwrap();
    assert!(!config.collections.write_read_diverge());
    assert_eq!(config.collections.comments("p1").to_string(), "/remarks/p1");
    assert_eq!(config.collections.users, "users");
    assert_eq!(config.view.recent_limit, 25);
    assert_eq!(config.view.anonymous_name, "Someone");
    assert_eq!(config.view.placeholder_avatar, "/img/blank.png");
    assert_eq!(config.backend.transaction_retries, 5);
}

#[test]
fn test_empty_file_gives_defaults() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let config = ProverbsConfig::load(file.path()).unwrap();
    assert_eq!(config, ProverbsConfig::default());
    assert!(config.collections.write_read_diverge());
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = ProverbsConfig::load(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ProverbError::Config(_))));
}

#[test]
fn test_malformed_toml_is_config_error() {
    let result = ProverbsConfig::from_toml("[view]\nrecent_limit = \"many\"\n");
    assert!(matches!(result, Err(ProverbError::Config(_))));
}
