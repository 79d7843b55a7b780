use std::time::Duration;

use depot_config::{ConfigError, DepotConfig};
use depot_layout::RepositoryLayout;
use figment::Jail;

const CONFIG: &str = r#"
[proxy]
default_timeout_secs = 45

[[repositories]]
id = "internal"
root = "/srv/depot/internal"
blacklist = ["org/private/**"]
include_snapshots = false

[[repositories.remotes]]
id = "central"
url = "https://repo.maven.apache.org/maven2/"
priority = 10
timeout_secs = 20

[repositories.remotes.policies]
snapshots = "hourly"
checksum = "fail"

[[repositories.remotes]]
id = "legacy"
url = "http://old.example/repo"
layout = "legacy"
priority = 5
whitelist = ["com/**"]
"#;

#[test]
fn test_into_parts() {
    let config = DepotConfig::from_toml_str(CONFIG).unwrap();
    assert_eq!(config.proxy_options().default_timeout, Duration::from_secs(45));

    let mut parts = config.into_parts().unwrap();
    assert_eq!(parts.len(), 1);
    let (managed, remotes) = parts.remove(0);

    assert_eq!(managed.id, "internal");
    assert_eq!(managed.layout, RepositoryLayout::Default);
    assert_eq!(managed.blacklist, ["org/private/**"]);
    assert!(!managed.include_snapshots);

    let central = &remotes[0];
    assert_eq!(central.id, "central");
    assert_eq!(central.timeout, Some(Duration::from_secs(20)));
    assert_eq!(central.priority, 10);
    let pre: Vec<_> = central.pre_fetch.iter().map(|p| (p.policy.as_str(), p.setting.as_str())).collect();
    let post: Vec<_> = central.post_fetch.iter().map(|p| (p.policy.as_str(), p.setting.as_str())).collect();
    assert_eq!(pre, [("snapshots", "hourly")]);
    assert_eq!(post, [("checksum", "fail")]);

    let legacy = &remotes[1];
    assert_eq!(legacy.layout, RepositoryLayout::Legacy);
    assert_eq!(legacy.timeout, None);
    assert_eq!(legacy.whitelist, ["com/**"]);
    assert_eq!(legacy.url_for("a/jars/a-1.jar"), "http://old.example/repo/a/jars/a-1.jar");
}

#[test]
fn test_environment_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("depot.toml", CONFIG)?;
        jail.set_env("DEPOT_PROXY__DEFAULT_TIMEOUT_SECS", "5");

        let config = DepotConfig::load(&jail.directory().join("depot.toml")).map_err(|e| e.to_string())?;
        assert_eq!(config.proxy.default_timeout_secs, 5);
        assert_eq!(config.repositories[0].remotes.len(), 2);
        Ok(())
    });
}

#[test]
fn test_missing_file_uses_defaults() {
    Jail::expect_with(|jail| {
        let config = DepotConfig::load(&jail.directory().join("absent.toml")).map_err(|e| e.to_string())?;
        assert_eq!(config, DepotConfig::default());
        Ok(())
    });
}

#[test]
fn test_validation_errors() {
    let duplicate = r#"
        [[repositories]]
        id = "a"
        root = "/a"
        [[repositories]]
        id = "a"
        root = "/b"
    "#;
    assert!(matches!(
        DepotConfig::from_toml_str(duplicate),
        Err(ConfigError::DuplicateRepository(id)) if id == "a"
    ));

    let bad_url = r#"
        [[repositories]]
        id = "a"
        root = "/a"
        [[repositories.remotes]]
        id = "r"
        url = "not a url"
    "#;
    assert!(matches!(DepotConfig::from_toml_str(bad_url), Err(ConfigError::InvalidUrl { .. })));

    let unknown_policy = r#"
        [[repositories]]
        id = "a"
        root = "/a"
        [[repositories.remotes]]
        id = "r"
        url = "http://r/"
        policies = { retention = "forever" }
    "#;
    assert!(matches!(
        DepotConfig::from_toml_str(unknown_policy),
        Err(ConfigError::UnknownPolicy { policy, .. }) if policy == "retention"
    ));

    let bad_pattern = r#"
        [[repositories]]
        id = "a"
        root = "/a"
        blacklist = ["[unclosed"]
    "#;
    assert!(matches!(DepotConfig::from_toml_str(bad_pattern), Err(ConfigError::InvalidPattern { .. })));

    let unknown_field = "[proxy]\ntimeout = 3\n";
    assert!(matches!(DepotConfig::from_toml_str(unknown_field), Err(ConfigError::Load(_))));
}

#[test]
fn test_unknown_setting_is_accepted_with_warning() {
    let config = r#"
        [[repositories]]
        id = "a"
        root = "/a"
        [[repositories.remotes]]
        id = "r"
        url = "http://r/"
        policies = { releases = "weekly" }
    "#;
    let config = DepotConfig::from_toml_str(config).unwrap();
    let (_, remotes) = config.into_parts().unwrap().remove(0);
    assert_eq!(remotes[0].pre_fetch[0].setting, "weekly");
}
