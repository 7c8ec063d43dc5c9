#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use std::collections::HashMap;

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn system_config_defaults_to_fixed_path() {
    assert_eq!(
        system_config_path(&env(&[])),
        PathBuf::from(DEFAULT_SYSTEM_CONFIG_PATH)
    );
}

#[test]
fn system_configpath2_overrides_default() {
    let path = system_config_path(&env(&[("CCACHE_CONFIGPATH2", "/tmp/alt.conf")]));
    assert_eq!(path, PathBuf::from("/tmp/alt.conf"));
}

#[test]
fn user_config_defaults_to_cache_dir_ccache_conf() {
    let cache_dir = Path::new("/home/user/.cache/ccache");
    let path = user_config_path(&env(&[]), cache_dir);
    assert_eq!(path, cache_dir.join("ccache.conf"));
}

#[test]
fn configpath_env_var_overrides_cache_dir_derivation() {
    let cache_dir = Path::new("/home/user/.cache/ccache");
    let path = user_config_path(&env(&[("CCACHE_CONFIGPATH", "/tmp/custom.conf")]), cache_dir);
    assert_eq!(path, PathBuf::from("/tmp/custom.conf"));
}
