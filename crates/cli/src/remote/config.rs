//! `remote_storage` config grammar parsing (spec §4.7 "Config grammar")
//! and redaction for logging.
//!
//! `remote_storage := (entry (WS entry)*)?`
//! `entry := url (WS option)*`
//! `option := ("helper"|"data-timeout"|"request-timeout"|"idle-timeout"
//!            |"read-only"|"shards") "=" value | "@" attr "=" value`
//!
//! Shard-list default weight and non-negative validation follow
//! `examples/original_source/src/ccache/storage/storage.cpp`'s
//! `parse_shards`, which spec.md names the shape of but not the default
//! or validation rule for.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::remote::rendezvous::Shard;

const REDACTED: &str = "_redacted_";

/// One configured remote-storage entry: a URL template (possibly
/// containing `*` for shard substitution) plus its options.
#[derive(Debug, Clone)]
pub struct RemoteEntry {
    pub url: String,
    pub shards: Vec<Shard>,
    pub read_only: bool,
    pub request_timeout: Duration,
    pub data_timeout: Duration,
    pub idle_timeout: Duration,
    pub attributes: Vec<(String, String)>,
}

impl Default for RemoteEntry {
    fn default() -> Self {
        Self {
            url: String::new(),
            shards: Vec::new(),
            read_only: false,
            request_timeout: Duration::from_secs(2),
            data_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(600),
            attributes: Vec::new(),
        }
    }
}

/// Parse the full `remote_storage` config value into its entries.
pub fn parse_remote_storage(value: &str) -> Result<Vec<RemoteEntry>> {
    let mut entries: Vec<RemoteEntry> = Vec::new();
    for token in value.split_whitespace() {
        if looks_like_url(token) {
            entries.push(RemoteEntry {
                url: token.to_string(),
                ..RemoteEntry::default()
            });
            continue;
        }
        let entry = entries.last_mut().ok_or_else(|| Error::Config {
            message: format!("remote_storage: option {token:?} before any url"),
            path: None,
        })?;
        apply_option(entry, token)?;
    }
    Ok(entries)
}

fn looks_like_url(token: &str) -> bool {
    token.contains("://")
}

fn apply_option(entry: &mut RemoteEntry, token: &str) -> Result<()> {
    let (key, value) = token.split_once('=').ok_or_else(|| Error::Config {
        message: format!("remote_storage: malformed option {token:?}"),
        path: None,
    })?;

    if let Some(attr) = key.strip_prefix('@') {
        entry.attributes.push((attr.to_string(), value.to_string()));
        return Ok(());
    }

    match key {
        "read-only" => entry.read_only = value == "true",
        "request-timeout" => entry.request_timeout = parse_seconds(value)?,
        "data-timeout" => entry.data_timeout = parse_seconds(value)?,
        "idle-timeout" => entry.idle_timeout = parse_seconds(value)?,
        "shards" => entry.shards = parse_shards(value)?,
        "helper" => entry.attributes.push(("helper".to_string(), value.to_string())),
        other => {
            return Err(Error::Config {
                message: format!("remote_storage: unknown option {other:?}"),
                path: None,
            });
        }
    }
    Ok(())
}

fn parse_seconds(value: &str) -> Result<Duration> {
    value
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| Error::Config {
            message: format!("remote_storage: invalid timeout value {value:?}"),
            path: None,
        })
}

/// `name[(weight)],name[(weight)],...`, default weight `1.0`, weight must
/// be non-negative.
pub fn parse_shards(value: &str) -> Result<Vec<Shard>> {
    value
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|token| {
            if let Some(open) = token.find('(') {
                let name = token[..open].to_string();
                let close = token.rfind(')').ok_or_else(|| Error::Config {
                    message: format!("remote_storage: unterminated weight in {token:?}"),
                    path: None,
                })?;
                let weight: f64 =
                    token[open + 1..close].parse().map_err(|_| Error::Config {
                        message: format!("remote_storage: invalid weight in {token:?}"),
                        path: None,
                    })?;
                if weight < 0.0 {
                    return Err(Error::Config {
                        message: format!("remote_storage: negative weight in {token:?}"),
                        path: None,
                    });
                }
                Ok(Shard { name, weight })
            } else {
                Ok(Shard {
                    name: token.to_string(),
                    weight: 1.0,
                })
            }
        })
        .collect()
}

/// Expand a sharded URL template (containing exactly one `*`) for a
/// specific shard name.
pub fn expand_shard_url(template: &str, shard_name: &str) -> Result<String> {
    let count = template.matches('*').count();
    if count != 1 {
        return Err(Error::Config {
            message: format!(
                "remote_storage: url must contain exactly one '*', found {count} in {template:?}"
            ),
            path: None,
        });
    }
    Ok(template.replacen('*', shard_name, 1))
}

/// Redact URL userinfo and any `bearer-token` attribute value before
/// logging (spec §4.7 "Redaction").
pub fn redact_for_logging(entry: &RemoteEntry) -> String {
    let redacted_url = redact_userinfo(&entry.url);
    let mut parts = vec![redacted_url];
    for (attr, value) in &entry.attributes {
        if attr == "bearer-token" {
            parts.push(format!("@{attr}={REDACTED}"));
        } else {
            parts.push(format!("@{attr}={value}"));
        }
    }
    parts.join(" ")
}

fn redact_userinfo(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let (scheme, rest) = url.split_at(scheme_end + 3);
    match rest.find('@') {
        Some(at) => format!("{scheme}{REDACTED}@{}", &rest[at + 1..]),
        None => url.to_string(),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
