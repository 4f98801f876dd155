//! Translation into the crawler-facing configuration.
//!
//! The crawler only understands `domains` with seed URLs. Repository and
//! directory entries are rewritten into domain entries whose seeds point at
//! the local virtual hosts; everything else passes through.

use serde_json::{json, Map, Value};
use url::Url;

use crate::config::schema::{DirectoryEntry, RepositoryEntry, ValidatedConfig};

/// Where the virtual hosts are reachable from the crawler's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicEndpoint {
    pub port: u16,
}

impl Default for PublicEndpoint {
    fn default() -> Self {
        Self { port: 80 }
    }
}

impl PublicEndpoint {
    /// Point `url` at the local server: plain HTTP on our port, same host and path.
    pub fn localize(&self, url: &Url) -> Url {
        let mut local = url.clone();
        // Both are special schemes, so the switch cannot fail.
        let _ = local.set_scheme("http");
        let _ = local.set_port(Some(self.port));
        local
    }
}

/// Build the configuration handed to the external crawler.
pub fn to_crawler_config(config: &ValidatedConfig, endpoint: &PublicEndpoint) -> Value {
    let mut domains: Vec<Value> = config.domains().map(|d| Value::Object(d.raw.clone())).collect();
    domains.extend(config.repositories().map(|r| repository_domain(r, endpoint)));
    domains.extend(config.directories().map(|d| directory_domain(d, endpoint)));

    let mut out = Map::new();
    out.insert("domains".to_string(), Value::Array(domains));
    for (key, value) in &config.passthrough {
        out.insert(key.clone(), value.clone());
    }
    Value::Object(out)
}

fn repository_domain(entry: &RepositoryEntry, endpoint: &PublicEndpoint) -> Value {
    let base = endpoint.localize(&entry.url);
    let mut seeds = vec![base.to_string()];
    for git in &entry.git_urls {
        if let Ok(seed) = base.join(&format!("{}/", git.mount_path().trim_start_matches('/'))) {
            seeds.push(seed.to_string());
        }
    }
    domain_value(base, seeds, &entry.extra)
}

fn directory_domain(entry: &DirectoryEntry, endpoint: &PublicEndpoint) -> Value {
    let base = endpoint.localize(&entry.url);
    let seeds = entry
        .mounts
        .iter()
        .map(|m| endpoint.localize(&m.dest_url).to_string())
        .collect();
    domain_value(base, seeds, &entry.extra)
}

fn domain_value(url: Url, seeds: Vec<String>, extra: &Map<String, Value>) -> Value {
    let mut value = json!({
        "url": url.to_string(),
        "seed_urls": seeds,
    });
    if let Value::Object(map) = &mut value {
        for (key, v) in extra {
            map.entry(key.clone()).or_insert_with(|| v.clone());
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validation::validate;

    fn sample() -> ValidatedConfig {
        validate(&json!({
            "domains": [{"url": "https://example.com", "seed_urls": ["https://example.com/start"], "depth": 2}],
            "repositories": [{
                "url": "https://code.local",
                "git_urls": ["https://github.com/org/repo.git", "git@github.com:org/tool.git"]
            }],
            "directories": [{
                "url": "https://filesystem.local",
                "mounts": ["/data:https://filesystem.local/seen", "/more:https://filesystem.local/more/docs"],
                "depth": 1
            }],
            "output": "results.jsonl"
        }))
        .unwrap()
    }

    #[test]
    fn test_translation_default_port() {
        let out = to_crawler_config(&sample(), &PublicEndpoint::default());

        assert_eq!(
            out,
            json!({
                "domains": [
                    {"url": "https://example.com", "seed_urls": ["https://example.com/start"], "depth": 2},
                    {
                        "url": "http://code.local/",
                        "seed_urls": ["http://code.local/", "http://code.local/org/repo/", "http://code.local/org/tool/"]
                    },
                    {
                        "url": "http://filesystem.local/",
                        "seed_urls": ["http://filesystem.local/seen", "http://filesystem.local/more/docs"],
                        "depth": 1
                    }
                ],
                "output": "results.jsonl"
            })
        );
    }

    #[test]
    fn test_translation_custom_port() {
        let out = to_crawler_config(&sample(), &PublicEndpoint { port: 8080 });
        assert_eq!(out["domains"][2]["seed_urls"][0], json!("http://filesystem.local:8080/seen"));
        assert_eq!(out["domains"][1]["url"], json!("http://code.local:8080/"));
    }

    #[test]
    fn test_no_local_paths_leak() {
        let out = to_crawler_config(&sample(), &PublicEndpoint::default()).to_string();
        assert!(!out.contains("/data:"));
        assert!(!out.contains("git_urls"));
        assert!(!out.contains("mounts"));
    }
}
