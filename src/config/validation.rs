//! Configuration validation.
//!
//! # Responsibilities
//! - Coerce the untyped document into `ValidatedConfig`
//! - Check field shapes (required keys, non-empty lists, URL kinds)
//! - Check cross-field rules (mount hosts and paths)
//! - Check cross-section rules (every hostname declared once)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: `Value → Result<ValidatedConfig, ValidationErrors>`
//! - Runs before any clone, bind or hosts-file side effect

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::config::coerce::{host_of, parse_git_url, parse_http_url, parse_identity_url};
use crate::config::mount::resolve_mount;
use crate::config::schema::{
    ConfigEntry, DirectoryEntry, DomainEntry, RepositoryEntry, ValidatedConfig,
};

pub const DOMAINS: &str = "domains";
pub const REPOSITORIES: &str = "repositories";
pub const DIRECTORIES: &str = "directories";

/// A single violated rule, located by its field path (e.g. `directories[0].mounts[1]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every violation found in one document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration is invalid ({} error(s))", self.0.len())?;
        for err in &self.0 {
            write!(f, "\n  - {err}")?;
        }
        Ok(())
    }
}

/// Validate and normalize a raw configuration document.
pub fn validate(raw: &Value) -> Result<ValidatedConfig, ValidationErrors> {
    let mut v = Validator::default();

    let root = match raw {
        Value::Null => return Ok(ValidatedConfig::default()),
        Value::Object(map) => map,
        other => {
            v.error("<root>", format!("expected a table of sections, found {}", kind(other)));
            return Err(ValidationErrors(v.errors));
        }
    };

    let mut config = ValidatedConfig::default();
    for (key, value) in root {
        if ![DOMAINS, REPOSITORIES, DIRECTORIES].contains(&key.as_str()) {
            config.passthrough.insert(key.clone(), value.clone());
        }
    }

    for (i, item) in v.section(root, DOMAINS).into_iter().enumerate() {
        let path = format!("{DOMAINS}[{i}]");
        if let Some(entry) = v.domain(&path, item) {
            config.entries.push(ConfigEntry::Domain(entry));
        }
    }
    for (i, item) in v.section(root, REPOSITORIES).into_iter().enumerate() {
        let path = format!("{REPOSITORIES}[{i}]");
        if let Some(entry) = v.repository(&path, item) {
            config.entries.push(ConfigEntry::Repository(entry));
        }
    }
    for (i, item) in v.section(root, DIRECTORIES).into_iter().enumerate() {
        let path = format!("{DIRECTORIES}[{i}]");
        if let Some(entry) = v.directory(&path, item) {
            config.entries.push(ConfigEntry::Directory(entry));
        }
    }

    v.check_unique_hosts();

    if v.errors.is_empty() {
        Ok(config)
    } else {
        Err(ValidationErrors(v.errors))
    }
}

#[derive(Default)]
struct Validator {
    errors: Vec<ValidationError>,
    /// hostname -> every `<entry>.url` path that declared it
    hosts: BTreeMap<String, Vec<String>>,
}

impl Validator {
    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError::new(path, message));
    }

    fn section<'a>(&mut self, root: &'a Map<String, Value>, name: &str) -> Vec<&'a Value> {
        match root.get(name) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().collect(),
            Some(other) => {
                self.error(name, format!("expected a list, found {}", kind(other)));
                Vec::new()
            }
        }
    }

    fn table<'a>(&mut self, path: &str, item: &'a Value) -> Option<&'a Map<String, Value>> {
        match item {
            Value::Object(map) => Some(map),
            other => {
                self.error(path, format!("expected a table, found {}", kind(other)));
                None
            }
        }
    }

    fn string<'a>(&mut self, path: &str, value: Option<&'a Value>) -> Option<&'a str> {
        match value {
            Some(Value::String(s)) => Some(s),
            None | Some(Value::Null) => {
                self.error(path, "is required");
                None
            }
            Some(other) => {
                self.error(path, format!("expected a string, found {}", kind(other)));
                None
            }
        }
    }

    /// A required list of strings; `non_empty` rejects `[]`.
    fn string_list<'a>(
        &mut self,
        path: &str,
        value: Option<&'a Value>,
        non_empty: bool,
    ) -> Option<Vec<(String, &'a str)>> {
        let items = match value {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) if !non_empty => return Some(Vec::new()),
            None | Some(Value::Null) => {
                self.error(path, "is required");
                return None;
            }
            Some(other) => {
                self.error(path, format!("expected a list, found {}", kind(other)));
                return None;
            }
        };
        if non_empty && items.is_empty() {
            self.error(path, "must contain at least one element");
            return None;
        }

        let mut out = Vec::with_capacity(items.len());
        let mut ok = true;
        for (j, item) in items.iter().enumerate() {
            let item_path = format!("{path}[{j}]");
            match item {
                Value::String(s) => out.push((item_path, s.as_str())),
                other => {
                    self.error(item_path, format!("expected a string, found {}", kind(other)));
                    ok = false;
                }
            }
        }
        ok.then_some(out)
    }

    /// Parse the entry's `url` and record its host for the uniqueness check.
    fn entry_url(
        &mut self,
        path: &str,
        map: &Map<String, Value>,
        parse: fn(&str) -> Result<Url, String>,
    ) -> Option<(Url, String)> {
        let url_path = format!("{path}.url");
        let raw = self.string(&url_path, map.get("url"))?;
        match parse(raw) {
            Ok(url) => {
                let host = host_of(&url);
                self.hosts.entry(host.clone()).or_default().push(url_path);
                Some((url, host))
            }
            Err(reason) => {
                self.error(url_path, reason);
                None
            }
        }
    }

    fn domain(&mut self, path: &str, item: &Value) -> Option<DomainEntry> {
        let map = self.table(path, item)?;
        let url = self.entry_url(path, map, parse_http_url);

        let seeds_path = format!("{path}.seed_urls");
        let seeds = self.string_list(&seeds_path, map.get("seed_urls"), false);
        let mut seed_urls = Vec::new();
        let mut seeds_ok = seeds.is_some();
        for (item_path, raw) in seeds.unwrap_or_default() {
            match parse_http_url(raw) {
                Ok(seed) => seed_urls.push(seed),
                Err(reason) => {
                    self.error(item_path, reason);
                    seeds_ok = false;
                }
            }
        }

        let (url, host) = url?;
        seeds_ok.then(|| DomainEntry {
            host,
            url,
            seed_urls,
            raw: map.clone(),
        })
    }

    fn repository(&mut self, path: &str, item: &Value) -> Option<RepositoryEntry> {
        let map = self.table(path, item)?;
        let url = self.entry_url(path, map, parse_identity_url);

        let list_path = format!("{path}.git_urls");
        let raw_urls = self.string_list(&list_path, map.get("git_urls"), true);
        let mut git_urls = Vec::new();
        let mut urls_ok = raw_urls.is_some();
        for (item_path, raw) in raw_urls.unwrap_or_default() {
            match parse_git_url(raw) {
                Ok(git) => git_urls.push(git),
                Err(reason) => {
                    self.error(item_path, reason);
                    urls_ok = false;
                }
            }
        }

        let (url, host) = url?;
        urls_ok.then(|| RepositoryEntry {
            host,
            url,
            git_urls,
            extra: without(map, &["url", "git_urls"]),
        })
    }

    fn directory(&mut self, path: &str, item: &Value) -> Option<DirectoryEntry> {
        let map = self.table(path, item)?;
        let url = self.entry_url(path, map, parse_identity_url);

        let list_path = format!("{path}.mounts");
        let raw_mounts = self.string_list(&list_path, map.get("mounts"), true);

        // Mount hosts are checked against the entry host; without a host
        // there is nothing to compare against.
        let (url, host) = url?;
        let raw_mounts = raw_mounts?;

        let mut mounts = Vec::with_capacity(raw_mounts.len());
        let mut mounts_ok = true;
        for (item_path, raw) in raw_mounts {
            match resolve_mount(raw, &host) {
                Ok(spec) => mounts.push(spec),
                Err(err) => {
                    self.error(item_path, err.to_string());
                    mounts_ok = false;
                }
            }
        }

        mounts_ok.then(|| DirectoryEntry {
            host,
            url,
            mounts,
            extra: without(map, &["url", "mounts"]),
        })
    }

    fn check_unique_hosts(&mut self) {
        let duplicates: Vec<(String, Vec<String>)> = self
            .hosts
            .iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(host, paths)| (host.clone(), paths.clone()))
            .collect();

        for (host, paths) in duplicates {
            let joined = paths.join(", ");
            self.error(
                joined.clone(),
                format!("hostname '{host}' is declared {} times ({joined})", paths.len()),
            );
        }
    }
}

fn without(map: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    map.iter()
        .filter(|(k, _)| !keys.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a table",
    }
}
