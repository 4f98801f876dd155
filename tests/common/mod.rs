//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;

use sitemount::config::{RuntimeSettings, ServerConfig};

/// Server settings that bind an ephemeral loopback port.
pub fn server_config() -> ServerConfig {
    ServerConfig {
        bind_address: "127.0.0.1:0".to_string(),
        request_timeout_secs: 5,
        shutdown_timeout_secs: 2,
    }
}

/// Run settings confined to `work`: clones and the hosts file live there.
pub fn runtime_settings(work: &Path) -> RuntimeSettings {
    RuntimeSettings {
        server: server_config(),
        work_dir: Some(work.join("work")),
        hosts_file: work.join("hosts"),
        ..RuntimeSettings::default()
    }
}

/// Create `relative` under `root` with `content`, making parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// A client that resolves every given hostname to `addr` and never follows
/// redirects.
pub fn client_for(addr: SocketAddr, hostnames: &[&str]) -> reqwest::Client {
    let mut builder = reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none());
    for host in hostnames {
        builder = builder.resolve(host, addr);
    }
    builder.build().unwrap()
}

/// `http://<host>:<port><path>`.
pub fn url(host: &str, addr: SocketAddr, path: &str) -> String {
    format!("http://{host}:{}{path}", addr.port())
}

/// Write an executable shell script at `path`.
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}
