//! Virtual host server behaviour over real HTTP.

use reqwest::StatusCode;
use sitemount::config::{resolve_mount, validate};
use sitemount::http::VirtualHostServer;

mod common;

#[tokio::test]
async fn directory_mount_round_trip() {
    let data = tempfile::tempdir().unwrap();
    common::write_file(data.path(), "hello.txt", "hello from disk");

    let raw = serde_json::json!({
        "directories": [{
            "url": "https://filesystem.local",
            "mounts": [format!("{}:https://filesystem.local/seen", data.path().display())]
        }]
    });
    let config = validate(&raw).unwrap();
    let entry = config.directories().next().unwrap();
    let spec = resolve_mount(
        &format!("{}:https://filesystem.local/seen", data.path().display()),
        "filesystem.local",
    )
    .unwrap();
    assert_eq!(entry.mounts[0], spec);

    let server = VirtualHostServer::new(common::server_config());
    assert!(server.mount(&entry.host, spec.url_path(), &spec.local_path));
    let addr = server.start().await.unwrap().expect("listener bound");

    let client = common::client_for(addr, &["filesystem.local"]);
    let res = client
        .get(common::url("filesystem.local", addr, "/seen/hello.txt"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "hello from disk");

    let head = client
        .head(common::url("filesystem.local", addr, "/seen/hello.txt"))
        .send()
        .await
        .unwrap();
    assert_eq!(head.status(), StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn directories_redirect_and_list() {
    let data = tempfile::tempdir().unwrap();
    common::write_file(data.path(), "b.txt", "b");
    common::write_file(data.path(), "a.txt", "a");
    common::write_file(data.path(), "zdir/inner.txt", "inner");
    common::write_file(data.path(), ".git/HEAD", "ref: refs/heads/main");

    let server = VirtualHostServer::new(common::server_config());
    server.mount("docs.local", "/seen", data.path());
    let addr = server.start().await.unwrap().unwrap();
    let client = common::client_for(addr, &["docs.local"]);

    let res = client.get(common::url("docs.local", addr, "/seen")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(res.headers()["location"], "/seen/");

    let res = client.get(common::url("docs.local", addr, "/seen/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.text().await.unwrap();
    let zdir = body.find("zdir/").unwrap();
    let a = body.find("a.txt").unwrap();
    let b = body.find("b.txt").unwrap();
    assert!(zdir < a && a < b, "directories first, then files by name:\n{body}");
    assert!(!body.contains(".git"));

    let res = client
        .get(common::url("docs.local", addr, "/seen/.git/HEAD"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn rejects_traversal_unknown_hosts_and_writes() {
    let data = tempfile::tempdir().unwrap();
    common::write_file(data.path(), "index.html", "<p>hi</p>");

    let server = VirtualHostServer::new(common::server_config());
    server.mount("docs.local", "/seen", data.path());
    let addr = server.start().await.unwrap().unwrap();
    let client = common::client_for(addr, &["docs.local", "other.local"]);

    let res = client
        .get(common::url("docs.local", addr, "/seen/..%2fsecret"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(common::url("other.local", addr, "/seen/index.html"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(common::url("docs.local", addr, "/seen/missing.html"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(common::url("docs.local", addr, "/seen/index.html"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    server.stop().await;
}

#[tokio::test]
async fn host_header_is_case_insensitive() {
    let data = tempfile::tempdir().unwrap();
    common::write_file(data.path(), "page.html", "page");

    let server = VirtualHostServer::new(common::server_config());
    server.mount("docs.local", "/seen", data.path());
    let addr = server.start().await.unwrap().unwrap();
    let client = common::client_for(addr, &[]);

    let res = client
        .get(format!("http://{addr}/seen/page.html"))
        .header("host", "Docs.LOCAL")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "page");

    server.stop().await;
}

#[tokio::test]
async fn first_root_wins_and_mounts_layer_over_it() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let docs = tempfile::tempdir().unwrap();
    common::write_file(first.path(), "root.txt", "first");
    common::write_file(first.path(), "docs/only-in-root.txt", "from root");
    common::write_file(second.path(), "root.txt", "second");
    common::write_file(docs.path(), "guide.txt", "from mount");

    let server = VirtualHostServer::new(common::server_config());
    assert!(server.register("code.local", Some(first.path().to_path_buf())));
    assert!(!server.register("code.local", Some(second.path().to_path_buf())));
    assert!(server.mount("code.local", "/docs", docs.path()));
    let addr = server.start().await.unwrap().unwrap();
    let client = common::client_for(addr, &["code.local"]);

    let get = |path: &'static str| {
        let client = client.clone();
        async move {
            let res = client.get(common::url("code.local", addr, path)).send().await.unwrap();
            (res.status(), res.text().await.unwrap())
        }
    };

    assert_eq!(get("/root.txt").await, (StatusCode::OK, "first".to_string()));
    assert_eq!(get("/docs/guide.txt").await, (StatusCode::OK, "from mount".to_string()));
    assert_eq!(get("/docs/only-in-root.txt").await, (StatusCode::OK, "from root".to_string()));

    server.stop().await;
}

#[tokio::test]
async fn missing_mount_source_is_dropped() {
    let server = VirtualHostServer::new(common::server_config());
    assert!(!server.mount("ghost.local", "/seen", "/nonexistent/sitemount/source"));
    assert!(server.hostnames().is_empty());
    assert!(server.start().await.unwrap().is_none());
}
