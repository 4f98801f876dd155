//! End-to-end runs of a `Session`: clone, serve, override, translate, crawl.

use reqwest::StatusCode;
use sitemount::config::{load_config, validate};
use sitemount::sources::CloneError;
use sitemount::Session;

mod common;

/// Stands in for `git`: "clones" any URL not containing `missing`.
const FAKE_GIT: &str = r#"url="$6"; dest="$7"
case "$url" in
  *missing*) echo "fatal: repository '$url' not found" >&2; exit 128 ;;
esac
mkdir -p "$dest" && printf 'cloned %s' "$url" > "$dest/README.md"
"#;

/// Stands in for the crawler: keeps a copy of the config it was given.
const FAKE_CRAWLER: &str = r#"[ "$1" = "--config" ] || exit 2
[ "$3" = "--extra" ] || exit 3
cp "$2" "$(dirname "$0")/seen-config.json"
"#;

#[cfg(unix)]
#[tokio::test]
async fn repository_with_one_failed_clone_is_still_served() {
    let tmp = tempfile::tempdir().unwrap();
    let bin = tmp.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    common::write_script(&bin.join("git"), FAKE_GIT);
    common::write_script(&bin.join("crawler"), FAKE_CRAWLER);
    std::fs::write(tmp.path().join("hosts"), "127.0.0.1 localhost\n").unwrap();

    let raw = serde_json::json!({
        "max_pages": 10,
        "repositories": [{
            "url": "https://code.local",
            "git_urls": [
                "https://git.example/org/site.git",
                "https://git.example/org/missing.git"
            ],
            "depth": 3
        }]
    });
    let mut settings = common::runtime_settings(tmp.path());
    settings.git_program = bin.join("git");
    settings.crawler_program = Some(bin.join("crawler"));

    let mut session = Session::prepare(validate(&raw).unwrap(), settings).await.unwrap();

    let clones = &session.clones()[0];
    assert_eq!(clones.host, "code.local");
    assert!(clones.outcomes[0].is_success());
    match &clones.outcomes[1].result {
        Err(CloneError::Git(reason)) => assert!(reason.contains("not found"), "{reason}"),
        other => panic!("expected a git failure, got {other:?}"),
    }

    let addr = session.local_addr().expect("server bound");
    let hosts = std::fs::read_to_string(tmp.path().join("hosts")).unwrap();
    assert!(hosts.contains("127.0.0.1 code.local"));
    assert!(!hosts.contains("127.0.0.1 localhost\n127.0.0.1 localhost"));

    let client = common::client_for(addr, &["code.local", "localhost"]);
    for (host, path) in [
        ("code.local", "/README.md"),
        ("code.local", "/org/site/README.md"),
        ("localhost", "/org/site/README.md"),
    ] {
        let res = client.get(common::url(host, addr, path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{host}{path}");
        assert_eq!(res.text().await.unwrap(), "cloned https://git.example/org/site.git");
    }
    let res = client
        .get(common::url("code.local", addr, "/org/missing/"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let translated = session.crawler_config().clone();
    let domain = &translated["domains"][0];
    let base = format!("http://code.local:{}/", addr.port());
    assert_eq!(domain["url"], base);
    assert_eq!(domain["seed_urls"][1], format!("{base}org/site/"));
    assert_eq!(domain["depth"], 3);
    assert_eq!(translated["max_pages"], 10);

    let status = session
        .run_crawler(&["--extra".to_string()])
        .await
        .unwrap()
        .expect("crawler ran");
    assert!(status.success(), "crawler exited with {status}");
    let seen: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(bin.join("seen-config.json")).unwrap()).unwrap();
    assert_eq!(seen, translated);

    session.teardown().await;
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("hosts")).unwrap(),
        "127.0.0.1 localhost\n"
    );
    assert!(!tmp.path().join("work/repositories").exists());
    assert!(!session.server().is_running());
}

#[tokio::test]
async fn dry_run_serves_without_touching_hosts_file() {
    let tmp = tempfile::tempdir().unwrap();
    let data = tmp.path().join("data");
    common::write_file(&data, "page.html", "<h1>local</h1>");

    let raw = serde_json::json!({
        "directories": [{
            "url": "https://filesystem.local",
            "mounts": [format!("{}:https://filesystem.local/seen", data.display())]
        }]
    });
    let mut settings = common::runtime_settings(tmp.path());
    settings.dry_run = true;

    let mut session = Session::prepare(validate(&raw).unwrap(), settings).await.unwrap();
    let addr = session.local_addr().unwrap();

    assert!(!tmp.path().join("hosts").exists());
    assert_eq!(session.overridden_hostnames(), ["filesystem.local".to_string()]);

    let client = common::client_for(addr, &["filesystem.local"]);
    let res = client
        .get(common::url("filesystem.local", addr, "/seen/page.html"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "<h1>local</h1>");

    assert!(session.run_crawler(&[]).await.unwrap().is_none());
    let written = tmp.path().join("work/crawler-config.json");
    let on_disk: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&written).unwrap()).unwrap();
    assert_eq!(
        on_disk["domains"][0]["seed_urls"][0],
        format!("http://filesystem.local:{}/seen", addr.port())
    );

    session.teardown().await;
    assert!(!session.server().is_running());
    // Mount sources are never deleted.
    assert!(data.join("page.html").exists());
}

#[tokio::test]
async fn remote_domains_only_bind_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("crawl.yaml");
    std::fs::write(
        &path,
        "domains:\n  - url: https://example.com\n    seed_urls:\n      - https://example.com/start\n",
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    let mut session = Session::prepare(config, common::runtime_settings(tmp.path()))
        .await
        .unwrap();

    assert!(session.local_addr().is_none());
    assert!(!tmp.path().join("hosts").exists());
    assert_eq!(
        session.crawler_config()["domains"][0]["seed_urls"][0],
        "https://example.com/start"
    );

    session.teardown().await;
}

#[tokio::test]
async fn duplicate_hosts_fail_before_any_side_effect() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("crawl.toml");
    std::fs::write(
        &path,
        r#"
[[domains]]
url = "https://shared.local"
seed_urls = ["https://shared.local/"]

[[directories]]
url = "https://shared.local"
mounts = ["/srv:https://shared.local/srv"]
"#,
    )
    .unwrap();

    let err = load_config(&path).unwrap_err().to_string();
    assert!(err.contains("domains[0]"), "{err}");
    assert!(err.contains("directories[0]"), "{err}");
}
