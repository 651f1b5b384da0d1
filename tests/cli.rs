// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end runs of the `tinysite` binary on scratch projects.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HOME_TEMPLATE: &str = r#"<html><head><title>{{build_title}}</title><link rel="stylesheet" href="{{{css_url_for "site.css"}}}"><script src="{{{js_url_for "app.js"}}}"></script></head><body>{{#each page.items}}<a href="{{{url_for route}}}">{{title}}</a>{{/each}}</body></html>"#;

const ITEM_TEMPLATE: &str =
    r#"<html><head><title>{{build_title}}</title></head><body>{{page.data.price}} {{meta.data.currency}}</body></html>"#;

fn write(root: &Path, path: &str, content: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "source/meta.json",
        r#"{
            "baseurl": "/",
            "title": "Site",
            "start_page": "home",
            "html_output": "raw",
            "data": {"currency": "EUR"}
        }"#,
    );
    write(
        root,
        "source/content/home/page.json",
        r#"{
            "title": "Home",
            "template": "home.html",
            "items_template": "item.html",
            "items_title": "Item {loop_index}",
            "items": [{"data": {"price": 10}}, {"data": {"price": 20}}]
        }"#,
    );
    write(root, "source/templates/home.html", HOME_TEMPLATE);
    write(root, "source/templates/item.html", ITEM_TEMPLATE);
    write(root, "source/assets/css/site.css", "body {\n  color: red;\n}\n");
    write(
        root,
        "source/assets/js/app.js",
        "function greet(name) {\n  return 'hi ' + name;\n}\n",
    );
    write(root, "source/assets/images/logo.txt", "logo");
    dir
}

fn tinysite(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tinysite").unwrap();
    _ = cmd.current_dir(dir.path()).env_remove("RUST_LOG");
    cmd
}

fn read(dir: &TempDir, path: &str) -> String {
    fs::read_to_string(dir.path().join("compiled").join(path)).unwrap()
}

#[test]
fn test_builds_pages_and_assets() {
    let dir = project();
    _ = tinysite(&dir).assert().success();

    let home = read(&dir, "home/index.html");
    assert!(home.contains("<title>Home | Site</title>"));
    assert!(home.contains(r#"<a href="/home/1/index.html">Item 1</a>"#));
    assert!(home.contains(r#"<a href="/home/2/index.html">Item 2</a>"#));
    assert!(home.contains("/assets/css/packed.min.css?v="));

    let item = read(&dir, "home/2/index.html");
    assert!(item.contains("<title>Item 2 - Home | Site</title>"));
    assert!(item.contains("20 EUR"));

    assert_eq!(read(&dir, "index.html"), home);
    assert!(read(&dir, "assets/css/packed.min.css").contains("color:red"));
    assert_eq!(read(&dir, "assets/css/site.css"), "body {\n  color: red;\n}\n");
    assert_eq!(read(&dir, "assets/images/logo.txt"), "logo");
}

#[test]
fn test_script_bundle_keeps_global_functions() {
    let dir = project();
    _ = tinysite(&dir).assert().success();

    assert!(read(&dir, "home/index.html").contains("/assets/js/packed.min.js?v="));
    let bundle = read(&dir, "assets/js/packed.min.js");
    assert!(bundle.contains("function greet("));
    assert!(bundle.len() < "function greet(name) {\n  return 'hi ' + name;\n}\n".len());
}

#[test]
fn test_skip_copy_leaves_out_bundled_sources() {
    let dir = project();
    _ = tinysite(&dir).arg("skip_copy").assert().success();

    let assets = dir.path().join("compiled/assets");
    assert!(assets.join("css/packed.min.css").is_file());
    assert!(!assets.join("css/site.css").exists());
    assert!(assets.join("js/packed.min.js").is_file());
    assert!(!assets.join("js/app.js").exists());
    assert!(assets.join("images/logo.txt").is_file());
}

#[test]
fn test_env_override_reaches_templates() {
    let dir = project();
    _ = tinysite(&dir)
        .env("RP_DATA_CURRENCY", "USD")
        .assert()
        .success();
    assert!(read(&dir, "home/1/index.html").contains("10 USD"));
}

#[test]
fn test_missing_template_fails() {
    let dir = project();
    write(
        dir.path(),
        "source/content/home/page.json",
        r#"{"title": "Home", "items": [{"title": "Orphan"}]}"#,
    );

    _ = tinysite(&dir)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error"));
    assert!(!dir.path().join("compiled/home/index.html").exists());
}

#[test]
fn test_missing_meta_file_fails() {
    let dir = TempDir::new().unwrap();
    _ = tinysite(&dir)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to build site"));
}

#[test]
fn test_unknown_token_is_rejected() {
    let dir = project();
    _ = tinysite(&dir).arg("deploy").assert().failure();
    assert!(!dir.path().join("compiled").exists());
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    _ = tinysite(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
