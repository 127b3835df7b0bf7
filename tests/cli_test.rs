use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn fenceguard() -> Command {
    Command::cargo_bin("fenceguard").unwrap()
}

const SITE: &str = r#"{
    "title": "Notes",
    "documents": [
        {
            "id": 1,
            "title": "First post",
            "content": "<p>Some code:</p>\n<pre lang=\"python\" line=\"3\">\ndef f():\n    return 1\n</pre>\n<p>Done.</p>",
            "excerpt": "Teaser <pre lang=\"sh\" cssfile=\"none\">ls</pre>",
            "comments": [
                {"id": 10, "author": "ann", "content": "Try <pre lang=\"python\">print(1)</pre>"},
                {"id": 11, "author": "bot", "content": "<pre>spam</pre>", "approved": false}
            ]
        }
    ]
}"#;

#[test]
fn test_render_site() {
    let temp_dir = tempdir().unwrap();
    let site = temp_dir.path().join("site.json");
    let out = temp_dir.path().join("index.html");
    let assets = temp_dir.path().join("assets");
    fs::create_dir(&assets).unwrap();
    fs::write(assets.join("fenceguard.css"), "").unwrap();
    fs::write(&site, SITE).unwrap();

    fenceguard()
        .arg("--no-config")
        .arg("render")
        .arg(&site)
        .arg("-o")
        .arg(&out)
        .arg("--assets-dir")
        .arg(&assets)
        .arg("--assets-url")
        .arg("/static")
        .assert()
        .success();

    let page = fs::read_to_string(&out).unwrap();
    assert!(page.contains("<title>Notes</title>"));
    assert!(page.contains("<link rel=\"stylesheet\" href=\"/static/fenceguard.css\""));
    assert_eq!(page.matches("<style type=\"text/css\">").count(), 1);
    assert!(page.contains(".python.hl-code"));
    assert!(page.contains("<ol start=\"3\">"));
    assert!(page.contains("<div class=\"fenceguard-wrap5\">"));
    assert!(page.contains("<p class=\"author\">ann</p>"));
    assert!(page.contains("print"));
    assert!(!page.contains("spam"));
    assert!(!page.contains("<pre lang="));
    for index in ["_000000", "_000001", "_000002"] {
        assert!(!page.contains(index), "placeholder {index} survived");
    }
}

#[test]
fn test_highlight_stdin_without_fences() {
    fenceguard()
        .args(["--no-config", "highlight"])
        .write_stdin("<p>plain text</p>")
        .assert()
        .success()
        .stdout("<p>plain text</p>");
}

#[test]
fn test_highlight_file_with_head() {
    let temp_dir = tempdir().unwrap();
    let file = temp_dir.path().join("fragment.html");
    fs::write(&file, "<pre lang=\"rust\" cssfile=\"none\">fn main() {}</pre>").unwrap();

    // No assets directory in the working directory, so the head holds only the stylesheet
    fenceguard()
        .current_dir(temp_dir.path())
        .args(["--no-config", "highlight", "--with-head"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("<style type=\"text/css\">"))
        .stdout(predicate::str::contains("<pre class=\"rust hl-code\">"))
        .stdout(predicate::str::contains("wrap5").not());
}

#[test]
fn test_custom_tag_from_config() {
    let temp_dir = tempdir().unwrap();
    let config = temp_dir.path().join("fenceguard.toml");
    fs::write(&config, "[fence]\ntag = \"fence\"\n").unwrap();

    fenceguard()
        .arg("--config")
        .arg(&config)
        .arg("highlight")
        .write_stdin("<fence language=\"python\" styleTarget=\"none\">x = 1</fence><pre>kept</pre>")
        .assert()
        .success()
        .stdout(predicate::str::contains("<pre class=\"python hl-code\">"))
        .stdout(predicate::str::contains("<pre>kept</pre>"));
}

#[test]
fn test_missing_config_is_tool_error() {
    fenceguard()
        .args(["--config", "does-not-exist.toml", "config"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_invalid_theme_is_tool_error() {
    let temp_dir = tempdir().unwrap();
    let config = temp_dir.path().join("fenceguard.toml");
    fs::write(&config, "[highlight]\ntheme = \"no-such-theme\"\n").unwrap();

    fenceguard()
        .arg("--config")
        .arg(&config)
        .arg("highlight")
        .write_stdin("<pre>x</pre>")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no-such-theme"));
}

#[test]
fn test_init_then_config() {
    let temp_dir = tempdir().unwrap();

    fenceguard()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains(".fenceguard.toml"));
    assert!(temp_dir.path().join(".fenceguard.toml").exists());

    fenceguard().current_dir(temp_dir.path()).arg("init").assert().code(2);

    fenceguard()
        .current_dir(temp_dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("# Loaded from"))
        .stdout(predicate::str::contains("tag = \"pre\""));
}

#[test]
fn test_config_defaults_and_schema() {
    fenceguard()
        .args(["config", "--defaults"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Built-in defaults"))
        .stdout(predicate::str::contains("[language-aliases]").or(predicate::str::contains("[fence]")));

    fenceguard()
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("max-body-bytes"));
}

#[test]
fn test_themes_lists_default_theme() {
    fenceguard()
        .arg("themes")
        .assert()
        .success()
        .stdout(predicate::str::contains("InspiredGitHub"));
}
