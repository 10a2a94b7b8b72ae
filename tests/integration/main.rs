//! Integration tests for Tilawah

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn tilawah(config: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("tilawah");
        cmd.env("TILAWAH_CONFIG", config).env("CI", "1");
        cmd
    }

    /// Config with stores and queue inside `dir`, pointed at `upstream`
    fn write_config(dir: &Path, upstream: &str) -> std::path::PathBuf {
        let path = dir.join("config.toml");
        let content = format!(
            r#"
[cache]
dir = '{caches}'

[sync]
path = '{queue}'

[network]
upstream = "{upstream}"
request_timeout_secs = 2
probe_interval_secs = 0

[routes]
manifest = ["/", "/favicon.ico"]
"#,
            caches = dir.join("caches").display(),
            queue = dir.join("queue.json").display(),
        );
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Answers every request with 200 and the request path as body
    fn spawn_upstream() -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        std::thread::spawn(move || {
            for request in server.incoming_requests() {
                let body = request.url().to_string();
                let _ = request.respond(tiny_http::Response::from_string(body));
            }
        });
        format!("http://{}", addr)
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        tilawah(&temp.path().join("config.toml"))
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("offline caching front"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        tilawah(&temp.path().join("config.toml"))
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("tilawah"));
    }

    #[test]
    fn config_path_uses_env() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        tilawah(&path)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let temp = TempDir::new().unwrap();
        tilawah(&temp.path().join("config.toml"))
            .args(["config", "show", "--ephemeral"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("indoquran-api-cache"));
    }

    #[test]
    fn config_init_then_set() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        tilawah(&path)
            .args(["config", "init", "--ephemeral"])
            .assert()
            .success();
        assert!(path.exists());

        tilawah(&path)
            .args(["config", "set", "cache.static_version", "v2", "--ephemeral"])
            .assert()
            .success();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("static_version = \"v2\""));
    }

    #[test]
    fn invalid_config_reports_hint() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[cache\n").unwrap();

        tilawah(&path)
            .args(["status"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn cache_list_empty_when_ephemeral() {
        let temp = TempDir::new().unwrap();
        tilawah(&temp.path().join("config.toml"))
            .args(["cache", "list", "--ephemeral"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache stores found"));
    }

    #[test]
    fn completions_generate() {
        let temp = TempDir::new().unwrap();
        tilawah(&temp.path().join("config.toml"))
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("tilawah"));
    }

    #[test]
    fn fetch_rejects_absolute_url() {
        let temp = TempDir::new().unwrap();
        tilawah(&temp.path().join("config.toml"))
            .args(["fetch", "https://example.com/", "--ephemeral"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("origin-relative"));
    }

    #[test]
    fn offline_api_fetch_returns_offline_body() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "http://127.0.0.1:9");

        tilawah(&path)
            .args(["fetch", "/api/surahs", "--ephemeral"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"offline\":true"))
            .stderr(predicate::str::contains("Offline:"));
    }

    #[test]
    fn install_fails_when_upstream_unreachable() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "http://127.0.0.1:9");

        tilawah(&path)
            .args(["install", "--ephemeral"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("tilawah install"));
    }

    #[test]
    fn install_precaches_manifest_to_disk() {
        let temp = TempDir::new().unwrap();
        let upstream = spawn_upstream();
        let path = write_config(temp.path(), &upstream);

        tilawah(&path)
            .args(["install"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Precached 2 assets"));

        tilawah(&path)
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("indoquran-cache-v1"));

        tilawah(&path)
            .args(["cache", "entries", "indoquran-cache-v1", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("GET /favicon.ico"));
    }

    #[test]
    fn fetch_through_live_upstream() {
        let temp = TempDir::new().unwrap();
        let upstream = spawn_upstream();
        let path = write_config(temp.path(), &upstream);

        tilawah(&path)
            .args(["fetch", "-i", "/api/surahs", "--ephemeral"])
            .assert()
            .success()
            .stdout(predicate::str::contains("HTTP 200"))
            .stdout(predicate::str::contains("/api/surahs"));
    }

    #[test]
    fn sync_status_empty() {
        let temp = TempDir::new().unwrap();
        tilawah(&temp.path().join("config.toml"))
            .args(["sync", "status", "--ephemeral"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Sync queue is empty"));
    }
}
