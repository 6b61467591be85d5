//! Integration tests for docfold

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Isolated config: cache, work dir and config file inside a temp dir,
    /// and an API base nothing listens on
    struct Sandbox {
        dir: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            let sandbox = Self {
                dir: TempDir::new().unwrap(),
            };
            let config = format!(
                r#"[general]
history = false

[source]
api_base = "http://127.0.0.1:9"
clone_url = "{clone}"
timeout_secs = 2

[cache]
path = "{cache}"

[pipeline]
work_dir = "{work}"
overwrite = "fail"
fetch_timeout_secs = 30
"#,
                clone = toml_path(&sandbox.path("no-such-repo")),
                cache = toml_path(&sandbox.cache_path()),
                work = toml_path(&sandbox.work_dir()),
            );
            std::fs::write(sandbox.config_path(), config).unwrap();
            sandbox
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn config_path(&self) -> PathBuf {
            self.path("config.toml")
        }

        fn cache_path(&self) -> PathBuf {
            self.path("cache").join("metadata.cache")
        }

        fn work_dir(&self) -> PathBuf {
            self.path("work")
        }

        fn seed_cache(&self) {
            let at = chrono::Utc::now().to_rfc3339();
            std::fs::create_dir_all(self.cache_path().parent().unwrap()).unwrap();
            std::fs::write(
                self.cache_path(),
                format!(
                    "vercel/next.js:latest_tag=v14.0.0\n@vercel/next.js:latest_tag={at}\n\
                     vercel/next.js:last_update=2023-10-26\n@vercel/next.js:last_update={at}\n"
                ),
            )
            .unwrap();
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("docfold");
            cmd.env("DOCFOLD_CONFIG", self.config_path())
                .env_remove("RUST_LOG")
                .env_remove("GITHUB_TOKEN");
            cmd
        }
    }

    fn toml_path(path: &Path) -> String {
        path.display().to_string().replace('\\', "\\\\")
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("docfold")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("documentation"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("docfold")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("docfold"));
    }

    #[test]
    fn config_path_honors_env() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_reads_file() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("http://127.0.0.1:9"));
    }

    #[test]
    fn config_set_persists() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "set", "source.owner", "tauri-apps"])
            .assert()
            .success();

        let saved = std::fs::read_to_string(sandbox.config_path()).unwrap();
        assert!(saved.contains("owner = \"tauri-apps\""));
        assert!(saved.contains("api_base = \"http://127.0.0.1:9\""));
    }

    #[test]
    fn config_init_replaces_broken_file_with_force() {
        let sandbox = Sandbox::new();
        std::fs::write(sandbox.config_path(), "[source\nowner = ").unwrap();

        sandbox
            .cmd()
            .arg("status")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("config init --force"));

        sandbox
            .cmd()
            .args(["config", "init", "--force"])
            .assert()
            .success();
        sandbox.cmd().args(["config", "show"]).assert().success();
    }

    #[test]
    fn unreachable_source_without_cache_creates_nothing() {
        let sandbox = Sandbox::new();

        sandbox
            .cmd()
            .arg("build")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Could not resolve latest release tag"));

        assert!(!sandbox.work_dir().exists());
        assert!(!sandbox.cache_path().exists());
    }

    #[test]
    fn bare_invocation_runs_build() {
        let sandbox = Sandbox::new();

        sandbox
            .cmd()
            .assert()
            .failure()
            .stderr(predicate::str::contains("Could not resolve"));

        assert!(!sandbox.work_dir().exists());
    }

    #[test]
    fn offline_build_without_cache_fails() {
        let sandbox = Sandbox::new();

        sandbox
            .cmd()
            .args(["build", "--offline"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("offline and nothing cached"))
            .stderr(predicate::str::contains("without --offline"));
    }

    #[test]
    fn offline_build_uses_cache_and_reports_fetch_failure() {
        let sandbox = Sandbox::new();
        sandbox.seed_cache();

        sandbox
            .cmd()
            .args(["build", "--offline"])
            .assert()
            .failure()
            .stderr(
                predicate::str::contains("Fetching documents failed")
                    .or(predicate::str::contains("Command failed: git")),
            );

        let docs = sandbox.work_dir().join("next-js--v14.0.0--2023-10-26");
        assert!(!docs.exists());
        let leftovers = std::fs::read_dir(sandbox.work_dir()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn status_reports_cached_version() {
        let sandbox = Sandbox::new();
        sandbox.seed_cache();

        sandbox
            .cmd()
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("release tag: v14.0.0 (fresh"))
            .stdout(predicate::str::contains("next-js--v14.0.0--2023-10-26"));
    }

    #[test]
    fn status_without_cache() {
        let sandbox = Sandbox::new();

        sandbox
            .cmd()
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached metadata"));
    }

    #[test]
    fn cache_show_formats() {
        let sandbox = Sandbox::new();
        sandbox.seed_cache();

        sandbox
            .cmd()
            .args(["cache", "show", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "vercel/next.js:latest_tag=v14.0.0",
            ));

        sandbox
            .cmd()
            .args(["cache", "show", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"value\": \"2023-10-26\""));
    }

    #[test]
    fn cache_show_empty() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["cache", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached entries"));
    }

    #[test]
    fn cache_clear_needs_confirmation() {
        let sandbox = Sandbox::new();
        sandbox.seed_cache();

        sandbox
            .cmd()
            .args(["cache", "clear"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cancelled"));
        assert!(sandbox.cache_path().exists());

        sandbox
            .cmd()
            .args(["cache", "clear", "--yes"])
            .assert()
            .success();
        assert!(!sandbox.cache_path().exists());
    }

    #[test]
    fn completions_generate() {
        cargo_bin_cmd!("docfold")
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("docfold"));
    }

    #[test]
    fn refresh_and_offline_conflict() {
        cargo_bin_cmd!("docfold")
            .args(["build", "--refresh", "--offline"])
            .assert()
            .failure();
    }
}
