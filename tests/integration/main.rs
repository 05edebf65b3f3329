//! Integration tests for burrow

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn burrow() -> Command {
        cargo_bin_cmd!("burrow")
    }

    fn registry_with(content: &str) -> (TempDir, std::path::PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("toolsets.toml");
        fs::write(&path, content).unwrap();
        (temp, path)
    }

    #[test]
    fn help_displays() {
        burrow()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("chroot environments"));
    }

    #[test]
    fn version_displays() {
        burrow()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("burrow"));
    }

    #[test]
    fn list_shows_toolsets() {
        let (_temp, path) = registry_with(
            r#"
            [[toolset]]
            name = "sid"
            backend = "cowbuilder"
            packages = "gcc make"
            "#,
        );
        burrow()
            .args(["list"])
            .env("BURROW_REGISTRY", &path)
            .assert()
            .success()
            .stdout(predicate::str::contains("sid (cowbuilder)"));
    }

    #[test]
    fn list_empty_registry() {
        let (_temp, path) = registry_with("");
        burrow()
            .args(["list"])
            .env("BURROW_REGISTRY", &path)
            .assert()
            .success()
            .stdout(predicate::str::contains("No toolsets configured"));
    }

    #[test]
    fn missing_registry_fails_with_hint() {
        burrow()
            .args(["list"])
            .env("BURROW_REGISTRY", "/nonexistent/toolsets.toml")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Toolset registry not found"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn invalid_registry_fails() {
        let (_temp, path) = registry_with("[[toolset]\nname=");
        burrow()
            .args(["list"])
            .env("BURROW_REGISTRY", &path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid toolset registry"));
    }

    #[test]
    fn setup_unknown_toolset_fails() {
        let (_temp, path) = registry_with("");
        burrow()
            .args(["setup", "wheezy"])
            .env("BURROW_REGISTRY", &path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Toolset not found"));
    }

    #[test]
    fn status_runs() {
        // Probes may fail if no backend tools are installed, but must not panic
        let (_temp, path) = registry_with(
            r#"
            [[toolset]]
            name = "fedora"
            backend = "mock"
            "#,
        );
        let _ = burrow()
            .args(["status"])
            .env("BURROW_REGISTRY", &path)
            .assert();
    }

    #[test]
    fn run_requires_command() {
        burrow().args(["run", "sid"]).assert().failure();
    }
}
