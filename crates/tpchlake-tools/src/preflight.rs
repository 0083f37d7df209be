//! Environment checks run by `setup` before anything touches data.

use std::io::{self, Write};
use std::path::Path;

use duckdb::Connection;
use sysinfo::Disks;

use crate::config::TpchConfig;
use crate::generator;

/// Free space needed for a scale-1 run plus the lake copy.
pub const REQUIRED_DISK_BYTES: u64 = 2 * 1024 * 1024 * 1024;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Result of a preflight check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub success: bool,
    pub message: String,
    pub hint: Option<String>,
}

impl CheckResult {
    pub fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            success: true,
            message: message.to_string(),
            hint: None,
        }
    }

    pub fn fail(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }
}

/// Run every check in order.
pub fn run_checks(config: &TpchConfig, workdir: &Path) -> Vec<CheckResult> {
    vec![
        check_generator(&config.generator.command),
        check_ducklake_extension(),
        check_disk_space(workdir, REQUIRED_DISK_BYTES),
    ]
}

/// The generator answers `--version`.
pub fn check_generator(command: &[String]) -> CheckResult {
    let name = "Generator";
    match generator::probe_version(command) {
        Ok(version) if version.is_empty() => CheckResult::ok(name, &command.join(" ")),
        Ok(version) => CheckResult::ok(name, &version),
        Err(e) => CheckResult::fail(
            name,
            &e.to_string(),
            "Install tpchgen-cli (e.g. `uv add tpchgen-cli`) or set generator.command",
        ),
    }
}

/// DuckLake installs and loads on a scratch connection.
pub fn check_ducklake_extension() -> CheckResult {
    let name = "DuckLake";
    let loaded = Connection::open_in_memory()
        .and_then(|conn| conn.execute_batch("INSTALL ducklake; LOAD ducklake;"));
    match loaded {
        Ok(()) => CheckResult::ok(name, "extension installed and loaded"),
        Err(e) => CheckResult::fail(
            name,
            &e.to_string(),
            "Check network access to the DuckDB extension repository",
        ),
    }
}

/// At least `required` bytes free on the disk holding `workdir`.
pub fn check_disk_space(workdir: &Path, required: u64) -> CheckResult {
    let name = "Disk space";
    match available_space(workdir) {
        Some(available) => disk_space_result(available, required),
        None => CheckResult::fail(
            name,
            &format!("could not determine free space for {}", workdir.display()),
            "Make sure the working directory is on a mounted disk",
        ),
    }
}

fn disk_space_result(available: u64, required: u64) -> CheckResult {
    let name = "Disk space";
    let available_gb = available as f64 / GIB;
    if available >= required {
        CheckResult::ok(name, &format!("{:.1}GB available", available_gb))
    } else {
        CheckResult::fail(
            name,
            &format!(
                "Not enough disk space (~{}GB required). Available: {:.1}GB",
                required / (1024 * 1024 * 1024),
                available_gb
            ),
            "Free up space or lower TPCH_SCALE",
        )
    }
}

/// Free bytes on the disk whose mount point is the longest prefix of `path`.
fn available_space(path: &Path) -> Option<u64> {
    let path = path.canonicalize().ok()?;
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}

/// Print check results.
pub fn print_results<W: Write>(out: &mut W, results: &[CheckResult]) -> io::Result<()> {
    for result in results {
        if result.success {
            writeln!(out, "[OK] {}: {}", result.name, result.message)?;
        } else {
            writeln!(out, "[FAIL] {}: {}", result.name, result.message)?;
            if let Some(ref hint) = result.hint {
                writeln!(out, "  -> {}", hint)?;
            }
        }
    }
    Ok(())
}

/// Check if all preflight checks passed.
pub fn all_passed(results: &[CheckResult]) -> bool {
    results.iter().all(|r| r.success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_space_result() {
        let ok = disk_space_result(3 * 1024 * 1024 * 1024, REQUIRED_DISK_BYTES);
        assert!(ok.success);
        assert_eq!(ok.message, "3.0GB available");

        let low = disk_space_result(512 * 1024 * 1024, REQUIRED_DISK_BYTES);
        assert!(!low.success);
        assert_eq!(
            low.message,
            "Not enough disk space (~2GB required). Available: 0.5GB"
        );
    }

    #[test]
    fn test_check_generator_missing() {
        let result = check_generator(&["definitely-not-a-real-generator".to_string()]);
        assert!(!result.success);
        assert!(result.hint.is_some());
    }

    #[test]
    fn test_check_disk_space_zero_requirement() {
        let dir = tempfile::tempdir().unwrap();
        // Any resolvable disk satisfies a zero byte requirement.
        let result = check_disk_space(dir.path(), 0);
        if available_space(dir.path()).is_some() {
            assert!(result.success);
        } else {
            assert!(!result.success);
        }
    }

    #[test]
    fn test_print_results_and_all_passed() {
        let results = vec![
            CheckResult::ok("Generator", "tpchgen-cli 2.0.1"),
            CheckResult::fail("Disk space", "too small", "free space"),
        ];
        let mut out = Vec::new();
        print_results(&mut out, &results).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "[OK] Generator: tpchgen-cli 2.0.1\n[FAIL] Disk space: too small\n  -> free space\n"
        );
        assert!(!all_passed(&results));
        assert!(all_passed(&results[..1]));
    }
}
