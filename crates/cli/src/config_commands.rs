use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use studybot_config::{Severity, StudybotConfig, default_config_template, validate};

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

const CONFIG_FILENAME: &str = "studybot.toml";

/// Print diagnostics for `config` and fail the process when any is an error.
pub fn check(config: &StudybotConfig, source: Option<&Path>) -> Result<()> {
    match source {
        Some(path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("No config file found; checking defaults and environment.\n"),
    }

    let result = validate(config);
    for d in &result.diagnostics {
        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
        };
        eprintln!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
    }

    let errors = count(&result.diagnostics, Severity::Error);
    let warnings = count(&result.diagnostics, Severity::Warning);
    if !result.diagnostics.is_empty() {
        eprintln!();
    }
    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn count(diagnostics: &[studybot_config::Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}

/// Where `init` writes when no `--config` path is given.
pub fn default_config_path() -> Result<PathBuf> {
    let dir = studybot_config::config_dir().context("could not determine the user config directory")?;
    Ok(dir.join(CONFIG_FILENAME))
}

/// Write the documented template to `path`, creating parent directories.
pub fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, default_config_template())
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_template_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILENAME);

        init(&path, false).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, default_config_template());

        std::fs::write(&path, "# edited").unwrap();
        let err = init(&path, false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# edited");

        init(&path, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), written);
    }

    #[test]
    fn written_template_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        init(&path, false).unwrap();
        let config = studybot_config::load_config(&path).unwrap();
        assert_eq!(config.telegram.poll_timeout_secs, 30);
        assert_eq!(config.handoff.max_active_per_operator, 3);
    }
}
