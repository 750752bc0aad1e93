use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    env_subst::substitute_env,
    schema::{OperatorEntry, StudybotConfig},
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "studybot.toml",
    "studybot.yaml",
    "studybot.yml",
    "studybot.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<StudybotConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path).with_context(|| format!("failed to parse {}", path.display()))
}

/// Discover and load config from standard locations, then apply env overrides.
///
/// Search order:
/// 1. `./studybot.{toml,yaml,yml,json}`
/// 2. `~/.config/studybot/studybot.{toml,yaml,yml,json}`
///
/// Falls back to defaults when no file is found or the file is unreadable.
pub fn discover_and_load() -> StudybotConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            match load_config(&path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                    StudybotConfig::default()
                },
            }
        },
        None => {
            debug!("no config file found, using defaults");
            StudybotConfig::default()
        },
    };
    apply_env_overrides(&mut config);
    config
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/studybot/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "studybot").map(|d| d.config_dir().to_path_buf())
}

/// Apply well-known environment variables on top of file values.
///
/// - `TELEGRAM_TOKEN` replaces `telegram.token`
/// - `LLM_API_KEY` (or `HUGGING_FACE_TOKEN`) replaces `llm.api_key`
/// - `OPERATOR_IDS` (comma separated) replaces `handoff.operators`
pub fn apply_env_overrides(config: &mut StudybotConfig) {
    apply_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_overrides_with(config: &mut StudybotConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(token) = lookup("TELEGRAM_TOKEN").filter(|v| !v.trim().is_empty()) {
        config.telegram.token = Secret::new(token.trim().to_string());
    }

    if let Some(key) = lookup("LLM_API_KEY")
        .or_else(|| lookup("HUGGING_FACE_TOKEN"))
        .filter(|v| !v.trim().is_empty())
    {
        config.llm.api_key = Secret::new(key.trim().to_string());
    }

    if let Some(ids) = lookup("OPERATOR_IDS") {
        let mut operators = Vec::new();
        for part in ids.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.parse::<i64>() {
                Ok(id) => operators.push(OperatorEntry::new(id)),
                Err(e) => warn!(value = part, error = %e, "ignoring invalid operator id in OPERATOR_IDS"),
            }
        }
        if !operators.is_empty() {
            config.handoff.operators = operators;
        }
    }
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<StudybotConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
