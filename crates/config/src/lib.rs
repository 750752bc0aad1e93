//! Configuration loading, validation and env substitution.
//!
//! Config files: `studybot.toml`, `studybot.yaml` or `studybot.json`,
//! searched in `./` then the user config directory (`~/.config/studybot/`).
//!
//! `${ENV_VAR}` placeholders are substituted in the raw text before parsing,
//! and a handful of well-known environment variables override file values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod template;
pub mod validate;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, find_config_file, load_config},
    schema::{
        HandoffConfig, LeadsConfig, LlmConfig, OperatorEntry, StudybotConfig, TelegramConfig,
        WorkingHoursConfig,
    },
    template::default_config_template,
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
