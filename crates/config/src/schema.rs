//! Config schema types (telegram, operator hand-off, LLM, leads).

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    studybot_common::OperatorId,
};

/// Default LLM endpoint: the Hugging Face router speaks the OpenAI chat API.
pub const DEFAULT_LLM_BASE_URL: &str = "https://router.huggingface.co/v1";
pub const DEFAULT_LLM_MODEL: &str = "openai/gpt-oss-120b";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudybotConfig {
    pub telegram: TelegramConfig,
    pub handoff: HandoffConfig,
    pub llm: LlmConfig,
    pub leads: LeadsConfig,
}

/// Telegram bot account.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Long-polling timeout passed to `getUpdates` (seconds).
    pub poll_timeout_secs: u32,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            poll_timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

/// Operator pool and routing policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoffConfig {
    /// Eligible operators, in routing tie-break order.
    pub operators: Vec<OperatorEntry>,

    /// Concurrent conversations per operator unless the entry overrides it.
    pub max_active_per_operator: usize,

    /// Interval between background wait-queue sweeps (seconds).
    pub sweep_interval_secs: u64,

    /// Routing is refused outside this window. Absent means always open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_hours: Option<WorkingHoursConfig>,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            operators: Vec::new(),
            max_active_per_operator: 3,
            sweep_interval_secs: 300,
            working_hours: None,
        }
    }
}

/// One operator account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperatorEntry {
    pub id: OperatorId,

    /// Display name shown to users once connected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Per-operator cap; falls back to `max_active_per_operator`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_active: Option<usize>,
}

impl OperatorEntry {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self {
            id: OperatorId(id),
            name: None,
            max_active: None,
        }
    }
}

/// Daily window during which operators accept new conversations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkingHoursConfig {
    /// Start time in HH:MM format.
    pub start: String,
    /// End time in HH:MM format; "24:00" means end of day.
    pub end: String,
    /// IANA timezone (e.g. "Europe/Moscow") or "local".
    pub timezone: String,
}

impl Default for WorkingHoursConfig {
    fn default() -> Self {
        Self {
            start: "09:00".into(),
            end: "21:00".into(),
            timezone: "local".into(),
        }
    }
}

impl WorkingHoursConfig {
    /// Start and end as minutes since midnight. The end may be 1440 ("24:00").
    pub fn window_minutes(&self) -> Result<(u32, u32), String> {
        let start = parse_hhmm(&self.start)
            .ok_or_else(|| format!("invalid start time {:?}, expected HH:MM", self.start))?;
        let end = if self.end.trim() == "24:00" {
            24 * 60
        } else {
            parse_hhmm(&self.end)
                .ok_or_else(|| format!("invalid end time {:?}, expected HH:MM", self.end))?
        };
        Ok((start, end))
    }

    /// `None` for "local" (or empty), otherwise the parsed IANA zone.
    pub fn tz(&self) -> Result<Option<chrono_tz::Tz>, String> {
        let tz = self.timezone.trim();
        if tz.is_empty() || tz.eq_ignore_ascii_case("local") {
            return Ok(None);
        }
        tz.parse::<chrono_tz::Tz>()
            .map(Some)
            .map_err(|_| format!("unknown timezone {tz:?}"))
    }
}

fn parse_hhmm(s: &str) -> Option<u32> {
    use chrono::Timelike;
    chrono::NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .ok()
        .map(|t| t.hour() * 60 + t.minute())
}

/// OpenAI-compatible completion endpoint.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    #[serde(serialize_with = "serialize_secret")]
    pub api_key: Secret<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.into(),
            api_key: Secret::new(String::new()),
            model: DEFAULT_LLM_MODEL.into(),
            max_tokens: 500,
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Lead qualification thresholds and canned contact text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadsConfig {
    /// Interest score (0..=10) at which the "contact a manager" button is offered.
    pub notification_threshold: u8,
    /// Shown when a user asks for a manager.
    pub contact_message: String,
}

impl Default for LeadsConfig {
    fn default() -> Self {
        Self {
            notification_threshold: 7,
            contact_message: "Our manager will get in touch with you shortly.\n\nEmail: info@example.com\nTelegram: @education_support".into(),
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
