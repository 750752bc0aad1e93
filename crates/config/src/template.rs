//! Default configuration template with all options documented.
//!
//! Written by `studybot init` so operators see every knob even if they keep
//! the defaults.

/// Render the default config file.
pub fn default_config_template() -> String {
    r##"# Studybot Configuration
# ======================
# Environment variable substitution is supported: ${ENV_VAR}
# TELEGRAM_TOKEN, LLM_API_KEY and OPERATOR_IDS in the environment override
# the values below.

[telegram]
token = "${TELEGRAM_TOKEN}"       # Bot token from @BotFather
poll_timeout_secs = 30            # Long-polling timeout for getUpdates

[handoff]
max_active_per_operator = 3       # Concurrent conversations per operator
sweep_interval_secs = 300         # How often queued users are retried

# One block per operator, in tie-break order.
# [[handoff.operators]]
# id = 123456789                  # Telegram user id of the operator
# name = "Anna"                   # Shown to users once connected (optional)
# max_active = 5                  # Per-operator cap (optional)

# Routing is refused outside this window. Remove the block for 24/7.
# [handoff.working_hours]
# start = "09:00"
# end = "21:00"
# timezone = "Europe/Moscow"      # IANA name or "local"

[llm]
base_url = "https://router.huggingface.co/v1"   # Any OpenAI-compatible endpoint
api_key = "${LLM_API_KEY}"
model = "openai/gpt-oss-120b"
max_tokens = 500
temperature = 0.7
timeout_secs = 60

[leads]
notification_threshold = 7        # Interest score (0-10) that offers a manager
"##
    .to_string()
}
