//! Lead qualification: when to offer a manager, and what the operator sees.

use std::fmt;

use crate::sessions::{Session, Stage};

/// History lines included in a lead report.
const REPORT_HISTORY: usize = 3;

pub fn should_notify_manager(session: &Session, threshold: u8) -> bool {
    session.interest_score >= threshold && session.stage == Stage::ShowingResults
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadPriority {
    Hot,
    Warm,
    Cold,
    Frozen,
}

impl LeadPriority {
    pub fn from_score(score: u8) -> Self {
        match score {
            70.. => Self::Hot,
            50..=69 => Self::Warm,
            30..=49 => Self::Cold,
            _ => Self::Frozen,
        }
    }
}

impl fmt::Display for LeadPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hot => "🔥 Hot",
            Self::Warm => "🌡️ Warm",
            Self::Cold => "❄️ Cold",
            Self::Frozen => "🧊 Frozen",
        })
    }
}

/// 0..=100: profile completeness up to 30, dialogue activity up to 25,
/// interest up to 45.
pub fn lead_score(session: &Session) -> u8 {
    let completeness = session.profile.filled_fields() as f64 / 4.0 * 30.0;
    let activity = match session.history.len() {
        11.. => 25.0,
        6..=10 => 15.0,
        3..=5 => 10.0,
        _ => 0.0,
    };
    let interest = f64::from(session.interest_score) * 4.5;
    (completeness + activity + interest).min(100.0) as u8
}

pub fn lead_priority(score: u8) -> LeadPriority {
    LeadPriority::from_score(score)
}

/// Text block shown to the operator when a conversation starts.
pub fn lead_report(session: &Session) -> String {
    let who = match &session.name {
        Some(name) => format!("{name} (id {})", session.user_id),
        None => format!("id {}", session.user_id),
    };
    let score = lead_score(session);
    let topic = session
        .profile
        .operator_topic
        .map_or("not specified", |t| t.label());
    let recent = if session.history.is_empty() {
        "No messages".to_string()
    } else {
        let skip = session.history.len().saturating_sub(REPORT_HISTORY);
        session.history[skip..].join("\n")
    };

    format!(
        "👤 Client: {who}\n\
         📊 Interest: {}/10\n\
         🎯 Lead score: {score}/100 {}\n\
         📝 Topic: {topic}\n\
         🗂 Profile: {}\n\n\
         💬 Recent messages:\n{recent}\n\n\
         🕐 {}",
        session.interest_score,
        lead_priority(score),
        session.profile.to_json(),
        session.last_activity.format("%H:%M %d.%m.%Y UTC"),
    )
}
