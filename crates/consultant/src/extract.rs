//! Keyword-based profile extraction and interest scoring.
//!
//! Plain substring matching over lowercased text, with Russian and English
//! keyword lists. Very short tokens ("ит", "ai", "ml") need word boundaries.

use std::sync::LazyLock;

use regex::Regex;

use crate::profile::{Degree, Field, Language, Profile};

const MASTER_WORDS: &[&str] = &[
    "магистр",
    "магистратура",
    "магистерская",
    "второе высшее",
    "master",
    "msc",
    "postgraduate",
];
const BACHELOR_WORDS: &[&str] = &[
    "бакалавр",
    "бакалавриат",
    "первое высшее",
    "первое образование",
    "bachelor",
    "bsc",
    "undergraduate",
];
/// School leavers go for a bachelor's.
const SCHOOL_WORDS: &[&str] = &[
    "школу",
    "школы",
    "окончил школу",
    "выпускник",
    "11 класс",
    "high school",
    "school leaver",
    "finishing school",
];
/// Someone who already holds a degree goes for a master's.
const DIPLOMA_WORDS: &[&str] = &[
    "диплом",
    "высшее",
    "университет окончил",
    "already have a degree",
    "graduated from university",
];

const IT_WORDS: &[&str] = &[
    "программирование",
    "компьютер",
    "софт",
    "разработка",
    "кодинг",
    "programming",
    "computer",
    "software",
    "development",
    "coding",
];
const AI_WORDS: &[&str] = &[
    "искусственный интеллект",
    "машинное обучение",
    "artificial intelligence",
    "machine learning",
];
const DATA_WORDS: &[&str] = &[
    "data science",
    "данные",
    "данных",
    "аналитика",
    "большие данные",
    "analytics",
    "data analysis",
    "big data",
];
const BUSINESS_WORDS: &[&str] = &[
    "бизнес",
    "менеджмент",
    "управление",
    "mba",
    "экономика",
    "business",
    "management",
    "economics",
];

const FREE_WORDS: &[&str] = &[
    "бесплатно",
    "без платы",
    "даром",
    "не платить",
    "free",
    "no tuition",
];
const ENGLISH_WORDS: &[&str] = &["английский", "english", "англ", "ielts", "toefl"];

const HIGH_INTEREST: &[&str] = &[
    "хочу поступать",
    "когда подавать",
    "какие документы",
    "помогите подать",
    "want to apply",
    "when to apply",
    "what documents",
    "which documents",
    "help me apply",
];
const MEDIUM_INTEREST: &[&str] = &[
    "интересно",
    "подходит",
    "рассматриваю",
    "думаю",
    "планирую",
    "interested",
    "suits me",
    "considering",
    "thinking about",
    "planning",
];
const LOW_INTEREST: &[&str] = &[
    "просто узнать",
    "в будущем",
    "может быть",
    "just curious",
    "in the future",
    "maybe",
];
const DETAIL_WORDS: &[&str] = &[
    "стоимость",
    "цена",
    "дедлайн",
    "требования",
    "cost",
    "price",
    "deadline",
    "requirements",
    "tuition",
];

const STUDY_TRIGGERS: &[&str] = &["хочу учиться", "want to study"];
const PROCESS_TRIGGERS: &[&str] = &["процессе", "процесс поступления", "process"];
const MANAGER_TRIGGERS: &[&str] = &[
    "связаться с менеджером",
    "contact a manager",
    "contact manager",
    "talk to a manager",
];

static IT_TOKEN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\bит\b").ok());
/// Matched against the original text: lowercase "it" is an English pronoun.
static IT_UPPER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\bIT\b").ok());
static AI_TOKEN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\b(?:ии|ai|ml)\b").ok());

/// Digit groups like "5 000" or "5,000".
static THOUSANDS_SEP: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d)[ ,.](\d{3})\b").ok());

/// Tried in order, the first match provides the amount.
static BUDGET_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(\d+)[^\d]*(?:евро|€|euro|eur)",
        r"(\d+)[^\d]*(?:доллар|\$|usd|dollar)",
        r"(\d+)\s*(?:тысяч|тыс|thousand|k\b)",
        r"(?:до|up to|under|max)\s*€?\s*(\d+)",
        r"(\d+)\s*(?:в год|per year|a year|/year)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});
static THOUSANDS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\d\s*(?:тысяч|тыс|thousand|k\b)").ok());

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

fn count_matches(text: &str, words: &[&str]) -> u32 {
    words.iter().filter(|w| text.contains(*w)).count() as u32
}

fn is_match(re: &LazyLock<Option<Regex>>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

/// Update `profile` with whatever the message reveals. Unknown values stay untouched.
pub fn extract_profile(message: &str, profile: &mut Profile) {
    let lower = message.to_lowercase();

    if let Some(degree) = detect_degree(&lower) {
        profile.degree = Some(degree);
    }

    let fields = detect_fields(message, &lower);
    if !fields.is_empty() {
        profile.fields = fields;
    }

    if let Some(budget) = parse_budget(&lower) {
        profile.max_budget = Some(budget);
    }
    if wants_free_tuition(&lower) {
        profile.max_budget = Some(0);
    }

    if contains_any(&lower, ENGLISH_WORDS) {
        profile.language = Some(Language::English);
    }
}

fn detect_degree(lower: &str) -> Option<Degree> {
    if contains_any(lower, MASTER_WORDS) {
        Some(Degree::Master)
    } else if contains_any(lower, BACHELOR_WORDS) || contains_any(lower, SCHOOL_WORDS) {
        Some(Degree::Bachelor)
    } else if contains_any(lower, DIPLOMA_WORDS) {
        Some(Degree::Master)
    } else {
        None
    }
}

fn detect_fields(original: &str, lower: &str) -> Vec<Field> {
    let mut fields = Vec::new();
    if is_match(&IT_TOKEN, lower) || is_match(&IT_UPPER, original) || contains_any(lower, IT_WORDS)
    {
        fields.push(Field::It);
    }
    if is_match(&AI_TOKEN, lower) || contains_any(lower, AI_WORDS) {
        fields.push(Field::Ai);
    }
    if contains_any(lower, DATA_WORDS) {
        fields.push(Field::DataScience);
    }
    if contains_any(lower, BUSINESS_WORDS) {
        fields.push(Field::Business);
    }
    fields
}

/// Yearly budget in euro, if the text names an amount.
pub fn parse_budget(lower: &str) -> Option<u32> {
    let normalized = match THOUSANDS_SEP.as_ref() {
        Some(re) => re.replace_all(lower, "$1$2").into_owned(),
        None => lower.to_string(),
    };

    let amount: u64 = BUDGET_PATTERNS
        .iter()
        .find_map(|re| re.captures(&normalized))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())?;

    let mut amount = amount as f64;
    if is_match(&THOUSANDS, &normalized) {
        amount *= 1000.0;
    }
    if contains_any(&normalized, &["доллар", "$", "usd", "dollar"]) {
        amount *= 0.85;
    }
    Some(amount.round().min(f64::from(u32::MAX)) as u32)
}

pub fn wants_free_tuition(lower: &str) -> bool {
    contains_any(lower, FREE_WORDS)
}

/// 0..=10 estimate of how serious the user sounds.
pub fn interest_score(message: &str) -> u8 {
    let lower = message.to_lowercase();
    let mut score = count_matches(&lower, HIGH_INTEREST) * 3
        + count_matches(&lower, MEDIUM_INTEREST) * 2
        + count_matches(&lower, LOW_INTEREST);
    if message.contains('?') {
        score += 1;
    }
    if contains_any(&lower, DETAIL_WORDS) {
        score += 2;
    }
    score.min(10) as u8
}

pub fn wants_to_study(message: &str) -> bool {
    contains_any(&message.to_lowercase(), STUDY_TRIGGERS)
}

pub fn asks_about_process(message: &str) -> bool {
    contains_any(&message.to_lowercase(), PROCESS_TRIGGERS)
}

pub fn asks_for_manager(message: &str) -> bool {
    contains_any(&message.to_lowercase(), MANAGER_TRIGGERS)
}
