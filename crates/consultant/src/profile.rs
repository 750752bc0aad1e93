//! What the bot knows about a prospective student.

use std::{fmt, str::FromStr};

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Degree {
    Bachelor,
    Master,
}

impl fmt::Display for Degree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bachelor => "bachelor",
            Self::Master => "master",
        })
    }
}

impl FromStr for Degree {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bachelor" | "bsc" | "ba" | "бакалавриат" => Ok(Self::Bachelor),
            "master" | "msc" | "ma" | "магистратура" => Ok(Self::Master),
            other => Err(format!("unknown degree {other:?}, expected bachelor or master")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    It,
    Ai,
    DataScience,
    Business,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::It => "IT",
            Self::Ai => "AI",
            Self::DataScience => "Data Science",
            Self::Business => "Business",
        })
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "it" | "cs" | "computerscience" => Ok(Self::It),
            "ai" | "ml" | "machinelearning" => Ok(Self::Ai),
            "datascience" | "data" => Ok(Self::DataScience),
            "business" | "management" | "mba" => Ok(Self::Business),
            other => Err(format!(
                "unknown field {other:?}, expected one of: it, ai, data-science, business"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    English,
}

/// Where the scripted question flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStage {
    Degree,
    Field,
    Budget,
    Complete,
}

/// Why the user asked for a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorTopic {
    Programs,
    Documents,
    Pricing,
    Apply,
    Other,
}

impl OperatorTopic {
    pub const ALL: [Self; 5] = [
        Self::Programs,
        Self::Documents,
        Self::Pricing,
        Self::Apply,
        Self::Other,
    ];

    /// Suffix after `operator_` in callback data.
    pub fn key(self) -> &'static str {
        match self {
            Self::Programs => "programs",
            Self::Documents => "documents",
            Self::Pricing => "pricing",
            Self::Apply => "apply",
            Self::Other => "other",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.key() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Programs => "📚 Program consultation",
            Self::Documents => "📄 Help with documents",
            Self::Pricing => "💰 Tuition and costs",
            Self::Apply => "🚀 Ready to apply",
            Self::Other => "❓ Something else",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<Degree>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    /// Euro per year; zero means tuition-free only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_budget: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_stage: Option<QuestionStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator_topic: Option<OperatorTopic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator_requested_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// How many of degree, field, budget, language are known.
    pub fn filled_fields(&self) -> usize {
        [
            self.degree.is_some(),
            !self.fields.is_empty(),
            self.max_budget.is_some(),
            self.language.is_some(),
        ]
        .into_iter()
        .filter(|filled| *filled)
        .count()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".into())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Master", Degree::Master)]
    #[case(" bsc ", Degree::Bachelor)]
    #[case("магистратура", Degree::Master)]
    fn degree_from_str(#[case] input: &str, #[case] expected: Degree) {
        assert_eq!(input.parse::<Degree>().unwrap(), expected);
    }

    #[rstest]
    #[case("data-science", Field::DataScience)]
    #[case("Data Science", Field::DataScience)]
    #[case("IT", Field::It)]
    #[case("ml", Field::Ai)]
    fn field_from_str(#[case] input: &str, #[case] expected: Field) {
        assert_eq!(input.parse::<Field>().unwrap(), expected);
    }

    #[test]
    fn unknown_values_are_rejected() {
        assert!("phd".parse::<Degree>().is_err());
        assert!("medicine".parse::<Field>().is_err());
    }

    #[test]
    fn topic_keys_round_trip() {
        for topic in OperatorTopic::ALL {
            assert_eq!(OperatorTopic::from_key(topic.key()), Some(topic));
        }
        assert_eq!(OperatorTopic::from_key("stats"), None);
    }

    #[test]
    fn json_omits_unknown_values() {
        let profile = Profile {
            degree: Some(Degree::Master),
            fields: vec![Field::Ai, Field::DataScience],
            max_budget: Some(0),
            ..Default::default()
        };
        assert_eq!(
            profile.to_json(),
            r#"{"degree":"master","fields":["ai","data_science"],"max_budget":0}"#
        );
        assert_eq!(profile.filled_fields(), 3);
        assert_eq!(Profile::default().filled_fields(), 0);
    }
}
