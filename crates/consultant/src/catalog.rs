//! Built-in catalog of study programs and the filter used to search it.

use std::fmt::Write as _;

use crate::profile::{Degree, Field, Language, Profile};

/// Results returned by [`search`].
pub const SEARCH_LIMIT: usize = 5;
/// Results rendered by [`format_results`].
pub const DISPLAY_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub country: &'static str,
    pub university: &'static str,
    pub name: &'static str,
    pub degree: Degree,
    pub fields: &'static [Field],
    pub language: Language,
    pub duration: &'static str,
    /// Euro per year.
    pub cost_per_year: u32,
    pub requirements: &'static str,
    pub deadline: &'static str,
    pub website: &'static str,
}

impl Program {
    pub fn cost_label(&self) -> String {
        if self.cost_per_year == 0 {
            "Free".into()
        } else {
            format!("€{}/year", group_thousands(self.cost_per_year))
        }
    }
}

fn group_thousands(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    pub degree: Option<Degree>,
    /// A program matches if it covers any of these.
    pub fields: Vec<Field>,
    pub max_budget: Option<u32>,
    pub language: Option<Language>,
    /// Case-insensitive substring of the country name.
    pub country: Option<String>,
}

impl SearchFilter {
    pub fn matches(&self, program: &Program) -> bool {
        self.degree.is_none_or(|d| d == program.degree)
            && (self.fields.is_empty() || self.fields.iter().any(|f| program.fields.contains(f)))
            && self.max_budget.is_none_or(|b| program.cost_per_year <= b)
            && self.language.is_none_or(|l| l == program.language)
            && self.country.as_deref().is_none_or(|c| {
                program
                    .country
                    .to_lowercase()
                    .contains(&c.trim().to_lowercase())
            })
    }
}

impl From<&Profile> for SearchFilter {
    fn from(profile: &Profile) -> Self {
        Self {
            degree: profile.degree,
            fields: profile.fields.clone(),
            max_budget: profile.max_budget,
            language: profile.language,
            country: None,
        }
    }
}

/// Cheapest matching programs first, at most [`SEARCH_LIMIT`].
pub fn search(filter: &SearchFilter) -> Vec<&'static Program> {
    let mut found: Vec<&'static Program> = PROGRAMS.iter().filter(|p| filter.matches(p)).collect();
    // stable, so equal costs keep catalog order
    found.sort_by_key(|p| p.cost_per_year);
    found.truncate(SEARCH_LIMIT);
    found
}

pub fn format_results(programs: &[&Program]) -> String {
    if programs.is_empty() {
        return "Hmm, I couldn't find programs matching those criteria 🤔\n\n\
                Maybe we could revisit the budget, or look at more countries? \
                Tell me what you'd like to change and we'll find options!"
            .into();
    }

    let mut out = String::from("Great! Here is what I found for you 🎯\n");
    for (i, p) in programs.iter().take(DISPLAY_LIMIT).enumerate() {
        let _ = write!(
            out,
            "\n{}. {}\n🏛️ {}, {}\n💰 {}\n⏱️ {}\n📅 Deadline: {}\n🔗 {}\n",
            i + 1,
            p.name,
            p.university,
            p.country,
            p.cost_label(),
            p.duration,
            p.deadline,
            p.website,
        );
    }
    out.push_str(
        "\nWhich program interests you most? Or would you like to know more about \
         the admission process? 🤓",
    );
    out
}

use Degree::{Bachelor, Master};
use Field::{Ai, Business, DataScience, It};

const EN: Language = Language::English;

pub static PROGRAMS: [Program; 24] = [
    // Germany
    Program {
        country: "Germany",
        university: "Technical University of Munich",
        name: "MSc Artificial Intelligence",
        degree: Master,
        fields: &[Ai, It],
        language: EN,
        duration: "2 years",
        cost_per_year: 0,
        requirements: "IELTS 6.5+, bachelor's degree in IT",
        deadline: "15 July",
        website: "https://tum.de/ai",
    },
    Program {
        country: "Germany",
        university: "RWTH Aachen",
        name: "Computer Science",
        degree: Bachelor,
        fields: &[It],
        language: EN,
        duration: "3 years",
        cost_per_year: 0,
        requirements: "IELTS 6.0+, school certificate with mathematics",
        deadline: "15 July",
        website: "https://rwth-aachen.de/cs",
    },
    Program {
        country: "Germany",
        university: "University of Freiburg",
        name: "MSc Computer Science",
        degree: Master,
        fields: &[It],
        language: EN,
        duration: "2 years",
        cost_per_year: 1500,
        requirements: "IELTS 6.5+, technical degree",
        deadline: "1 March",
        website: "https://uni-freiburg.de/cs",
    },
    // Netherlands
    Program {
        country: "Netherlands",
        university: "Delft University of Technology",
        name: "MSc Computer Science - AI Track",
        degree: Master,
        fields: &[Ai, It],
        language: EN,
        duration: "2 years",
        cost_per_year: 2314,
        requirements: "IELTS 6.5+, technical degree",
        deadline: "1 February",
        website: "https://tudelft.nl/ai",
    },
    Program {
        country: "Netherlands",
        university: "University of Amsterdam",
        name: "BSc Artificial Intelligence",
        degree: Bachelor,
        fields: &[Ai],
        language: EN,
        duration: "3 years",
        cost_per_year: 2314,
        requirements: "IELTS 6.0+, advanced mathematics",
        deadline: "1 May",
        website: "https://uva.nl/ai-bachelor",
    },
    Program {
        country: "Netherlands",
        university: "Eindhoven University of Technology",
        name: "MSc Data Science",
        degree: Master,
        fields: &[DataScience, It],
        language: EN,
        duration: "2 years",
        cost_per_year: 2314,
        requirements: "IELTS 6.5+, mathematical or technical degree",
        deadline: "1 February",
        website: "https://tue.nl/datascience",
    },
    // Czech Republic
    Program {
        country: "Czech Republic",
        university: "Charles University",
        name: "MSc Computer Science",
        degree: Master,
        fields: &[It, Ai],
        language: EN,
        duration: "2 years",
        cost_per_year: 4000,
        requirements: "IELTS 6.0+, degree in IT or mathematics",
        deadline: "30 April",
        website: "https://cuni.cz/computer-science",
    },
    Program {
        country: "Czech Republic",
        university: "Czech Technical University",
        name: "BSc Computer Science",
        degree: Bachelor,
        fields: &[It],
        language: EN,
        duration: "3 years",
        cost_per_year: 3500,
        requirements: "IELTS 6.0+, school certificate with mathematics",
        deadline: "31 March",
        website: "https://cvut.cz/cs",
    },
    Program {
        country: "Czech Republic",
        university: "Masaryk University",
        name: "MSc Applied Informatics",
        degree: Master,
        fields: &[It, DataScience],
        language: EN,
        duration: "2 years",
        cost_per_year: 3000,
        requirements: "IELTS 6.0+, technical degree",
        deadline: "28 February",
        website: "https://muni.cz/informatics",
    },
    // Poland
    Program {
        country: "Poland",
        university: "Warsaw University of Technology",
        name: "MSc Data Science and AI",
        degree: Master,
        fields: &[Ai, DataScience],
        language: EN,
        duration: "1.5 years",
        cost_per_year: 3000,
        requirements: "IELTS 6.0+, technical bachelor's degree",
        deadline: "31 May",
        website: "https://pw.edu.pl/datascience",
    },
    Program {
        country: "Poland",
        university: "Cracow University of Technology",
        name: "BSc Computer Science",
        degree: Bachelor,
        fields: &[It],
        language: EN,
        duration: "3.5 years",
        cost_per_year: 2500,
        requirements: "IELTS 6.0+, school certificate",
        deadline: "30 June",
        website: "https://pk.edu.pl/cs",
    },
    Program {
        country: "Poland",
        university: "University of Wroclaw",
        name: "MSc Computer Science",
        degree: Master,
        fields: &[It],
        language: EN,
        duration: "2 years",
        cost_per_year: 2800,
        requirements: "IELTS 6.0+, degree in IT",
        deadline: "15 May",
        website: "https://uni.wroc.pl/cs",
    },
    // France
    Program {
        country: "France",
        university: "École Polytechnique",
        name: "MSc Data Science for Business",
        degree: Master,
        fields: &[DataScience, Business],
        language: EN,
        duration: "2 years",
        cost_per_year: 12000,
        requirements: "IELTS 7.0+, GMAT/GRE",
        deadline: "15 March",
        website: "https://polytechnique.edu/datascience",
    },
    Program {
        country: "France",
        university: "Sorbonne University",
        name: "MSc Computer Science",
        degree: Master,
        fields: &[It],
        language: EN,
        duration: "2 years",
        cost_per_year: 8000,
        requirements: "IELTS 6.5+, technical degree",
        deadline: "1 April",
        website: "https://sorbonne-universite.fr/cs",
    },
    // Italy
    Program {
        country: "Italy",
        university: "Politecnico di Milano",
        name: "MSc Computer Science and Engineering",
        degree: Master,
        fields: &[It],
        language: EN,
        duration: "2 years",
        cost_per_year: 3900,
        requirements: "IELTS 6.0+, technical degree",
        deadline: "31 March",
        website: "https://polimi.it/cs",
    },
    Program {
        country: "Italy",
        university: "University of Bologna",
        name: "MSc Artificial Intelligence",
        degree: Master,
        fields: &[Ai],
        language: EN,
        duration: "2 years",
        cost_per_year: 2800,
        requirements: "IELTS 6.5+, technical or mathematical degree",
        deadline: "30 April",
        website: "https://unibo.it/ai",
    },
    // Spain
    Program {
        country: "Spain",
        university: "Polytechnic University of Catalonia",
        name: "MSc in Data Science",
        degree: Master,
        fields: &[DataScience],
        language: EN,
        duration: "1 year",
        cost_per_year: 7000,
        requirements: "IELTS 6.5+, technical degree",
        deadline: "15 June",
        website: "https://upc.edu/datascience",
    },
    Program {
        country: "Spain",
        university: "Carlos III University of Madrid",
        name: "BSc Computer Science",
        degree: Bachelor,
        fields: &[It],
        language: EN,
        duration: "4 years",
        cost_per_year: 5000,
        requirements: "IELTS 6.0+, school certificate",
        deadline: "31 May",
        website: "https://uc3m.es/cs",
    },
    // Austria
    Program {
        country: "Austria",
        university: "TU Wien",
        name: "MSc Computer Science",
        degree: Master,
        fields: &[It],
        language: EN,
        duration: "2 years",
        cost_per_year: 1500,
        requirements: "IELTS 6.5+, technical degree",
        deadline: "31 March",
        website: "https://tuwien.at/cs",
    },
    // Belgium
    Program {
        country: "Belgium",
        university: "KU Leuven",
        name: "MSc Computer Science",
        degree: Master,
        fields: &[It],
        language: EN,
        duration: "2 years",
        cost_per_year: 4175,
        requirements: "IELTS 6.5+, technical degree",
        deadline: "1 March",
        website: "https://kuleuven.be/cs",
    },
    // Sweden
    Program {
        country: "Sweden",
        university: "KTH Royal Institute of Technology",
        name: "MSc Machine Learning",
        degree: Master,
        fields: &[Ai],
        language: EN,
        duration: "2 years",
        cost_per_year: 0,
        requirements: "IELTS 6.5+, technical or mathematical degree",
        deadline: "15 January",
        website: "https://kth.se/ml",
    },
    Program {
        country: "Sweden",
        university: "Chalmers University of Technology",
        name: "MSc Computer Science",
        degree: Master,
        fields: &[It],
        language: EN,
        duration: "2 years",
        cost_per_year: 0,
        requirements: "IELTS 6.5+, technical degree",
        deadline: "15 January",
        website: "https://chalmers.se/cs",
    },
    // Finland
    Program {
        country: "Finland",
        university: "University of Helsinki",
        name: "MSc Data Science",
        degree: Master,
        fields: &[DataScience],
        language: EN,
        duration: "2 years",
        cost_per_year: 0,
        requirements: "IELTS 6.5+, mathematical or technical degree",
        deadline: "31 January",
        website: "https://helsinki.fi/datascience",
    },
    Program {
        country: "Finland",
        university: "Aalto University",
        name: "MSc Computer Science",
        degree: Master,
        fields: &[It],
        language: EN,
        duration: "2 years",
        cost_per_year: 0,
        requirements: "IELTS 6.5+, technical degree",
        deadline: "31 January",
        website: "https://aalto.fi/cs",
    },
];
