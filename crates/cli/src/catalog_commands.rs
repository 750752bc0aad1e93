use std::fmt::Write as _;

use studybot_consultant::{
    Degree, Field, Program, SearchFilter,
    catalog::{PROGRAMS, search},
};

/// Render every program matching the filter, one block per program.
pub fn render_programs(filter: &SearchFilter, all: bool) -> String {
    let found: Vec<&Program> = if all {
        let mut every: Vec<&Program> = PROGRAMS.iter().filter(|p| filter.matches(p)).collect();
        every.sort_by_key(|p| p.cost_per_year);
        every
    } else {
        search(filter)
    };

    if found.is_empty() {
        return "No programs match.\n".into();
    }

    let mut out = String::new();
    for p in &found {
        let fields = p
            .fields
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "{} ({}, {})", p.name, p.university, p.country);
        let _ = writeln!(
            out,
            "  {} | {} | {} | {}",
            p.degree,
            fields,
            p.duration,
            p.cost_label()
        );
        let _ = writeln!(out, "  deadline {} | {}", p.deadline, p.website);
    }
    let _ = writeln!(out, "\n{} program(s)", found.len());
    out
}

pub fn filter(
    degree: Option<Degree>,
    fields: Vec<Field>,
    budget: Option<u32>,
    country: Option<String>,
) -> SearchFilter {
    SearchFilter {
        degree,
        fields,
        max_budget: budget,
        language: None,
        country,
    }
}
