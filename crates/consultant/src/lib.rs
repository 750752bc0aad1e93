//! The study-abroad consultant: scripted questionnaire, keyword profiling,
//! program catalog, lead scoring and the event dispatcher that ties them to
//! the hand-off core.

pub mod catalog;
pub mod dialogue;
pub mod extract;
pub mod leads;
pub mod profile;
pub mod service;
pub mod sessions;

pub use {
    catalog::{Program, SearchFilter, format_results, search},
    leads::{LeadPriority, lead_priority, lead_report, lead_score, should_notify_manager},
    profile::{Degree, Field, Language, OperatorTopic, Profile, QuestionStage},
    service::ConsultantService,
    sessions::{Session, SessionStore, Stage},
};
