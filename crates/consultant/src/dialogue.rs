//! Scripted texts and the step-by-step questionnaire.

use crate::{
    catalog::{self, SearchFilter},
    extract::extract_profile,
    profile::QuestionStage,
    sessions::{Session, Stage},
};

pub const WELCOME: &str = "👋 Hi! I'm a study-abroad consultant bot.\n\n\
I can help you pick a university program in Europe, explain the admission \
process and connect you with a manager.\n\n\
Tell me what you're looking for, or pick one of the options below.";

pub const HELP: &str = "ℹ️ What I can do:\n\n\
• Tell me \"I want to study\" and I'll find programs for you step by step\n\
• Ask anything about studying abroad\n\
• /operator talk to a person\n\
• /cancel leave the operator queue\n\
• /end finish a conversation with an operator\n\
• /start start over";

pub const OPERATOR_HELP: &str = "🛠 Operator commands:\n\n\
• /reply_<user id> <text> answer a client\n\
• /end_<user id> close a conversation\n\
• /stats your active conversations and the queue\n\n\
Plain messages are not forwarded. Always reply with /reply_<user id>.";

pub const PROCESS_INFO: &str = "📋 How admission usually works:\n\n\
1. Pick programs and check their requirements\n\
2. Prepare documents: diploma or school certificate, transcript, CV, \
motivation letter, recommendations\n\
3. Take a language test (IELTS/TOEFL)\n\
4. Apply before the deadline, usually 6 to 10 months ahead\n\
5. Receive the offer and apply for a student visa\n\n\
Tell me \"I want to study\" and I'll suggest programs that fit you!";

pub const CONSULTANT_PROMPT: &str = "You are a friendly consultant of an agency that helps \
students enrol in European universities. Answer briefly and concretely, in the language \
the user writes in. Recommend programs only from Germany, the Netherlands, the Czech \
Republic, Poland, France, Italy, Spain, Austria, Belgium, Sweden and Finland. If the \
user is ready to apply or needs help with documents, suggest talking to a manager. \
Never invent exact prices or deadlines you are not sure about.";

pub const LLM_FALLBACK: &str =
    "Sorry, a small technical hiccup 😅 Could you repeat your question?";

pub const HIGH_INTEREST_HINT: &str =
    "\n\n💡 Looks like you're seriously interested! Would you like to discuss the details with our manager?";

const DEGREE_QUESTION: &str = "Great! Let's find a good option for you 🎯\n\n\
First, which degree are you planning?\n\
🎓 Bachelor's (first degree)\n\
🎓 Master's (you already have a bachelor's)";

const DEGREE_RETRY: &str = "Not sure I got that 🤔 Bachelor's or master's?";

const FIELD_QUESTION: &str = "Got it! Which field interests you? 🤔\n\n\
For example:\n\
💻 IT and programming\n\
🤖 Artificial intelligence\n\
📊 Data Science and analytics\n\
💼 Business and management\n\n\
Or something else? Just describe it in your own words!";

const FIELD_RETRY: &str = "Which field interests you most? IT, AI, Data Science or business?";

const BUDGET_QUESTION: &str = "Great! Now an important one, the budget 💰\n\n\
Roughly how much can you spend on tuition per year?\n\n\
💡 There are free programs in Germany, Finland and Sweden\n\
💰 Paid options range from €1,500 to €12,000 per year\n\n\
Write an approximate amount in euro, or \"free\" 😊";

const BUDGET_RETRY: &str = "I didn't catch the amount 🤔 Could you write a rough yearly budget in euro, or \"free\"?";

const RESTART: &str = "Something went wrong 😅 Let's start over. Which degree are you planning, bachelor's or master's?";

/// Enter the questionnaire and return the first question.
pub fn start_collection(session: &mut Session) -> &'static str {
    session.stage = Stage::CollectingInfo;
    session.profile.question_stage = Some(QuestionStage::Degree);
    DEGREE_QUESTION
}

/// Feed one answer to the questionnaire and return the reply.
///
/// Advances only when the current question got an answer; otherwise the
/// same question is asked again. After the budget the session moves to
/// [`Stage::ShowingResults`] and the reply lists matching programs.
pub fn collect_step(session: &mut Session, message: &str) -> String {
    let current = session
        .profile
        .question_stage
        .unwrap_or(QuestionStage::Degree);
    extract_profile(message, &mut session.profile);

    let profile = &mut session.profile;
    match current {
        QuestionStage::Degree if profile.degree.is_some() => {
            profile.question_stage = Some(QuestionStage::Field);
            FIELD_QUESTION.into()
        },
        QuestionStage::Degree => DEGREE_RETRY.into(),
        QuestionStage::Field if !profile.fields.is_empty() => {
            profile.question_stage = Some(QuestionStage::Budget);
            BUDGET_QUESTION.into()
        },
        QuestionStage::Field => FIELD_RETRY.into(),
        QuestionStage::Budget if profile.max_budget.is_some() => {
            profile.question_stage = Some(QuestionStage::Complete);
            let programs = catalog::search(&SearchFilter::from(&*profile));
            session.stage = Stage::ShowingResults;
            catalog::format_results(&programs)
        },
        QuestionStage::Budget => BUDGET_RETRY.into(),
        QuestionStage::Complete => {
            profile.question_stage = Some(QuestionStage::Degree);
            RESTART.into()
        },
    }
}
