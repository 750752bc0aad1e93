//! Turns channel events into dialogue, catalog answers and hand-off calls.

use std::sync::Arc;

use {
    async_trait::async_trait,
    chrono::Utc,
    studybot_channels::{
        ChannelEventSink, ChannelOutbound, InboundCallback, InboundMessage, InlineButton,
        InlineKeyboard, Sender,
    },
    studybot_common::{OperatorId, UserId},
    studybot_config::LeadsConfig,
    studybot_handoff::{Error as HandoffError, HandoffCoordinator, Party, actions},
    studybot_providers::{ChatMessage, LlmProvider},
    tracing::{debug, info, warn},
};

use crate::{
    dialogue, extract, leads,
    profile::OperatorTopic,
    sessions::{SessionStore, Stage},
};

/// Callback data of the welcome and follow-up buttons.
pub mod callbacks {
    pub const WANT_TO_STUDY: &str = "want_to_study";
    pub const PROCESS_INFO: &str = "process_info";
    pub const CONNECT_MANAGER: &str = "connect_manager";
    pub const OPERATOR_TOPIC_PREFIX: &str = "operator_";
}

const ALREADY_CONNECTED: &str = "✅ You are already connected to an operator! Just write your question.";
const NOT_CONNECTED: &str = "❌ You are not connected to an operator.";
const OPERATORS_ONLY: &str = "⛔ This command is for operators only.";

pub struct ConsultantService {
    sessions: Arc<SessionStore>,
    handoff: Arc<HandoffCoordinator>,
    outbound: Arc<dyn ChannelOutbound>,
    llm: Option<Arc<dyn LlmProvider>>,
    leads: LeadsConfig,
}

impl ConsultantService {
    pub fn new(
        sessions: Arc<SessionStore>,
        handoff: Arc<HandoffCoordinator>,
        outbound: Arc<dyn ChannelOutbound>,
        leads: LeadsConfig,
    ) -> Self {
        Self {
            sessions,
            handoff,
            outbound,
            llm: None,
            leads,
        }
    }

    #[must_use]
    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    async fn reply(&self, to: &str, text: &str, keyboard: Option<&InlineKeyboard>) {
        if let Err(e) = self.outbound.send_text(to, text, keyboard).await {
            warn!(to, error = %e, "reply not delivered");
        }
    }

    fn remember(&self, sender: &Sender) {
        let label = sender.label();
        self.sessions.update(sender.user_id, |s| s.name = Some(label));
    }

    /// The sender as an operator, if the directory knows them.
    fn as_operator(&self, user: UserId) -> Option<OperatorId> {
        let operator = OperatorId::from(user);
        self.handoff.is_operator(operator).then_some(operator)
    }

    // ── Users ───────────────────────────────────────────────────────────────

    async fn start(&self, user: UserId, chat: &str) {
        self.sessions.update(user, |s| {
            s.stage = Stage::Initial;
            s.profile.question_stage = None;
        });
        let keyboard = InlineKeyboard::new()
            .button("🎓 I want to study abroad", callbacks::WANT_TO_STUDY)
            .row(vec![
                InlineButton::new("ℹ️ About the process", callbacks::PROCESS_INFO),
                InlineButton::new("💬 Contact a manager", callbacks::CONNECT_MANAGER),
            ]);
        self.reply(chat, dialogue::WELCOME, Some(&keyboard)).await;
    }

    async fn start_collection(&self, user: UserId, chat: &str) {
        let question = self.sessions.update(user, dialogue::start_collection);
        self.reply(chat, question, None).await;
    }

    /// First step of a hand-off: ask why the user needs a person.
    async fn offer_topics(&self, user: UserId, chat: &str) {
        if !self.handoff.has_operators() {
            self.reply(chat, &self.leads.contact_message, None).await;
            return;
        }
        if self.handoff.operator_of(user).is_some() {
            self.reply(chat, ALREADY_CONNECTED, None).await;
            return;
        }
        if let Some(position) = self.handoff.queue_position(user) {
            let text = format!(
                "⏳ You are already in the queue, number {position}. We will connect you soon."
            );
            let keyboard = InlineKeyboard::single("❌ Leave the queue", actions::LEAVE_QUEUE);
            self.reply(chat, &text, Some(&keyboard)).await;
            return;
        }

        let keyboard = OperatorTopic::ALL.into_iter().fold(InlineKeyboard::new(), |kb, t| {
            kb.button(
                t.label(),
                format!("{}{}", callbacks::OPERATOR_TOPIC_PREFIX, t.key()),
            )
        });
        self.reply(
            chat,
            "🔗 Talk to an operator\n\nWhat do you need help with? We'll connect the right person.",
            Some(&keyboard),
        )
        .await;
    }

    async fn request_operator(&self, user: UserId, chat: &str, topic: OperatorTopic) {
        self.sessions.update(user, |s| {
            s.stage = Stage::WaitingForOperator;
            s.profile.operator_topic = Some(topic);
            s.profile.operator_requested_at = Some(Utc::now());
        });
        info!(user_id = %user, topic = topic.key(), "operator requested");

        match self.handoff.request_operator(user).await {
            Ok(outcome) => debug!(user_id = %user, ?outcome, "hand-off request handled"),
            Err(HandoffError::AlreadyBound { .. }) => {
                self.reply(chat, ALREADY_CONNECTED, None).await;
            },
            Err(HandoffError::OutsideWorkingHours { window }) => {
                self.sessions.update(user, |s| s.stage = Stage::Initial);
                let text = format!(
                    "🕘 Operators are available {window}.\n\n{}",
                    self.leads.contact_message
                );
                self.reply(chat, &text, None).await;
            },
            Err(e @ HandoffError::DeliveryFailure { .. }) => {
                // the coordinator already told the user
                self.sessions.update(user, |s| s.stage = Stage::Initial);
                warn!(user_id = %user, error = %e, "hand-off not delivered");
            },
            Err(e) => {
                warn!(user_id = %user, error = %e, "hand-off request failed");
                self.reply(chat, "⚠️ Something went wrong, please try again later.", None)
                    .await;
            },
        }
    }

    fn leave_queue(&self, user: UserId) -> bool {
        let left = self.handoff.cancel_wait(user);
        if left {
            self.sessions.update(user, |s| s.stage = Stage::Initial);
        }
        left
    }

    async fn end_by_user(&self, user: UserId, chat: &str) {
        match self.handoff.end_session(Party::User, user).await {
            Ok(_) => {
                self.sessions.update(user, |s| s.stage = Stage::Initial);
                let keyboard = InlineKeyboard::new()
                    .button("⭐ Rate the operator", actions::RATE_OPERATOR)
                    .button("🔁 Contact an operator again", callbacks::CONNECT_MANAGER);
                self.reply(
                    chat,
                    "✅ Conversation finished\n\nThank you for reaching out! \
                     If you have more questions, we are always happy to help.",
                    Some(&keyboard),
                )
                .await;
            },
            Err(HandoffError::NotBound { .. }) => {
                let text = if self.handoff.queue_position(user).is_some() {
                    "❌ You are not connected to an operator yet. Send /cancel to leave the queue."
                } else {
                    NOT_CONNECTED
                };
                self.reply(chat, text, None).await;
            },
            Err(e) => warn!(user_id = %user, error = %e, "ending conversation failed"),
        }
    }

    async fn answer_with_llm(&self, user: UserId, chat: &str, text: &str) {
        let profile = self.sessions.get_or_create(user).profile.to_json();
        let answer = match &self.llm {
            Some(llm) => {
                if let Err(e) = self.outbound.send_typing(chat).await {
                    debug!(error = %e, "typing indicator failed");
                }
                let messages = [
                    ChatMessage::system(format!(
                        "{}\n\nClient profile: {profile}",
                        dialogue::CONSULTANT_PROMPT
                    )),
                    ChatMessage::user(text),
                ];
                match llm.complete(&messages).await {
                    Ok(answer) => Some(answer),
                    Err(e) => {
                        warn!(user_id = %user, model = llm.id(), error = %e, "LLM request failed");
                        None
                    },
                }
            },
            None => None,
        };

        let score = if answer.is_some() {
            extract::interest_score(text)
        } else {
            0
        };
        let mut reply = answer.unwrap_or_else(|| dialogue::LLM_FALLBACK.to_string());
        let threshold = self.leads.notification_threshold;
        let offer_manager = self.sessions.update(user, |s| {
            s.interest_score = s.interest_score.max(score);
            s.push_history(format!("Bot: {reply}"));
            leads::should_notify_manager(s, threshold)
        });

        if offer_manager {
            info!(user_id = %user, "high-interest lead, offering a manager");
            reply.push_str(dialogue::HIGH_INTEREST_HINT);
            let keyboard = InlineKeyboard::single("📞 Contact a manager", callbacks::CONNECT_MANAGER);
            self.reply(chat, &reply, Some(&keyboard)).await;
        } else {
            self.reply(chat, &reply, None).await;
        }
    }

    // ── Operators ───────────────────────────────────────────────────────────

    async fn operator_reply(&self, operator: OperatorId, chat: &str, target: &str, text: &str) {
        let Ok(user) = target.parse::<UserId>() else {
            self.reply(chat, "❌ Invalid format. Use: /reply_<user id> your answer", None)
                .await;
            return;
        };
        if text.trim().is_empty() {
            let usage = format!("✍️ Write your answer after the command: /reply_{user} <text>");
            self.reply(chat, &usage, None).await;
            return;
        }
        match self.handoff.relay_operator_reply(operator, user, text).await {
            Ok(()) => {
                self.reply(chat, &format!("✅ Sent to user {user}"), None)
                    .await;
            },
            Err(HandoffError::Unauthorized { .. }) => self.reply(chat, OPERATORS_ONLY, None).await,
            Err(HandoffError::NotBound { .. }) => {
                let text = format!("❌ User {user} is not connected to you.");
                self.reply(chat, &text, None).await;
            },
            Err(e) => warn!(operator_id = %operator, user_id = %user, error = %e, "operator reply failed"),
        }
    }

    async fn operator_end(&self, operator: OperatorId, chat: &str, target: &str) {
        let Ok(user) = target.parse::<UserId>() else {
            self.reply(chat, "❌ Invalid format. Use: /end_<user id>", None)
                .await;
            return;
        };
        match self.handoff.end_session(Party::Operator(operator), user).await {
            Ok(_) => {
                self.sessions.update(user, |s| s.stage = Stage::Initial);
                let text = format!("✅ Conversation with user {user} closed.");
                self.reply(chat, &text, None).await;
            },
            Err(HandoffError::Unauthorized { .. }) => self.reply(chat, OPERATORS_ONLY, None).await,
            Err(HandoffError::NotBound { .. }) => {
                let text = format!("❌ User {user} is not connected to you.");
                self.reply(chat, &text, None).await;
            },
            Err(e) => warn!(operator_id = %operator, user_id = %user, error = %e, "ending conversation failed"),
        }
    }

    async fn operator_stats(&self, operator: OperatorId, chat: &str) {
        match self.handoff.operator_stats(operator) {
            Ok(stats) => {
                let keyboard = InlineKeyboard::single("🔄 Refresh", actions::OPERATOR_STATS);
                self.reply(chat, &stats.render(), Some(&keyboard)).await;
            },
            Err(_) => self.reply(chat, OPERATORS_ONLY, None).await,
        }
    }

    /// Operators write free text by mistake; it is never relayed.
    fn operator_hint(&self, operator: OperatorId) -> Option<String> {
        let stats = self.handoff.operator_stats(operator).ok()?;
        let usage = match stats.users.first() {
            Some(first) => format!(
                "Reply with /reply_<user id> <text>, for example /reply_{first} Hello!"
            ),
            None => "No users are connected to you yet. /help_operator lists your commands."
                .to_string(),
        };
        Some(format!(
            "ℹ️ Plain messages are not forwarded. {usage}\n\n{}",
            stats.render()
        ))
    }
}

#[async_trait]
impl ChannelEventSink for ConsultantService {
    async fn dispatch_command(&self, command: &str, args: &str, msg: InboundMessage) {
        let user = msg.sender.user_id;
        let chat = msg.chat_id.as_str();
        self.remember(&msg.sender);
        debug!(user_id = %user, command, "command");

        match command {
            "start" => self.start(user, chat).await,
            "help" => self.reply(chat, dialogue::HELP, None).await,
            "help_operator" => {
                let text = if self.as_operator(user).is_some() {
                    dialogue::OPERATOR_HELP
                } else {
                    OPERATORS_ONLY
                };
                self.reply(chat, text, None).await;
            },
            "operator" => self.offer_topics(user, chat).await,
            "cancel" => {
                let text = if self.leave_queue(user) {
                    "❌ You left the queue. Send /operator whenever you need a person."
                } else {
                    "You are not in the queue."
                };
                self.reply(chat, text, None).await;
            },
            "end" => self.end_by_user(user, chat).await,
            "stats" => self.operator_stats(OperatorId::from(user), chat).await,
            _ => {
                if let Some(target) = command.strip_prefix("reply_") {
                    self.operator_reply(OperatorId::from(user), chat, target, args)
                        .await;
                } else if let Some(target) = command.strip_prefix("end_") {
                    self.operator_end(OperatorId::from(user), chat, target).await;
                } else {
                    self.reply(chat, "🤷 Unknown command. Send /help to see what I can do.", None)
                        .await;
                }
            },
        }
    }

    async fn dispatch_text(&self, msg: InboundMessage) {
        let user = msg.sender.user_id;
        let chat = msg.chat_id.as_str();
        let text = msg.text.trim();
        if text.is_empty() {
            return;
        }
        self.remember(&msg.sender);

        if let Some(operator) = self.as_operator(user)
            && let Some(hint) = self.operator_hint(operator)
        {
            self.reply(chat, &hint, None).await;
            return;
        }

        self.sessions
            .update(user, |s| s.push_history(format!("User: {text}")));

        if self.handoff.operator_of(user).is_some() {
            match self.handoff.relay_user_message(user, text).await {
                Ok(()) => {
                    self.reply(chat, "✅ Sent to the operator", None).await;
                    return;
                },
                // ended in the meantime, the bot answers instead
                Err(HandoffError::NotBound { .. }) => {},
                Err(e) => {
                    warn!(user_id = %user, error = %e, "relay to operator failed");
                    self.sessions.update(user, |s| s.stage = Stage::Initial);
                    return;
                },
            }
        }

        if extract::wants_to_study(text) {
            self.start_collection(user, chat).await;
            return;
        }
        if extract::asks_for_manager(text) {
            self.offer_topics(user, chat).await;
            return;
        }
        if extract::asks_about_process(text) {
            self.reply(chat, dialogue::PROCESS_INFO, None).await;
            return;
        }

        let collecting = self.sessions.get_or_create(user).stage == Stage::CollectingInfo;
        if collecting {
            let reply = self
                .sessions
                .update(user, |s| dialogue::collect_step(s, text));
            self.reply(chat, &reply, None).await;
            return;
        }

        self.answer_with_llm(user, chat, text).await;
    }

    async fn dispatch_callback(&self, callback: InboundCallback) -> Option<String> {
        let user = callback.sender.user_id;
        let chat = callback.chat_id.clone().unwrap_or_else(|| user.chat());
        let chat = chat.as_str();
        let data = callback.data.as_str();
        self.remember(&callback.sender);
        debug!(user_id = %user, data, "callback");

        match data {
            callbacks::WANT_TO_STUDY => self.start_collection(user, chat).await,
            callbacks::PROCESS_INFO => self.reply(chat, dialogue::PROCESS_INFO, None).await,
            callbacks::CONNECT_MANAGER => self.offer_topics(user, chat).await,
            actions::OPERATOR_STATS => self.operator_stats(OperatorId::from(user), chat).await,
            actions::LEAVE_QUEUE => {
                return Some(if self.leave_queue(user) {
                    "You left the queue".into()
                } else {
                    "You are not in the queue".into()
                });
            },
            actions::END_OPERATOR_CHAT => self.end_by_user(user, chat).await,
            actions::THANKS_OPERATOR => return Some("🙏 Glad we could help!".into()),
            actions::RATE_OPERATOR => return Some("⭐ Thanks for the feedback!".into()),
            actions::CLARIFY_OPERATOR => {
                self.reply(chat, "✍️ Write your follow-up question, the operator will see it.", None)
                    .await;
            },
            _ => {
                if let Some(target) = data.strip_prefix(actions::REPLY_TO_PREFIX) {
                    if self.as_operator(user).is_none() {
                        return Some(OPERATORS_ONLY.into());
                    }
                    let hint = format!("✍️ Reply with: /reply_{target} <your text>");
                    self.reply(chat, &hint, None).await;
                } else if let Some(target) = data.strip_prefix(actions::END_CHAT_PREFIX) {
                    self.operator_end(OperatorId::from(user), chat, target).await;
                } else if let Some(topic) = data
                    .strip_prefix(callbacks::OPERATOR_TOPIC_PREFIX)
                    .and_then(OperatorTopic::from_key)
                {
                    self.request_operator(user, chat, topic).await;
                } else {
                    debug!(data, "unknown callback");
                    return Some("Unknown action".into());
                }
            },
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use {
        studybot_handoff::OperatorDirectory,
        studybot_providers::{Error as LlmError, Result as LlmResult},
    };

    use super::*;

    const OP: OperatorId = OperatorId(900);
    const ANNA: UserId = UserId(1);
    const BORIS: UserId = UserId(2);

    #[derive(Debug, Clone)]
    struct Sent {
        to: String,
        text: String,
        buttons: Vec<String>,
    }

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<Sent>>,
    }

    impl Recorder {
        fn last_to(&self, chat: impl ToString) -> Sent {
            let chat = chat.to_string();
            self.sent
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|s| s.to == chat)
                .cloned()
                .unwrap_or_else(|| panic!("nothing sent to {chat}"))
        }

        fn texts_to(&self, chat: impl ToString) -> Vec<String> {
            let chat = chat.to_string();
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.to == chat)
                .map(|s| s.text.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ChannelOutbound for Recorder {
        async fn send_text(
            &self,
            to: &str,
            text: &str,
            keyboard: Option<&InlineKeyboard>,
        ) -> studybot_channels::Result<()> {
            self.sent.lock().unwrap().push(Sent {
                to: to.into(),
                text: text.into(),
                buttons: keyboard
                    .map(|kb| kb.buttons().map(|b| b.callback_data.clone()).collect())
                    .unwrap_or_default(),
            });
            Ok(())
        }
    }

    /// Replies with a fixed answer, or fails when `answer` is `None`.
    struct FakeLlm {
        answer: Option<&'static str>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for FakeLlm {
        fn id(&self) -> &str {
            "fake"
        }

        async fn complete(&self, messages: &[ChatMessage]) -> LlmResult<String> {
            self.prompts
                .lock()
                .unwrap()
                .push(messages[0].content.clone());
            self.answer
                .map(str::to_string)
                .ok_or(LlmError::EmptyResponse)
        }
    }

    struct Harness {
        service: ConsultantService,
        out: Arc<Recorder>,
        sessions: Arc<SessionStore>,
        handoff: Arc<HandoffCoordinator>,
    }

    fn harness(operators: &[(OperatorId, usize)], answer: Option<&'static str>) -> (Harness, Arc<FakeLlm>) {
        let out = Arc::new(Recorder::default());
        let sessions = Arc::new(SessionStore::new());
        let handoff = Arc::new(HandoffCoordinator::new(
            OperatorDirectory::new(operators.iter().copied()),
            out.clone(),
            sessions.clone(),
        ));
        let llm = Arc::new(FakeLlm {
            answer,
            prompts: Mutex::default(),
        });
        let service = ConsultantService::new(
            sessions.clone(),
            handoff.clone(),
            out.clone(),
            LeadsConfig::default(),
        )
        .with_llm(llm.clone());
        (
            Harness {
                service,
                out,
                sessions,
                handoff,
            },
            llm,
        )
    }

    fn message(from: i64, text: &str) -> InboundMessage {
        InboundMessage {
            sender: Sender::new(UserId(from)),
            chat_id: from.to_string(),
            text: text.into(),
        }
    }

    fn callback(from: i64, data: &str) -> InboundCallback {
        InboundCallback {
            sender: Sender::new(UserId(from)),
            chat_id: Some(from.to_string()),
            data: data.into(),
        }
    }

    impl Harness {
        async fn text(&self, from: i64, text: &str) {
            self.service.dispatch_text(message(from, text)).await;
        }

        async fn command(&self, from: i64, command: &str, args: &str) {
            self.service
                .dispatch_command(command, args, message(from, &format!("/{command} {args}")))
                .await;
        }

        async fn press(&self, from: i64, data: &str) -> Option<String> {
            self.service.dispatch_callback(callback(from, data)).await
        }

        async fn connect(&self, user: UserId) {
            self.command(user.0, "operator", "").await;
            self.press(user.0, "operator_programs").await;
        }
    }

    #[tokio::test]
    async fn start_offers_quick_actions() {
        let (h, _) = harness(&[(OP, 1)], None);
        h.command(1, "start", "").await;
        let sent = h.out.last_to(1);
        assert_eq!(sent.text, dialogue::WELCOME);
        assert_eq!(
            sent.buttons,
            vec!["want_to_study", "process_info", "connect_manager"]
        );
    }

    #[tokio::test]
    async fn questionnaire_ends_with_programs() {
        let (h, llm) = harness(&[(OP, 1)], Some("unused"));
        h.text(1, "Привет! Хочу учиться в Европе").await;
        assert!(h.out.last_to(1).text.contains("which degree"));

        h.text(1, "магистратура").await;
        h.text(1, "data science").await;
        h.text(1, "бесплатно").await;

        let results = h.out.last_to(1).text;
        assert!(results.contains("University of Helsinki"));
        assert_eq!(h.sessions.get_or_create(ANNA).stage, Stage::ShowingResults);
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn llm_answer_includes_profile_and_offers_manager() {
        let (h, llm) = harness(&[(OP, 1)], Some("Germany is a great choice."));
        h.sessions.update(ANNA, |s| {
            s.stage = Stage::ShowingResults;
            s.profile.degree = Some(crate::profile::Degree::Master);
        });

        h.text(1, "Хочу поступать, какие документы нужны? Когда подавать?")
            .await;

        let sent = h.out.last_to(1);
        assert!(sent.text.starts_with("Germany is a great choice."));
        assert!(sent.text.contains("seriously interested"));
        assert_eq!(sent.buttons, vec!["connect_manager"]);
        assert!(h.sessions.get_or_create(ANNA).interest_score >= 7);
        assert!(llm.prompts.lock().unwrap()[0].contains(r#""degree":"master""#));
    }

    #[tokio::test]
    async fn llm_failure_apologises_without_scoring() {
        let (h, _) = harness(&[(OP, 1)], None);
        h.text(1, "what documents do I need? deadline?").await;
        assert_eq!(h.out.last_to(1).text, dialogue::LLM_FALLBACK);
        assert_eq!(h.sessions.get_or_create(ANNA).interest_score, 0);
    }

    #[tokio::test]
    async fn process_keyword_shows_info() {
        let (h, _) = harness(&[(OP, 1)], None);
        h.text(1, "Tell me about the process").await;
        assert_eq!(h.out.last_to(1).text, dialogue::PROCESS_INFO);
    }

    #[tokio::test]
    async fn topic_choice_connects_operator() {
        let (h, _) = harness(&[(OP, 2)], None);
        h.sessions.update(ANNA, |s| s.push_history("User: how much is TU Delft?"));

        h.command(1, "operator", "").await;
        let topics = h.out.last_to(1).buttons;
        assert_eq!(topics.len(), 5);
        assert_eq!(topics[2], "operator_pricing");

        assert_eq!(h.press(1, "operator_pricing").await, None);
        assert_eq!(h.handoff.operator_of(ANNA), Some(OP));

        let note = h.out.last_to(OP);
        assert!(note.text.contains("New conversation"));
        assert!(note.text.contains("Tuition and costs"));
        assert!(note.text.contains("how much is TU Delft?"));
        assert!(h.out.last_to(1).text.contains("connected"));

        let session = h.sessions.get_or_create(ANNA);
        assert_eq!(session.stage, Stage::WaitingForOperator);
        assert!(session.profile.operator_requested_at.is_some());
    }

    #[tokio::test]
    async fn messages_flow_both_ways() {
        let (h, llm) = harness(&[(OP, 2)], Some("bot answer"));
        h.connect(ANNA).await;

        h.text(1, "Is IELTS 6.0 enough?").await;
        assert!(h.out.last_to(OP).text.contains("Is IELTS 6.0 enough?"));
        assert_eq!(h.out.last_to(1).text, "✅ Sent to the operator");
        assert!(llm.prompts.lock().unwrap().is_empty());

        h.command(900, "reply_1", "Yes, 6.0 is fine.").await;
        let answer = h.out.last_to(1);
        assert!(answer.text.contains("Yes, 6.0 is fine."));
        assert_eq!(
            answer.buttons,
            vec!["thanks_operator", "clarify_operator", "rate_operator"]
        );
        assert_eq!(h.out.last_to(OP).text, "✅ Sent to user 1");

        assert_eq!(h.press(1, "thanks_operator").await.as_deref(), Some("🙏 Glad we could help!"));
    }

    #[tokio::test]
    async fn reply_checks_sender_and_target() {
        let (h, _) = harness(&[(OP, 2)], None);
        h.connect(ANNA).await;

        h.command(2, "reply_1", "hijack").await;
        assert_eq!(h.out.last_to(2).text, OPERATORS_ONLY);

        h.command(900, "reply_5", "hello").await;
        assert!(h.out.last_to(OP).text.contains("User 5 is not connected"));

        h.command(900, "reply_abc", "hello").await;
        assert!(h.out.last_to(OP).text.contains("Invalid format"));

        h.command(900, "reply_1", "").await;
        assert!(h.out.last_to(OP).text.contains("/reply_1 <text>"));
        assert!(!h.out.texts_to(1).iter().any(|t| t.contains("hijack")));
    }

    #[tokio::test]
    async fn user_ends_and_next_in_queue_is_connected() {
        let (h, _) = harness(&[(OP, 1)], None);
        h.connect(ANNA).await;
        h.connect(BORIS).await;
        assert_eq!(h.handoff.queue_position(BORIS), Some(1));

        h.command(1, "end", "").await;
        let farewell = h.out.last_to(1);
        assert!(farewell.text.contains("Conversation finished"));
        assert_eq!(farewell.buttons, vec!["rate_operator", "connect_manager"]);
        assert_eq!(h.sessions.get_or_create(ANNA).stage, Stage::Initial);

        assert_eq!(h.handoff.operator_of(BORIS), Some(OP));
        assert!(h.out.texts_to(OP).iter().any(|t| t.contains("User 1 ended")));

        h.command(1, "end", "").await;
        assert_eq!(h.out.last_to(1).text, NOT_CONNECTED);
    }

    #[tokio::test]
    async fn operator_closes_via_button() {
        let (h, _) = harness(&[(OP, 1)], None);
        h.connect(ANNA).await;
        assert_eq!(h.press(900, "end_chat_1").await, None);
        assert_eq!(h.handoff.operator_of(ANNA), None);
        assert!(h.out.last_to(OP).text.contains("closed"));
        assert!(h.out.last_to(1).text.contains("ended the conversation"));
    }

    #[tokio::test]
    async fn queued_user_can_leave() {
        let (h, _) = harness(&[(OP, 1)], None);
        h.connect(ANNA).await;
        h.connect(BORIS).await;

        h.command(2, "operator", "").await;
        assert!(h.out.last_to(2).text.contains("already in the queue, number 1"));

        assert_eq!(h.press(2, "leave_queue").await.as_deref(), Some("You left the queue"));
        assert_eq!(h.handoff.queue_position(BORIS), None);
        assert_eq!(h.press(2, "leave_queue").await.as_deref(), Some("You are not in the queue"));
    }

    #[tokio::test]
    async fn already_connected_user_is_told_so() {
        let (h, _) = harness(&[(OP, 2)], None);
        h.connect(ANNA).await;
        h.press(1, "connect_manager").await;
        assert_eq!(h.out.last_to(1).text, ALREADY_CONNECTED);
    }

    #[tokio::test]
    async fn operator_stats_and_free_text_hint() {
        let (h, _) = harness(&[(OP, 3)], None);
        h.connect(ANNA).await;

        h.press(900, "operator_stats").await;
        let stats = h.out.last_to(OP).text;
        assert!(stats.contains("1/3"));
        assert!(stats.contains("/reply_1"));

        h.text(900, "hello?").await;
        assert!(h.out.last_to(OP).text.contains("not forwarded"));

        h.command(1, "stats", "").await;
        assert_eq!(h.out.last_to(1).text, OPERATORS_ONLY);
    }

    #[tokio::test]
    async fn idle_operator_text_gets_hint_not_dialogue() {
        let (h, _) = harness(&[(OP, 3)], None);
        h.text(900, "I want to study abroad, connect me with a manager").await;

        let sent = h.out.texts_to(OP);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("not forwarded"));
        assert!(sent[0].contains("/help_operator"));
        assert!(sent[0].contains("0/3"));
        assert_eq!(h.handoff.queue_position(OP.as_user()), None);
    }

    #[tokio::test]
    async fn without_operators_contact_message_is_shown() {
        let (h, _) = harness(&[], None);
        h.text(1, "Связаться с менеджером").await;
        assert_eq!(h.out.last_to(1).text, LeadsConfig::default().contact_message);
    }

    #[tokio::test]
    async fn unknown_inputs() {
        let (h, _) = harness(&[(OP, 1)], None);
        h.command(1, "foo", "").await;
        assert!(h.out.last_to(1).text.contains("Unknown command"));
        assert_eq!(h.press(1, "bogus").await.as_deref(), Some("Unknown action"));
        assert_eq!(
            h.press(1, "reply_to_5").await.as_deref(),
            Some(OPERATORS_ONLY)
        );
    }
}
