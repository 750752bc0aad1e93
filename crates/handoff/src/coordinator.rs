//! Async front of the hand-off core: routes, relays and notifies.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use {
    chrono::Utc,
    studybot_channels::{ChannelOutbound, InlineButton, InlineKeyboard},
    studybot_common::{OperatorId, UserId},
    studybot_config::HandoffConfig,
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    Binding, Error, HandoffSnapshot, HandoffState, OperatorDirectory, OperatorStats, QueueEntry,
    RequestOutcome, Result, WorkingHours, actions,
};

const OPERATOR_UNAVAILABLE: &str =
    "⚠️ The operator is unavailable right now. Please try again a bit later with /operator.";

/// Renders what the operator should know about a user when a conversation starts.
pub trait LeadContext: Send + Sync {
    fn lead_summary(&self, user: UserId) -> String;
}

/// Who ends a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    User,
    Operator(OperatorId),
}

enum Undelivered {
    Operator(studybot_channels::Error),
    User(studybot_channels::Error),
}

/// Owns the hand-off state and the background sweep.
pub struct HandoffCoordinator {
    state: Mutex<HandoffState>,
    outbound: Arc<dyn ChannelOutbound>,
    leads: Arc<dyn LeadContext>,
    hours: Option<WorkingHours>,
    sweep_interval: Duration,
    cancel: CancellationToken,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl HandoffCoordinator {
    pub fn new(
        directory: OperatorDirectory,
        outbound: Arc<dyn ChannelOutbound>,
        leads: Arc<dyn LeadContext>,
    ) -> Self {
        Self {
            state: Mutex::new(HandoffState::new(directory)),
            outbound,
            leads,
            hours: None,
            sweep_interval: Duration::from_secs(300),
            cancel: CancellationToken::new(),
            timer: Mutex::new(None),
        }
    }

    pub fn from_config(
        config: &HandoffConfig,
        outbound: Arc<dyn ChannelOutbound>,
        leads: Arc<dyn LeadContext>,
    ) -> Result<Self> {
        let hours = config
            .working_hours
            .as_ref()
            .map(WorkingHours::from_config)
            .transpose()?;
        Ok(
            Self::new(OperatorDirectory::from_config(config), outbound, leads)
                .with_working_hours(hours)
                .with_sweep_interval(Duration::from_secs(config.sweep_interval_secs.max(1))),
        )
    }

    #[must_use]
    pub fn with_working_hours(mut self, hours: Option<WorkingHours>) -> Self {
        self.hours = hours;
        self
    }

    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    fn state(&self) -> MutexGuard<'_, HandoffState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_operator(&self, identity: OperatorId) -> bool {
        self.state().directory().contains(identity)
    }

    /// False when the directory is empty and every request would queue forever.
    pub fn has_operators(&self) -> bool {
        !self.state().directory().is_empty()
    }

    pub fn operator_of(&self, user: UserId) -> Option<OperatorId> {
        self.state().operator_of(user)
    }

    pub fn queue_position(&self, user: UserId) -> Option<usize> {
        self.state().queue_position(user)
    }

    pub fn operator_stats(&self, operator: OperatorId) -> Result<OperatorStats> {
        self.state().stats(operator)
    }

    pub fn snapshot(&self) -> HandoffSnapshot {
        self.state().snapshot()
    }

    fn closed_window(&self) -> Option<String> {
        self.hours
            .as_ref()
            .filter(|hours| !hours.is_open())
            .map(WorkingHours::describe)
    }

    /// Connect the user to an operator, or queue them.
    ///
    /// Both parties are notified here. A failed operator notification undoes
    /// the binding and tells the user the operator is unavailable.
    pub async fn request_operator(&self, user: UserId) -> Result<RequestOutcome> {
        if let Some(window) = self.closed_window() {
            let bound = self.state().operator_of(user);
            return Err(match bound {
                Some(operator) => Error::AlreadyBound { user, operator },
                None => Error::OutsideWorkingHours { window },
            });
        }

        // whoever already waits gets the free slots before this request is routed
        let waiting = self.state().has_waiting();
        if waiting {
            let was_queued = self.queue_position(user).is_some();
            self.sweep_now().await;
            let swept_in = self.state().binding_of(user);
            if was_queued && let Some(binding) = swept_in {
                return Ok(RequestOutcome::Bound(binding));
            }
        }

        let outcome = self.state().request(user, Utc::now())?;
        match &outcome {
            RequestOutcome::Bound(binding) => match self.deliver_binding(binding, None).await {
                Ok(()) => {},
                Err(Undelivered::Operator(e)) => {
                    return Err(Error::delivery(binding.operator_id.chat(), e));
                },
                Err(Undelivered::User(e)) => {
                    self.sweep_now().await;
                    return Err(Error::delivery(user.chat(), e));
                },
            },
            RequestOutcome::Queued { position } => {
                info!(user_id = %user, position, "user waiting for an operator");
                let text = format!(
                    "⏳ All operators are busy right now. You are number {position} in the queue, \
                     we will connect you as soon as someone is free."
                );
                let keyboard = InlineKeyboard::single("❌ Leave the queue", actions::LEAVE_QUEUE);
                self.send_quietly(&user.chat(), &text, Some(&keyboard)).await;
            },
        }
        Ok(outcome)
    }

    /// Leave the wait queue. Returns whether the user was queued.
    pub fn cancel_wait(&self, user: UserId) -> bool {
        let removed = self.state().cancel_wait(user);
        if removed {
            info!(user_id = %user, "user left the queue");
        }
        removed
    }

    /// Forward a user's message to their operator.
    pub async fn relay_user_message(&self, user: UserId, text: &str) -> Result<()> {
        let operator = self
            .state()
            .operator_of(user)
            .ok_or(Error::NotBound { user })?;

        let forwarded = format!(
            "💬 User {user} ({} UTC):\n{text}\n\nReply: /reply_{user} <text>",
            Utc::now().format("%H:%M")
        );
        let keyboard = operator_keyboard(user);
        if let Err(e) = self
            .outbound
            .send_text(&operator.chat(), &forwarded, Some(&keyboard))
            .await
        {
            warn!(user_id = %user, operator_id = %operator, error = %e, "relay to operator failed, closing conversation");
            let released = self.state().release_if(user, operator).is_some();
            self.send_quietly(&user.chat(), OPERATOR_UNAVAILABLE, None)
                .await;
            if released {
                self.sweep_now().await;
            }
            return Err(Error::delivery(operator.chat(), e));
        }
        debug!(user_id = %user, operator_id = %operator, "relayed user message");
        Ok(())
    }

    /// Deliver an operator's reply. Only the bound operator may reply.
    pub async fn relay_operator_reply(
        &self,
        operator: OperatorId,
        user: UserId,
        text: &str,
    ) -> Result<()> {
        {
            let state = self.state();
            if !state.directory().contains(operator) {
                return Err(Error::Unauthorized {
                    identity: operator.0,
                });
            }
            if state.operator_of(user) != Some(operator) {
                return Err(Error::NotBound { user });
            }
        }

        let keyboard = InlineKeyboard::new()
            .row(vec![
                InlineButton::new("🙏 Thanks", actions::THANKS_OPERATOR),
                InlineButton::new("❓ Ask more", actions::CLARIFY_OPERATOR),
            ])
            .button("⭐ Rate the answer", actions::RATE_OPERATOR);
        let message = format!("👤 Operator:\n{text}");
        if let Err(e) = self
            .outbound
            .send_text(&user.chat(), &message, Some(&keyboard))
            .await
        {
            warn!(user_id = %user, operator_id = %operator, error = %e, "reply to user failed, closing conversation");
            let released = self.state().release_if(user, operator).is_some();
            self.send_quietly(
                &operator.chat(),
                &format!("⚠️ User {user} could not be reached, the conversation was closed."),
                None,
            )
            .await;
            if released {
                self.sweep_now().await;
            }
            return Err(Error::delivery(user.chat(), e));
        }
        debug!(user_id = %user, operator_id = %operator, "relayed operator reply");
        Ok(())
    }

    /// End a conversation from either side and notify the other one.
    pub async fn end_session(&self, initiator: Party, user: UserId) -> Result<Binding> {
        let binding = {
            let mut state = self.state();
            match initiator {
                Party::User => state.release(user)?,
                Party::Operator(operator) => {
                    if !state.directory().contains(operator) {
                        return Err(Error::Unauthorized {
                            identity: operator.0,
                        });
                    }
                    state
                        .release_if(user, operator)
                        .ok_or(Error::NotBound { user })?
                },
            }
        };

        match initiator {
            Party::User => {
                self.send_quietly(
                    &binding.operator_id.chat(),
                    &format!("🔚 User {user} ended the conversation."),
                    None,
                )
                .await;
            },
            Party::Operator(_) => {
                self.send_quietly(
                    &user.chat(),
                    "🔚 The operator has ended the conversation. Thank you! \
                     Send /operator whenever you need a person again.",
                    None,
                )
                .await;
            },
        }
        self.sweep_now().await;
        Ok(binding)
    }

    /// Bind queued users while capacity lasts. Returns how many were connected.
    pub async fn sweep_now(&self) -> usize {
        if let Some(window) = self.closed_window() {
            debug!(window, "outside working hours, skipping queue sweep");
            return 0;
        }

        let mut connected = 0;
        loop {
            let swept = self.state().sweep(Utc::now());
            if swept.is_empty() {
                break;
            }
            // capacity freed by an unreachable user is worth another pass
            let mut freed = false;
            for (binding, entry) in swept {
                match self.deliver_binding(&binding, Some(entry)).await {
                    Ok(()) => connected += 1,
                    Err(Undelivered::Operator(_)) => {},
                    Err(Undelivered::User(_)) => freed = true,
                }
            }
            if !freed {
                break;
            }
        }
        if connected > 0 {
            info!(connected, "queue sweep connected users");
        }
        connected
    }

    /// Notify operator then user about a fresh binding, undoing it on failure.
    ///
    /// `requeue` is the user's former queue entry for sweep-originated
    /// bindings; they go back to the head of the queue if the operator
    /// cannot be reached.
    async fn deliver_binding(
        &self,
        binding: &Binding,
        requeue: Option<QueueEntry>,
    ) -> std::result::Result<(), Undelivered> {
        let user = binding.user_id;
        let operator = binding.operator_id;
        let from_queue = requeue.is_some();

        let summary = self.leads.lead_summary(user);
        let text = format!(
            "🔔 New conversation\n\n{summary}\n\nReply: /reply_{user} <text>\nEnd: /end_{user}"
        );
        let keyboard = operator_keyboard(user).button("📊 My stats", actions::OPERATOR_STATS);
        if let Err(e) = self
            .outbound
            .send_text(&operator.chat(), &text, Some(&keyboard))
            .await
        {
            warn!(user_id = %user, operator_id = %operator, error = %e, "operator notification failed, rolling back");
            self.state().rollback(binding, requeue);
            if !from_queue {
                self.send_quietly(&user.chat(), OPERATOR_UNAVAILABLE, None)
                    .await;
            }
            return Err(Undelivered::Operator(e));
        }

        let name = self
            .state()
            .directory()
            .display_name(operator)
            .map(str::to_string);
        let greeting = match name {
            Some(name) => format!("✅ You are now connected to {name}."),
            None => "✅ You are now connected to an operator.".to_string(),
        };
        let text = format!(
            "{greeting}\n\nWrite your question here and the answer will come to this chat. \
             Send /end to finish the conversation."
        );
        let keyboard = InlineKeyboard::single("🔚 End conversation", actions::END_OPERATOR_CHAT);
        if let Err(e) = self
            .outbound
            .send_text(&user.chat(), &text, Some(&keyboard))
            .await
        {
            warn!(user_id = %user, operator_id = %operator, error = %e, "user notification failed, closing conversation");
            let released = self.state().rollback(binding, None);
            if released {
                self.send_quietly(
                    &operator.chat(),
                    &format!("⚠️ User {user} could not be reached, the conversation was closed."),
                    None,
                )
                .await;
            }
            return Err(Undelivered::User(e));
        }
        Ok(())
    }

    async fn send_reminders(&self) {
        let due = self.state().take_reminders();
        for (user, position) in due {
            let text = format!(
                "⏳ Operators are still busy. You are number {position} in the queue. \
                 Send /cancel to stop waiting."
            );
            self.send_quietly(&user.chat(), &text, None).await;
        }
    }

    async fn send_quietly(&self, to: &str, text: &str, keyboard: Option<&InlineKeyboard>) {
        if let Err(e) = self.outbound.send_text(to, text, keyboard).await {
            warn!(to, error = %e, "hand-off notice not delivered");
        }
    }

    /// Start the periodic queue sweep. Calling it again is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if timer.is_some() {
            return;
        }
        let this = Arc::clone(self);
        *timer = Some(tokio::spawn(async move {
            this.timer_loop().await;
        }));
        info!(
            interval_secs = self.sweep_interval.as_secs(),
            "hand-off sweep timer started"
        );
    }

    async fn timer_loop(&self) {
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(self.sweep_interval) => {},
            }
            if let Some(window) = self.closed_window() {
                debug!(window, "outside working hours, timer idle");
                continue;
            }
            let connected = self.sweep_now().await;
            self.send_reminders().await;
            debug!(connected, "timer sweep done");
        }
    }

    /// Stop the sweep timer and wait for it to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "sweep timer ended abnormally");
        }
        info!("hand-off coordinator stopped");
    }
}

fn operator_keyboard(user: UserId) -> InlineKeyboard {
    InlineKeyboard::new().row(vec![
        InlineButton::new("💬 Reply", format!("{}{user}", actions::REPLY_TO_PREFIX)),
        InlineButton::new("🔚 End chat", format!("{}{user}", actions::END_CHAT_PREFIX)),
    ])
}

#[cfg(test)]
mod tests {
    use crate::testing::{RecordingOutbound, StaticLeads};

    use super::*;

    const O1: OperatorId = OperatorId(1);
    const O2: OperatorId = OperatorId(2);
    const A: UserId = UserId(10);
    const B: UserId = UserId(11);
    const C: UserId = UserId(12);

    fn coordinator(caps: &[(OperatorId, usize)]) -> (Arc<HandoffCoordinator>, Arc<RecordingOutbound>) {
        let outbound = Arc::new(RecordingOutbound::default());
        let coordinator = HandoffCoordinator::new(
            OperatorDirectory::new(caps.iter().copied()),
            outbound.clone(),
            Arc::new(StaticLeads),
        );
        (Arc::new(coordinator), outbound)
    }

    fn bound_operator(outcome: &RequestOutcome) -> Option<OperatorId> {
        match outcome {
            RequestOutcome::Bound(b) => Some(b.operator_id),
            RequestOutcome::Queued { .. } => None,
        }
    }

    #[tokio::test]
    async fn operator_ends_chat_and_queued_user_is_connected() {
        let (hc, out) = coordinator(&[(O1, 1)]);

        let a = hc.request_operator(A).await.unwrap();
        assert_eq!(bound_operator(&a), Some(O1));
        let note = out.last_to(&O1.chat()).unwrap();
        assert!(note.text.contains("Lead 10"));
        assert!(note.buttons.contains(&"reply_to_10".to_string()));
        assert!(out.last_to(&A.chat()).unwrap().text.contains("connected"));

        let b = hc.request_operator(B).await.unwrap();
        assert_eq!(b, RequestOutcome::Queued { position: 1 });
        assert_eq!(out.last_to(&B.chat()).unwrap().buttons, vec!["leave_queue"]);

        hc.end_session(Party::Operator(O1), A).await.unwrap();
        assert!(out.last_to(&A.chat()).unwrap().text.contains("ended"));
        assert_eq!(hc.operator_of(B), Some(O1));
        assert!(out.last_to(&O1.chat()).unwrap().text.contains("Lead 11"));
        assert!(hc.snapshot().queue.is_empty());
        hc.state().assert_consistent();
    }

    #[tokio::test]
    async fn other_operator_cannot_reply() {
        let (hc, out) = coordinator(&[(O1, 1), (O2, 1)]);
        hc.request_operator(A).await.unwrap();
        assert_eq!(hc.operator_of(A), Some(O1));
        let sent_before = out.sent_to(&A.chat()).len();

        let err = hc.relay_operator_reply(O2, A, "hi").await.unwrap_err();
        assert!(matches!(err, Error::NotBound { user } if user == A));
        let err = hc
            .relay_operator_reply(OperatorId(99), A, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized { identity: 99 }));

        assert_eq!(hc.operator_of(A), Some(O1));
        assert_eq!(out.sent_to(&A.chat()).len(), sent_before);
    }

    #[tokio::test]
    async fn failed_operator_notification_rolls_back() {
        let (hc, out) = coordinator(&[(O1, 1)]);
        out.fail_for(O1.chat());
        let before = hc.snapshot();

        let err = hc.request_operator(A).await.unwrap_err();
        assert!(matches!(err, Error::DeliveryFailure { .. }));
        assert_eq!(hc.snapshot(), before);
        assert_eq!(hc.operator_of(A), None);
        assert_eq!(hc.queue_position(A), None);
        assert!(out.last_to(&A.chat()).unwrap().text.contains("unavailable"));
    }

    #[tokio::test]
    async fn unreachable_user_frees_the_slot() {
        let (hc, out) = coordinator(&[(O1, 1)]);
        out.fail_for(A.chat());
        let err = hc.request_operator(A).await.unwrap_err();
        assert!(matches!(err, Error::DeliveryFailure { ref to, .. } if to == "10"));
        assert_eq!(hc.operator_of(A), None);
        assert!(out.last_to(&O1.chat()).unwrap().text.contains("could not be reached"));
        assert_eq!(hc.snapshot().operators[0].load, 0);
    }

    #[tokio::test]
    async fn relays_in_both_directions() {
        let (hc, out) = coordinator(&[(O1, 2)]);
        hc.request_operator(A).await.unwrap();

        hc.relay_user_message(A, "How much is the visa?").await.unwrap();
        let fwd = out.last_to(&O1.chat()).unwrap();
        assert!(fwd.text.contains("How much is the visa?"));
        assert!(fwd.text.contains("/reply_10"));

        hc.relay_operator_reply(O1, A, "About 75 euro").await.unwrap();
        let reply = out.last_to(&A.chat()).unwrap();
        assert!(reply.text.contains("About 75 euro"));
        assert!(reply.buttons.contains(&"rate_operator".to_string()));
        assert_eq!(hc.operator_of(A), Some(O1));

        let err = hc.relay_user_message(B, "hello").await.unwrap_err();
        assert!(matches!(err, Error::NotBound { .. }));
    }

    #[tokio::test]
    async fn relay_failure_releases_and_informs_user() {
        let (hc, out) = coordinator(&[(O1, 1)]);
        hc.request_operator(A).await.unwrap();
        hc.request_operator(B).await.unwrap();
        out.fail_for(O1.chat());

        let err = hc.relay_user_message(A, "hello?").await.unwrap_err();
        assert!(matches!(err, Error::DeliveryFailure { .. }));
        assert_eq!(hc.operator_of(A), None);
        assert!(out.last_to(&A.chat()).unwrap().text.contains("unavailable"));
        // B was swept but O1 is still unreachable, so B waits at the head again
        assert_eq!(hc.snapshot().queue, vec![B]);
        assert_eq!(hc.snapshot().operators[0].load, 0);
    }

    #[tokio::test]
    async fn reply_failure_releases_and_informs_operator() {
        let (hc, out) = coordinator(&[(O1, 1)]);
        hc.request_operator(A).await.unwrap();
        out.fail_for(A.chat());

        let err = hc.relay_operator_reply(O1, A, "hi").await.unwrap_err();
        assert!(matches!(err, Error::DeliveryFailure { .. }));
        assert_eq!(hc.operator_of(A), None);
        assert!(out.last_to(&O1.chat()).unwrap().text.contains("could not be reached"));
    }

    #[tokio::test]
    async fn user_ends_session_once() {
        let (hc, out) = coordinator(&[(O1, 1)]);
        hc.request_operator(A).await.unwrap();

        let binding = hc.end_session(Party::User, A).await.unwrap();
        assert_eq!(binding.operator_id, O1);
        assert!(out.last_to(&O1.chat()).unwrap().text.contains("User 10 ended"));

        let before = hc.snapshot();
        assert!(matches!(
            hc.end_session(Party::User, A).await,
            Err(Error::NotBound { .. })
        ));
        assert_eq!(hc.snapshot(), before);
    }

    #[tokio::test]
    async fn operator_cannot_end_someone_elses_chat() {
        let (hc, _out) = coordinator(&[(O1, 1), (O2, 1)]);
        hc.request_operator(A).await.unwrap();
        assert!(matches!(
            hc.end_session(Party::Operator(O2), A).await,
            Err(Error::NotBound { .. })
        ));
        assert!(matches!(
            hc.end_session(Party::Operator(OperatorId(5)), A).await,
            Err(Error::Unauthorized { .. })
        ));
        assert_eq!(hc.operator_of(A), Some(O1));
    }

    #[tokio::test]
    async fn failed_sweep_delivery_requeues_at_head() {
        let (hc, out) = coordinator(&[(O1, 1)]);
        hc.request_operator(A).await.unwrap();
        hc.request_operator(B).await.unwrap();
        hc.request_operator(C).await.unwrap();

        out.fail_for(O1.chat());
        hc.end_session(Party::User, A).await.unwrap();
        assert_eq!(hc.snapshot().queue, vec![B, C]);
        assert_eq!(hc.snapshot().operators[0].load, 0);

        out.recover(&O1.chat());
        assert_eq!(hc.sweep_now().await, 1);
        assert_eq!(hc.operator_of(B), Some(O1));
        assert_eq!(hc.snapshot().queue, vec![C]);
    }

    #[tokio::test]
    async fn cancel_wait_leaves_queue() {
        let (hc, _out) = coordinator(&[(O1, 1)]);
        hc.request_operator(A).await.unwrap();
        hc.request_operator(B).await.unwrap();
        assert!(hc.cancel_wait(B));
        assert!(!hc.cancel_wait(B));
        hc.end_session(Party::User, A).await.unwrap();
        assert_eq!(hc.operator_of(B), None);
    }

    #[tokio::test]
    async fn second_request_while_bound_is_rejected() {
        let (hc, _out) = coordinator(&[(O1, 2)]);
        hc.request_operator(A).await.unwrap();
        assert!(matches!(
            hc.request_operator(A).await,
            Err(Error::AlreadyBound { operator, .. }) if operator == O1
        ));
    }

    #[tokio::test]
    async fn closed_window_refuses_without_queueing() {
        let outbound = Arc::new(RecordingOutbound::default());
        let hc = HandoffCoordinator::new(
            OperatorDirectory::new([(O1, 1)]),
            outbound,
            Arc::new(StaticLeads),
        )
        .with_working_hours(Some(WorkingHours::new(600, 600, None)));

        let err = hc.request_operator(A).await.unwrap_err();
        assert!(matches!(err, Error::OutsideWorkingHours { ref window } if window.starts_with("10:00-10:00")));
        assert!(hc.snapshot().queue.is_empty());
        assert_eq!(hc.sweep_now().await, 0);
    }

    #[tokio::test]
    async fn newcomer_does_not_overtake_requeued_user() {
        let (hc, out) = coordinator(&[(O1, 1)]);
        hc.request_operator(A).await.unwrap();
        hc.request_operator(B).await.unwrap();
        out.fail_for(O1.chat());
        hc.end_session(Party::User, A).await.unwrap();
        assert_eq!(hc.snapshot().queue, vec![B]);
        assert_eq!(hc.snapshot().operators[0].load, 0);

        out.recover(&O1.chat());
        let c = hc.request_operator(C).await.unwrap();
        assert_eq!(c, RequestOutcome::Queued { position: 1 });
        assert_eq!(hc.operator_of(B), Some(O1));
        assert_eq!(hc.operator_of(C), None);
        assert_eq!(hc.snapshot().queue, vec![C]);
        assert!(out.last_to(&B.chat()).unwrap().text.contains("connected"));
        hc.state().assert_consistent();
    }

    #[tokio::test]
    async fn queued_user_asking_again_is_swept_in_first() {
        let (hc, out) = coordinator(&[(O1, 1)]);
        hc.request_operator(A).await.unwrap();
        hc.request_operator(B).await.unwrap();
        hc.request_operator(C).await.unwrap();
        // slot freed without a sweep
        hc.state().release(A).unwrap();

        let b = hc.request_operator(B).await.unwrap();
        assert_eq!(bound_operator(&b), Some(O1));
        let notices = out
            .sent_to(&O1.chat())
            .into_iter()
            .filter(|t| t.contains("Lead 11"))
            .count();
        assert_eq!(notices, 1);
        assert_eq!(hc.snapshot().queue, vec![C]);
    }

    #[tokio::test]
    async fn open_window_from_config_routes_normally() {
        use studybot_config::{OperatorEntry, WorkingHoursConfig};

        let config = HandoffConfig {
            operators: vec![OperatorEntry::new(1)],
            max_active_per_operator: 1,
            working_hours: Some(WorkingHoursConfig {
                start: "00:00".into(),
                end: "24:00".into(),
                timezone: "UTC".into(),
            }),
            ..HandoffConfig::default()
        };
        let hc = HandoffCoordinator::from_config(
            &config,
            Arc::new(RecordingOutbound::default()),
            Arc::new(StaticLeads),
        )
        .unwrap();

        let a = hc.request_operator(A).await.unwrap();
        assert_eq!(bound_operator(&a), Some(O1));
        assert_eq!(
            hc.request_operator(B).await.unwrap(),
            RequestOutcome::Queued { position: 1 }
        );
        hc.end_session(Party::Operator(O1), A).await.unwrap();
        assert_eq!(hc.operator_of(B), Some(O1));
    }

    #[tokio::test]
    async fn timer_sends_no_reminders_while_closed() {
        let out = Arc::new(RecordingOutbound::default());
        let hc = Arc::new(
            HandoffCoordinator::new(
                OperatorDirectory::new([(O1, 1)]),
                out.clone(),
                Arc::new(StaticLeads),
            )
            .with_working_hours(Some(WorkingHours::new(600, 600, None)))
            .with_sweep_interval(Duration::from_millis(20)),
        );
        // queue built while the window was open
        {
            let mut state = hc.state();
            state.request(A, Utc::now()).unwrap();
            state.request(B, Utc::now()).unwrap();
        }
        hc.start();
        tokio::time::sleep(Duration::from_millis(120)).await;
        hc.shutdown().await;

        assert!(out.sent_to(&B.chat()).is_empty());
        assert_eq!(hc.queue_position(B), Some(1));
    }

    #[tokio::test]
    async fn stats_for_operator() {
        let (hc, _out) = coordinator(&[(O1, 2)]);
        hc.request_operator(A).await.unwrap();
        let stats = hc.operator_stats(O1).unwrap();
        assert_eq!((stats.active, stats.capacity), (1, 2));
        assert!(hc.operator_stats(OperatorId(3)).is_err());
        assert!(hc.is_operator(O1));
        assert!(!hc.is_operator(OperatorId(3)));
        assert!(hc.has_operators());
        assert!(!coordinator(&[]).0.has_operators());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_never_exceed_capacity() {
        let (hc, _out) = coordinator(&[(O1, 2), (O2, 2), (OperatorId(3), 2)]);

        let tasks: Vec<_> = (0..40)
            .map(|i| {
                let hc = Arc::clone(&hc);
                tokio::spawn(async move { hc.request_operator(UserId(1000 + i)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let snap = hc.snapshot();
        assert_eq!(snap.bindings.len(), 6);
        assert_eq!(snap.queue.len(), 34);
        for op in &snap.operators {
            assert_eq!(op.load, 2);
        }
        hc.state().assert_consistent();
    }

    #[tokio::test]
    async fn timer_sweeps_and_reminds_once() {
        let out = Arc::new(RecordingOutbound::default());
        let hc = Arc::new(
            HandoffCoordinator::new(
                OperatorDirectory::new([(O1, 1)]),
                out.clone(),
                Arc::new(StaticLeads),
            )
            .with_sweep_interval(Duration::from_millis(20)),
        );
        hc.request_operator(A).await.unwrap();
        hc.request_operator(B).await.unwrap();
        hc.start();
        hc.start();

        tokio::time::sleep(Duration::from_millis(150)).await;
        let reminders: Vec<_> = out
            .sent_to(&B.chat())
            .into_iter()
            .filter(|t| t.contains("still busy"))
            .collect();
        assert_eq!(reminders.len(), 1);

        // free the slot behind the coordinator's back; only the timer can pick B up
        hc.state().release(A).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(hc.operator_of(B), Some(O1));

        hc.shutdown().await;
        assert!(hc.timer.lock().unwrap().is_none());
    }
}
