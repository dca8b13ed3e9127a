//! Reply-to-prompt state machine for chat moderation.
//!
//! The state lives entirely in the text of the prompt the bot sent: a reply to
//! a message carrying a known prompt re-enters the matching `Awaiting*` state.
//! Nothing is held in memory, so open prompts survive restarts and never expire.

use std::sync::Arc;

use crate::{
    domain::{Identity, UserId},
    errors::Error,
    messaging::types::ReplyMarkup,
    moderation::{
        parse_target_id, Moderation, ModerationAction, Outcome, STORAGE_FAILURE_NOTICE,
        USER_NOT_FOUND_NOTICE, WRONG_ARGUMENTS,
    },
};

const BAN_PROMPT: &str = "Напишите ID пользователя, которого хотите забанить.";
const UNBAN_PROMPT: &str = "Напишите ID пользователя, которого хотите разбанить.";
const PROMOTE_PROMPT: &str =
    "Напишите ID пользователя, которого хотите сделать администратором.";
const DEMOTE_PROMPT: &str =
    "Напишите ID пользователя, которого хотите лишить привелегий администратора.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingAction {
    Idle,
    AwaitingBan,
    AwaitingUnban,
    AwaitingPromote,
    AwaitingDemote,
}

/// Prompt text -> state. The only place prompt strings are matched.
const PROMPTS: [(&str, PendingAction); 4] = [
    (BAN_PROMPT, PendingAction::AwaitingBan),
    (UNBAN_PROMPT, PendingAction::AwaitingUnban),
    (PROMOTE_PROMPT, PendingAction::AwaitingPromote),
    (DEMOTE_PROMPT, PendingAction::AwaitingDemote),
];

impl PendingAction {
    /// State armed by a replied-to message with this text.
    pub fn from_prompt(text: &str) -> Self {
        PROMPTS
            .iter()
            .find(|(prompt, _)| *prompt == text)
            .map(|(_, state)| *state)
            .unwrap_or(PendingAction::Idle)
    }

    pub fn awaiting(action: ModerationAction) -> Self {
        match action {
            ModerationAction::Ban => PendingAction::AwaitingBan,
            ModerationAction::Unban => PendingAction::AwaitingUnban,
            ModerationAction::Promote => PendingAction::AwaitingPromote,
            ModerationAction::Demote => PendingAction::AwaitingDemote,
        }
    }

    pub fn action(self) -> Option<ModerationAction> {
        match self {
            PendingAction::Idle => None,
            PendingAction::AwaitingBan => Some(ModerationAction::Ban),
            PendingAction::AwaitingUnban => Some(ModerationAction::Unban),
            PendingAction::AwaitingPromote => Some(ModerationAction::Promote),
            PendingAction::AwaitingDemote => Some(ModerationAction::Demote),
        }
    }

    pub fn prompt(self) -> Option<&'static str> {
        self.action().map(prompt_for)
    }
}

fn prompt_for(action: ModerationAction) -> &'static str {
    match action {
        ModerationAction::Ban => BAN_PROMPT,
        ModerationAction::Unban => UNBAN_PROMPT,
        ModerationAction::Promote => PROMOTE_PROMPT,
        ModerationAction::Demote => DEMOTE_PROMPT,
    }
}

/// Result of feeding a reply into an open prompt.
#[derive(Debug)]
pub enum Transition {
    /// Payload was not a numeric id; the prompt stays open.
    Retry { state: PendingAction },
    /// The action ran; `outcome` says whether anything changed.
    Done {
        action: ModerationAction,
        target: UserId,
        outcome: Outcome,
    },
    /// The id did not resolve to a user. Nothing was mutated.
    UnknownTarget {
        action: ModerationAction,
        target: UserId,
    },
    /// The store could not be written.
    Failed {
        action: ModerationAction,
        target: UserId,
        error: Error,
    },
}

impl Transition {
    pub fn next_state(&self) -> PendingAction {
        match self {
            Transition::Retry { state } => *state,
            _ => PendingAction::Idle,
        }
    }

    /// Notice sent back to the admin.
    pub fn notice(&self) -> &'static str {
        match self {
            Transition::Retry { .. } => WRONG_ARGUMENTS,
            Transition::Done { action, outcome, .. } => action.notice(*outcome),
            Transition::UnknownTarget { .. } => USER_NOT_FOUND_NOTICE,
            Transition::Failed { .. } => STORAGE_FAILURE_NOTICE,
        }
    }
}

pub struct PromptWorkflow {
    moderation: Arc<Moderation>,
}

impl PromptWorkflow {
    pub fn new(moderation: Arc<Moderation>) -> Self {
        Self { moderation }
    }

    /// `Idle -> Awaiting*`: the prompt to send and its reply-required markup.
    pub fn open(&self, action: ModerationAction) -> (&'static str, ReplyMarkup) {
        (prompt_for(action), ReplyMarkup::ForceReply)
    }

    /// Feed a reply. Returns `None` when `reply_to` is not an open prompt.
    pub async fn on_reply(
        &self,
        actor: &Identity,
        reply_to: &str,
        payload: &str,
    ) -> Option<Transition> {
        let state = PendingAction::from_prompt(reply_to);
        let action = state.action()?;

        let target = match parse_target_id(payload) {
            Ok(id) => id,
            Err(_) => {
                tracing::warn!(actor = actor.id, payload, "{WRONG_ARGUMENTS}");
                return Some(Transition::Retry { state });
            }
        };

        let transition = match self.moderation.apply(actor, action, target).await {
            Ok(outcome) => Transition::Done {
                action,
                target,
                outcome,
            },
            Err(Error::UnknownIdentity(_)) => Transition::UnknownTarget { action, target },
            Err(error) => Transition::Failed {
                action,
                target,
                error,
            },
        };
        Some(transition)
    }
}
