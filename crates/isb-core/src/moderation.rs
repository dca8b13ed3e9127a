//! User-management operations shared by the operator console and the chat flow.

use std::sync::Arc;

use tokio::runtime::Handle;

use crate::{
    audit::{AuditEvent, AuditLogger},
    domain::{Identity, UserId},
    errors::Error,
    identity_store::IdentityStore,
    messaging::port::IdentityResolver,
    Result,
};

pub const WRONG_ARGUMENTS: &str = "Wrong arguments for this command.";

pub const USER_NOT_FOUND_NOTICE: &str = "Пользователь не существует!";
pub const STORAGE_FAILURE_NOTICE: &str =
    "Не удалось сохранить изменения, попробуйте ещё раз позже.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModerationAction {
    Ban,
    Unban,
    Promote,
    Demote,
}

impl ModerationAction {
    pub const ALL: [ModerationAction; 4] = [
        ModerationAction::Ban,
        ModerationAction::Unban,
        ModerationAction::Promote,
        ModerationAction::Demote,
    ];

    /// Console command and callback data for this action.
    pub fn command(self) -> &'static str {
        match self {
            ModerationAction::Ban => "!ban",
            ModerationAction::Unban => "!unban",
            ModerationAction::Promote => "!make-an-admin",
            ModerationAction::Demote => "!make-a-user",
        }
    }

    pub fn from_command(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.command() == s)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModerationAction::Ban => "ban",
            ModerationAction::Unban => "unban",
            ModerationAction::Promote => "promote",
            ModerationAction::Demote => "demote",
        }
    }

    /// Button label in the admin keyboard.
    pub fn label(self) -> &'static str {
        match self {
            ModerationAction::Ban => "Забанить по ID",
            ModerationAction::Unban => "Разбанить по ID",
            ModerationAction::Promote => "Сделать админом по ID",
            ModerationAction::Demote => "Сделать пользователем по ID",
        }
    }

    /// Chat notice for an outcome of this action.
    pub fn notice(self, outcome: Outcome) -> &'static str {
        match (self, outcome.changed()) {
            (ModerationAction::Ban, true) => "Пользователь был забанен!",
            (ModerationAction::Ban, false) => "Пользователь уже забанен!",
            (ModerationAction::Unban, true) => "Пользователь был разбанен!",
            (ModerationAction::Unban, false) => "Пользователь не является забаненным!",
            (ModerationAction::Promote, true) => "Пользователь получил права администратора!",
            (ModerationAction::Promote, false) => "Пользователь уже является администратором!",
            (ModerationAction::Demote, true) => "Пользователь лишён прав администратора!",
            (ModerationAction::Demote, false) => "Пользователь не является администратором!",
        }
    }

    /// Console log line for an outcome of this action.
    pub fn log_line(self, outcome: Outcome) -> &'static str {
        match (self, outcome.changed()) {
            (ModerationAction::Ban, true) => "User has been banned!",
            (ModerationAction::Ban, false) => "User already is banned!",
            (ModerationAction::Unban, true) => "User has been unbanned!",
            (ModerationAction::Unban, false) => "User is not banned!",
            (ModerationAction::Promote, true) => "User has been promoted to admin!",
            (ModerationAction::Promote, false) => "User already is admin!",
            (ModerationAction::Demote, true) => "User has been demoted from admin!",
            (ModerationAction::Demote, false) => "User is not an admin!",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Added,
    AlreadyPresent,
    Removed,
    NotPresent,
}

impl Outcome {
    pub fn changed(self) -> bool {
        matches!(self, Outcome::Added | Outcome::Removed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Added => "added",
            Outcome::AlreadyPresent => "already_present",
            Outcome::Removed => "removed",
            Outcome::NotPresent => "not_present",
        }
    }

    fn added(changed: bool) -> Self {
        if changed {
            Outcome::Added
        } else {
            Outcome::AlreadyPresent
        }
    }

    fn removed(changed: bool) -> Self {
        if changed {
            Outcome::Removed
        } else {
            Outcome::NotPresent
        }
    }
}

/// Parse a target id: non-empty, decimal digits only, fits in an i64.
pub fn parse_target_id(raw: &str) -> Result<UserId> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::Validation(WRONG_ARGUMENTS.to_string()));
    }
    raw.parse::<i64>()
        .map(UserId)
        .map_err(|_| Error::Validation(WRONG_ARGUMENTS.to_string()))
}

pub struct Moderation {
    admins: Arc<IdentityStore>,
    banned: Arc<IdentityStore>,
    resolver: Arc<dyn IdentityResolver>,
    audit: Arc<AuditLogger>,
}

impl Moderation {
    pub fn new(
        admins: Arc<IdentityStore>,
        banned: Arc<IdentityStore>,
        resolver: Arc<dyn IdentityResolver>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            admins,
            banned,
            resolver,
            audit,
        }
    }

    pub fn admins(&self) -> &Arc<IdentityStore> {
        &self.admins
    }

    pub fn banned(&self) -> &Arc<IdentityStore> {
        &self.banned
    }

    pub async fn is_admin(&self, id: UserId) -> bool {
        self.admins.contains(id).await
    }

    pub async fn ban(&self, target: Identity) -> Result<Outcome> {
        self.banned.add(target).await.map(Outcome::added)
    }

    pub async fn unban(&self, target: UserId) -> Result<Outcome> {
        self.banned.remove(target).await.map(Outcome::removed)
    }

    pub async fn promote(&self, target: Identity) -> Result<Outcome> {
        self.admins.add(target).await.map(Outcome::added)
    }

    pub async fn demote(&self, target: UserId) -> Result<Outcome> {
        self.admins.remove(target).await.map(Outcome::removed)
    }

    pub async fn execute(&self, action: ModerationAction, target: Identity) -> Result<Outcome> {
        match action {
            ModerationAction::Ban => self.ban(target).await,
            ModerationAction::Unban => self.unban(target.user_id()).await,
            ModerationAction::Promote => self.promote(target).await,
            ModerationAction::Demote => self.demote(target.user_id()).await,
        }
    }

    /// Blocking counterpart of [`Moderation::execute`] for the console thread.
    pub fn execute_blocking(&self, action: ModerationAction, target: Identity) -> Result<Outcome> {
        match action {
            ModerationAction::Ban => self.banned.add_blocking(target).map(Outcome::added),
            ModerationAction::Unban => self
                .banned
                .remove_blocking(target.user_id())
                .map(Outcome::removed),
            ModerationAction::Promote => self.admins.add_blocking(target).map(Outcome::added),
            ModerationAction::Demote => self
                .admins
                .remove_blocking(target.user_id())
                .map(Outcome::removed),
        }
    }

    /// Look up `id` through the messenger. Any failure means "no such user".
    pub async fn resolve(&self, id: UserId) -> Result<Identity> {
        match self.resolver.resolve(id).await {
            Ok(identity) => Ok(identity),
            Err(e) => {
                tracing::debug!(id = id.0, "identity lookup failed: {e}");
                Err(Error::UnknownIdentity(id.0))
            }
        }
    }

    /// Resolve the target and run `action` on it. `actor` is the admin who
    /// asked for it in chat.
    pub async fn apply(
        &self,
        actor: &Identity,
        action: ModerationAction,
        target: UserId,
    ) -> Result<Outcome> {
        let result = match self.resolve(target).await {
            Ok(identity) => self.execute(action, identity).await,
            Err(e) => Err(e),
        };
        self.report(Some(actor), action, target, &result);
        result
    }

    /// Console path: blocks the calling thread while the lookup runs on `rt`.
    ///
    /// Must be called from a plain thread, never from inside an async task.
    pub fn apply_blocking(
        &self,
        rt: &Handle,
        action: ModerationAction,
        target: UserId,
    ) -> Result<Outcome> {
        let result = match rt.block_on(self.resolve(target)) {
            Ok(identity) => self.execute_blocking(action, identity),
            Err(e) => Err(e),
        };
        self.report(None, action, target, &result);
        result
    }

    fn report(
        &self,
        actor: Option<&Identity>,
        action: ModerationAction,
        target: UserId,
        result: &Result<Outcome>,
    ) {
        match result {
            Ok(outcome) => {
                tracing::info!(target_id = target.0, "{}", action.log_line(*outcome));
                self.audit.record(AuditEvent::moderation(
                    actor,
                    action.as_str(),
                    target.0,
                    outcome.as_str(),
                ));
            }
            Err(Error::UnknownIdentity(_)) => {
                tracing::info!(target_id = target.0, "User doesn't exist!");
                self.audit.record(AuditEvent::moderation(
                    actor,
                    action.as_str(),
                    target.0,
                    "unknown_identity",
                ));
            }
            Err(e) => {
                tracing::error!(
                    target_id = target.0,
                    action = action.as_str(),
                    "moderation failed: {e}"
                );
                self.audit.record(AuditEvent::error(actor, &e.to_string()));
            }
        }
    }
}
