//! Per-event admission: ban list first, then admin bypass, then spam check.

use std::sync::Arc;

use crate::{
    domain::Identity,
    identity_store::IdentityStore,
    rate_limit::{RateLimiter, Verdict},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Drop silently.
    RejectBanned,
    /// Send the throttle notice, then drop.
    RejectSpam(Verdict),
}

pub struct AccessGate {
    admins: Arc<IdentityStore>,
    banned: Arc<IdentityStore>,
    limiter: Arc<RateLimiter>,
    auto_ban: bool,
}

impl AccessGate {
    pub fn new(
        admins: Arc<IdentityStore>,
        banned: Arc<IdentityStore>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            admins,
            banned,
            limiter,
            auto_ban: false,
        }
    }

    /// Ban senders that hit a `Block` verdict.
    pub fn with_auto_ban(mut self, enabled: bool) -> Self {
        self.auto_ban = enabled;
        self
    }

    pub fn auto_ban(&self) -> bool {
        self.auto_ban
    }

    pub async fn admit(&self, sender: &Identity) -> Decision {
        let id = sender.user_id();
        if self.banned.contains(id).await {
            return Decision::RejectBanned;
        }
        if self.admins.contains(id).await {
            return Decision::Allow;
        }

        match self.limiter.check(id) {
            Verdict::Clear => Decision::Allow,
            Verdict::Block => {
                if self.auto_ban {
                    self.ban_spammer(sender).await;
                }
                Decision::RejectSpam(Verdict::Block)
            }
            verdict => Decision::RejectSpam(verdict),
        }
    }

    async fn ban_spammer(&self, sender: &Identity) {
        match self.banned.add(sender.clone()).await {
            Ok(true) => tracing::warn!(id = sender.id, "Spammer has been banned!"),
            Ok(false) => {}
            Err(e) => tracing::error!(id = sender.id, "failed to ban spammer: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        domain::UserId,
        testing::{fixture, FakeResolver},
    };

    fn gate(fx: &crate::testing::Fixture) -> AccessGate {
        AccessGate::new(
            fx.moderation.admins().clone(),
            fx.moderation.banned().clone(),
            fx.limiter.clone(),
        )
    }

    #[tokio::test]
    async fn spam_verdicts_map_to_rejections() {
        let fx = fixture(FakeResolver::knowing(&[]));
        let g = gate(&fx);
        let u = Identity::new(42);

        let decisions: Vec<Decision> = {
            let mut out = Vec::new();
            for _ in 0..6 {
                out.push(g.admit(&u).await);
            }
            out
        };
        assert_eq!(decisions[0], Decision::Allow);
        assert_eq!(decisions[1..5], [Decision::RejectSpam(Verdict::Warn); 4]);
        assert_eq!(decisions[5], Decision::RejectSpam(Verdict::Block));
    }

    #[tokio::test]
    async fn ban_dominates_admin_and_rate_limit() {
        let fx = fixture(FakeResolver::knowing(&[]));
        let g = gate(&fx);

        // The fixture admin gets banned as well.
        fx.moderation.ban(fx.admin.clone()).await.unwrap();
        for _ in 0..10 {
            assert_eq!(g.admit(&fx.admin).await, Decision::RejectBanned);
        }
        // Banned senders never touch the limiter.
        assert_eq!(fx.limiter.check(fx.admin.user_id()), Verdict::Clear);
    }

    #[tokio::test]
    async fn admins_bypass_rate_limiting() {
        let fx = fixture(FakeResolver::knowing(&[]));
        let g = gate(&fx);
        for _ in 0..20 {
            assert_eq!(g.admit(&fx.admin).await, Decision::Allow);
        }
    }

    #[tokio::test]
    async fn auto_ban_is_off_by_default() {
        let fx = fixture(FakeResolver::knowing(&[]));
        let g = gate(&fx);
        let u = Identity::new(77);
        for _ in 0..6 {
            g.admit(&u).await;
        }
        assert!(!fx.moderation.banned().contains(UserId(77)).await);
    }

    #[tokio::test]
    async fn auto_ban_bans_on_block() {
        let fx = fixture(FakeResolver::knowing(&[]));
        let g = gate(&fx).with_auto_ban(true);
        let u = Identity::new(78);
        for _ in 0..6 {
            g.admit(&u).await;
        }
        assert!(fx.moderation.banned().contains(UserId(78)).await);
        assert_eq!(g.admit(&u).await, Decision::RejectBanned);
    }
}
