//! Prune policy.
//!
//! Decides which operations are followed by a sweep of expired rows.

use crate::config::PruneTrigger;

/// Set of operations that trigger an expired-row sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrunePolicy {
    mask: u8,
}

impl PrunePolicy {
    /// Policy that never sweeps.
    pub const NEVER: Self = Self { mask: 0 };

    const fn bit(trigger: PruneTrigger) -> u8 {
        1 << trigger as u8
    }

    /// Builds a policy from a trigger list. Duplicates are ignored.
    pub fn new(triggers: impl IntoIterator<Item = PruneTrigger>) -> Self {
        let mask = triggers
            .into_iter()
            .fold(0, |mask, trigger| mask | Self::bit(trigger));
        Self { mask }
    }

    /// Whether `trigger` is followed by a sweep.
    pub const fn prunes_after(self, trigger: PruneTrigger) -> bool {
        self.mask & Self::bit(trigger) != 0
    }

    /// Enabled triggers in declaration order.
    pub fn triggers(self) -> impl Iterator<Item = PruneTrigger> {
        PruneTrigger::ALL
            .into_iter()
            .filter(move |t| self.prunes_after(*t))
    }
}

impl Default for PrunePolicy {
    /// Sweeps after writes only; reads never pay for a write.
    fn default() -> Self {
        Self::new([PruneTrigger::Put, PruneTrigger::Delete])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prunes_on_writes_only() {
        let policy = PrunePolicy::default();
        assert!(policy.prunes_after(PruneTrigger::Put));
        assert!(policy.prunes_after(PruneTrigger::Delete));
        assert!(!policy.prunes_after(PruneTrigger::Get));
        assert!(!policy.prunes_after(PruneTrigger::GetWithMetadata));
        assert!(!policy.prunes_after(PruneTrigger::List));
    }

    #[test]
    fn test_never() {
        assert_eq!(PrunePolicy::NEVER.triggers().count(), 0);
        assert_eq!(PrunePolicy::new([]), PrunePolicy::NEVER);
    }

    #[test]
    fn test_triggers_round_trip() {
        let policy = PrunePolicy::new([
            PruneTrigger::List,
            PruneTrigger::Get,
            PruneTrigger::List,
        ]);
        assert_eq!(
            policy.triggers().collect::<Vec<_>>(),
            vec![PruneTrigger::Get, PruneTrigger::List]
        );
    }
}
