use serde::{Deserialize, Serialize};

use crate::model::ids::GenerationToken;
use crate::model::topic::{Scope, Topic};

/// Where a generation run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
    Requested,
    Skeleton,
    InitialBatch,
    RemainingBatch,
    Complete,
    Failed,
}

impl GenerationPhase {
    /// Coarse progress percentage reported for this phase.
    #[must_use]
    pub fn percent(self) -> u8 {
        match self {
            Self::Requested | Self::Failed => 0,
            Self::Skeleton => 30,
            Self::InitialBatch => 60,
            Self::RemainingBatch => 80,
            Self::Complete => 100,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// Transient state of the most recent generation request.
///
/// Starting a new run replaces the token; results carrying an older token are
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSession {
    topic: Topic,
    scope: Scope,
    phase: GenerationPhase,
    active_token: GenerationToken,
}

impl GenerationSession {
    #[must_use]
    pub fn start(topic: Topic, scope: Scope) -> Self {
        Self {
            topic,
            scope,
            phase: GenerationPhase::Requested,
            active_token: GenerationToken::new(),
        }
    }

    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub fn phase(&self) -> GenerationPhase {
        self.phase
    }

    #[must_use]
    pub fn active_token(&self) -> GenerationToken {
        self.active_token
    }

    #[must_use]
    pub fn is_current(&self, token: GenerationToken) -> bool {
        self.active_token == token
    }

    pub fn set_phase(&mut self, phase: GenerationPhase) {
        self.phase = phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_start_gets_a_new_token() {
        let topic = Topic::parse("Frações simples").unwrap();
        let a = GenerationSession::start(topic.clone(), Scope::global());
        let b = GenerationSession::start(topic, Scope::global());
        assert!(!a.is_current(b.active_token()));
        assert!(b.is_current(b.active_token()));
    }

    #[test]
    fn percents_are_monotonic_until_complete() {
        let phases = [
            GenerationPhase::Requested,
            GenerationPhase::Skeleton,
            GenerationPhase::InitialBatch,
            GenerationPhase::RemainingBatch,
            GenerationPhase::Complete,
        ];
        assert!(phases.windows(2).all(|w| w[0].percent() < w[1].percent()));
        assert_eq!(GenerationPhase::Complete.percent(), 100);
    }
}
