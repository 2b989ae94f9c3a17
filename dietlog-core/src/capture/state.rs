use std::fmt;

use uuid::Uuid;

/// Where a capture flow currently is.
///
/// Loading indicators are projections of this value (`is_busy`) rather than
/// separate flags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    ImageSelected,
    Compressing,
    Fingerprinting,
    LookupHit,
    LookupMiss,
    Analyzing,
    EntryCreated {
        entry_id: Uuid,
    },
    EntryReplayed {
        entry_id: Uuid,
    },
    Failed {
        reason: String,
    },
}

impl CaptureState {
    /// True while work is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            CaptureState::Compressing
                | CaptureState::Fingerprinting
                | CaptureState::LookupHit
                | CaptureState::LookupMiss
                | CaptureState::Analyzing
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CaptureState::EntryCreated { .. }
                | CaptureState::EntryReplayed { .. }
                | CaptureState::Failed { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::ImageSelected => "image_selected",
            CaptureState::Compressing => "compressing",
            CaptureState::Fingerprinting => "fingerprinting",
            CaptureState::LookupHit => "lookup_hit",
            CaptureState::LookupMiss => "lookup_miss",
            CaptureState::Analyzing => "analyzing",
            CaptureState::EntryCreated { .. } => "entry_created",
            CaptureState::EntryReplayed { .. } => "entry_replayed",
            CaptureState::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_and_terminal_are_disjoint() {
        let states = [
            CaptureState::Idle,
            CaptureState::ImageSelected,
            CaptureState::Compressing,
            CaptureState::Fingerprinting,
            CaptureState::LookupHit,
            CaptureState::LookupMiss,
            CaptureState::Analyzing,
            CaptureState::EntryCreated {
                entry_id: Uuid::nil(),
            },
            CaptureState::EntryReplayed {
                entry_id: Uuid::nil(),
            },
            CaptureState::Failed {
                reason: "boom".to_string(),
            },
        ];

        for state in &states {
            assert!(!(state.is_busy() && state.is_terminal()), "{state}");
        }
        assert!(!CaptureState::Idle.is_busy());
        assert!(CaptureState::Analyzing.is_busy());
    }
}
