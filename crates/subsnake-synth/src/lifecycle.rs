//! Voice status machine.
//!
//! A voice is always in exactly one of three states and every change of
//! state goes through [`transition`]. The returned [`PoolAction`] tells the
//! engine how to update its free lists so the lists and the statuses cannot
//! drift apart.
//!
//! | Status    | Event   | New status | Pool action |
//! |-----------|---------|------------|-------------|
//! | Stopped   | Trigger | Active     | -           |
//! | Releasing | Trigger | Active     | Reclaim     |
//! | Active    | Trigger | Active     | -           |
//! | Active    | Release | Releasing  | QueueReleased |
//! | Active    | Silent  | Stopped    | Retire      |
//! | Releasing | Silent  | Stopped    | Retire      |
//! | otherwise |         | unchanged  | -           |

/// Where a voice is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceStatus {
    /// Silent and on the stopped list.
    #[default]
    Stopped,
    /// Gate closed, still sounding; on the released list.
    Releasing,
    /// Gate open.
    Active,
}

/// Something that happened to a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceEvent {
    /// A note was assigned to the voice.
    Trigger,
    /// Its note was released.
    Release,
    /// The amp envelope finished.
    Silent,
}

/// Free-list bookkeeping the engine must perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolAction {
    /// Nothing.
    None,
    /// Drop the voice from the released list; it is sounding again.
    Reclaim,
    /// Append the voice to the released list.
    QueueReleased,
    /// Unmap its note, drop it from the released list, append it to the
    /// stopped list.
    Retire,
}

const fn row(status: VoiceStatus) -> usize {
    match status {
        VoiceStatus::Stopped => 0,
        VoiceStatus::Releasing => 1,
        VoiceStatus::Active => 2,
    }
}

const fn column(event: VoiceEvent) -> usize {
    match event {
        VoiceEvent::Trigger => 0,
        VoiceEvent::Release => 1,
        VoiceEvent::Silent => 2,
    }
}

use PoolAction as P;
use VoiceStatus as S;

const TABLE: [[(VoiceStatus, PoolAction); 3]; 3] = [
    // Trigger                   Release                       Silent
    [(S::Active, P::None), (S::Stopped, P::None), (S::Stopped, P::None)],
    [(S::Active, P::Reclaim), (S::Releasing, P::None), (S::Stopped, P::Retire)],
    [(S::Active, P::None), (S::Releasing, P::QueueReleased), (S::Stopped, P::Retire)],
];

/// Next status and the bookkeeping it requires.
#[inline]
pub const fn transition(status: VoiceStatus, event: VoiceEvent) -> (VoiceStatus, PoolAction) {
    TABLE[row(status)][column(event)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_always_activates() {
        for s in [S::Stopped, S::Releasing, S::Active] {
            assert_eq!(transition(s, VoiceEvent::Trigger).0, S::Active);
        }
        assert_eq!(transition(S::Releasing, VoiceEvent::Trigger).1, P::Reclaim);
    }

    #[test]
    fn test_release_only_from_active() {
        assert_eq!(
            transition(S::Active, VoiceEvent::Release),
            (S::Releasing, P::QueueReleased)
        );
        assert_eq!(transition(S::Releasing, VoiceEvent::Release), (S::Releasing, P::None));
        assert_eq!(transition(S::Stopped, VoiceEvent::Release), (S::Stopped, P::None));
    }

    #[test]
    fn test_silent_retires_sounding_voices_once() {
        assert_eq!(transition(S::Active, VoiceEvent::Silent), (S::Stopped, P::Retire));
        assert_eq!(transition(S::Releasing, VoiceEvent::Silent), (S::Stopped, P::Retire));
        assert_eq!(transition(S::Stopped, VoiceEvent::Silent), (S::Stopped, P::None));
    }
}
