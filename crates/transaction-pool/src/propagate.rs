use ember_primitives::PeerId;

/// How a new transaction is spread across the peers that have not seen it:
/// full bodies to a square-root sized subset, hash announcements to the rest.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropagateTargets {
    /// Peers that receive the full transaction.
    pub full: Vec<PeerId>,
    /// Peers that receive only the hash announcement.
    pub announce: Vec<PeerId>,
}

impl PropagateTargets {
    /// Splits the unaware peers: the first `round(sqrt(n))` get full bodies.
    pub(crate) fn split(mut unaware: Vec<PeerId>) -> Self {
        let max_full = (unaware.len() as f64).sqrt().round() as usize;
        let announce = unaware.split_off(max_full.min(unaware.len()));
        Self { full: unaware, announce }
    }

    /// Whether there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.full.is_empty() && self.announce.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B512;

    #[test]
    fn small_sets_go_full() {
        let peers: Vec<PeerId> = (0..1u8).map(B512::repeat_byte).collect();
        let targets = PropagateTargets::split(peers);
        assert_eq!(targets.full.len(), 1);
        assert!(targets.announce.is_empty());
    }

    #[test]
    fn sqrt_split_rounds() {
        let peers: Vec<PeerId> = (0..100u8).map(B512::repeat_byte).collect();
        let targets = PropagateTargets::split(peers);
        assert_eq!(targets.full.len(), 10);
        assert_eq!(targets.announce.len(), 90);
    }

    #[test]
    fn empty_set_is_empty() {
        assert!(PropagateTargets::split(Vec::new()).is_empty());
    }
}
