//! Coordinator-peer ("queen") selection with round-robin failover.
//!
//! Holds an immutable bootstrap set and a mutable active set, following the
//! source's `sync.RWMutex`-guarded round-robin manager. Both `handle_queen_message`
//! and `get_queen` take the write lock: the critical sections are synchronous
//! and never held across an `.await`, so promoting the read path to a write
//! lock costs nothing and keeps the implementation simple.

use libp2p_identity::PeerId;
use multiaddr::{Multiaddr, Protocol};
use rand::Rng;
use std::sync::RwLock;

pub struct QueenManager {
    bootstrap: Vec<Multiaddr>,
    state: RwLock<QueenState>,
}

struct QueenState {
    active: Vec<Multiaddr>,
    cursor: usize,
}

impl QueenManager {
    pub fn new(bootstrap: Vec<Multiaddr>) -> Self {
        Self {
            bootstrap,
            state: RwLock::new(QueenState {
                active: Vec::new(),
                cursor: 0,
            }),
        }
    }

    /// Replaces the active set atomically. The round-robin cursor is left
    /// untouched, so a replacement mid-cycle does not restart the rotation
    /// from the first entry of the new set.
    pub fn handle_queen_message(&self, queens: Vec<Multiaddr>) {
        let mut state = self.state.write().expect("lock poisoned");
        state.active = queens;
    }

    /// Advances the round-robin cursor and returns the next active queen's
    /// peer id; if the active set is empty, draws uniformly at random from
    /// `bootstrap`. Returns `None` if the chosen address carries no `/p2p/`
    /// component.
    pub fn get_queen(&self) -> Option<PeerId> {
        let mut state = self.state.write().expect("lock poisoned");
        if state.active.is_empty() {
            if self.bootstrap.is_empty() {
                return None;
            }
            let idx = rand::rng().random_range(0..self.bootstrap.len());
            return peer_id_of(&self.bootstrap[idx]);
        }
        let idx = state.cursor % state.active.len();
        state.cursor = state.cursor.wrapping_add(1);
        peer_id_of(&state.active[idx])
    }
}

fn peer_id_of(addr: &Multiaddr) -> Option<PeerId> {
    addr.iter().find_map(|p| match p {
        Protocol::P2p(hash) => PeerId::try_from(hash).ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::str::FromStr;

    fn addr_with_peer() -> (Multiaddr, PeerId) {
        let peer_id = libp2p_identity::Keypair::generate_secp256k1()
            .public()
            .to_peer_id();
        let addr = Multiaddr::from_str(&format!("/ip4/127.0.0.1/tcp/4001/p2p/{peer_id}")).unwrap();
        (addr, peer_id)
    }

    #[test]
    fn round_robins_through_active_set() {
        let qm = QueenManager::new(vec![]);
        let entries: Vec<(Multiaddr, PeerId)> = (0..3).map(|_| addr_with_peer()).collect();
        qm.handle_queen_message(entries.iter().map(|(addr, _)| addr.clone()).collect());
        let picks: Vec<PeerId> = (0..3).map(|_| qm.get_queen().unwrap()).collect();
        let unique: HashSet<_> = picks.iter().cloned().collect();
        assert_eq!(unique.len(), 3);
        let expected: HashSet<PeerId> = entries.iter().map(|(_, peer_id)| *peer_id).collect();
        assert_eq!(unique, expected);
    }

    #[test]
    fn cursor_is_not_reset_when_active_set_is_replaced() {
        let qm = QueenManager::new(vec![]);
        let first_entries: Vec<(Multiaddr, PeerId)> = (0..2).map(|_| addr_with_peer()).collect();
        qm.handle_queen_message(first_entries.iter().map(|(addr, _)| addr.clone()).collect());
        // advance the cursor to index 1 of the first set
        qm.get_queen().unwrap();

        let second_entries: Vec<(Multiaddr, PeerId)> = (0..2).map(|_| addr_with_peer()).collect();
        qm.handle_queen_message(second_entries.iter().map(|(addr, _)| addr.clone()).collect());
        let pick = qm.get_queen().unwrap();
        assert_eq!(pick, second_entries[1].1);
    }

    #[test]
    fn falls_back_to_bootstrap_when_active_is_empty() {
        let (addr0, peer0) = addr_with_peer();
        let (addr1, peer1) = addr_with_peer();
        let qm = QueenManager::new(vec![addr0, addr1]);
        let pick = qm.get_queen().unwrap();
        assert!(pick == peer0 || pick == peer1);
    }

    #[test]
    fn no_queens_at_all_returns_none() {
        let qm = QueenManager::new(vec![]);
        assert!(qm.get_queen().is_none());
    }
}
