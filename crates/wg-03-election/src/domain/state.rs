//! Per-request election state.

use shared_types::{Bid, EnergyRequest};

/// Role of this plant in one election.
///
/// `Passive` means we have not put a token in circulation for the request,
/// either because we were busy when we learned about it or because we only
/// ever saw it through someone else's token. A passive plant can still be
/// promoted to `Participant` later (the late-joiner path).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participation {
    Passive,
    Participant,
}

/// Everything one plant tracks about one election, guarded by a per-state
/// mutex in the manager.
#[derive(Debug)]
pub struct ElectionState {
    pub request: EnergyRequest,
    /// Our bid; [`Bid::NONE`] while passive.
    pub my_bid: Bid,
    /// Best bid observed across all tokens that passed through this plant.
    pub best_seen: Bid,
    pub participation: Participation,
    winner_announced: bool,
}

impl ElectionState {
    /// State for a request we cannot bid on right now.
    pub fn passive(request: EnergyRequest) -> Self {
        Self {
            request,
            my_bid: Bid::NONE,
            best_seen: Bid::NONE,
            participation: Participation::Passive,
            winner_announced: false,
        }
    }

    /// State for a request we are bidding on from the start.
    pub fn participant(request: EnergyRequest, my_bid: Bid) -> Self {
        Self {
            request,
            best_seen: my_bid,
            my_bid,
            participation: Participation::Participant,
            winner_announced: false,
        }
    }

    /// Tombstone for an election we only learned about through its winner
    /// announcement: already latched, so straggling tokens and a late
    /// intake of the same request stay inert until cleanup.
    pub fn settled(request: EnergyRequest) -> Self {
        Self {
            request,
            my_bid: Bid::NONE,
            best_seen: Bid::NONE,
            participation: Participation::Passive,
            winner_announced: true,
        }
    }

    /// Promote a passive state to participant with a freshly drawn bid.
    /// Returns false (and changes nothing) when already a participant.
    pub fn become_participant(&mut self, bid: Bid) -> bool {
        if self.participation == Participation::Participant {
            return false;
        }
        self.participation = Participation::Participant;
        self.my_bid = bid;
        self.observe(bid);
        true
    }

    /// Record a bid carried by a traversing token.
    pub fn observe(&mut self, bid: Bid) {
        if bid.beats(&self.best_seen) {
            self.best_seen = bid;
        }
    }

    /// One-way winner latch. True exactly once per state.
    pub fn try_latch_winner(&mut self) -> bool {
        if self.winner_announced {
            false
        } else {
            self.winner_announced = true;
            true
        }
    }

    #[must_use]
    pub fn winner_announced(&self) -> bool {
        self.winner_announced
    }
}
