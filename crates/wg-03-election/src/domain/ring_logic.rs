//! The pure token-step decision.
//!
//! Separated from the manager so the election contract can be tested
//! without ports, locks or I/O.

use super::Participation;
use shared_types::Bid;

/// What to do with an incoming foreign token, decided per Chang-Roberts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAction {
    /// Pass the token to the successor unchanged.
    Forward,
    /// Drop the token: our own stronger token is already circulating.
    Discard,
    /// Drop the token and put a fresh token with our bid in circulation
    /// (the late-joiner path).
    Initiate,
}

/// Decide how an idle plant handles a token it did not initiate.
///
/// `participation` is the plant's role *before* this token arrived; the
/// caller promotes a passive plant to participant regardless of the
/// outcome. A participant that beats the token discards it because its own
/// stronger token is already traversing the ring; a passive plant that
/// beats the token has no token in flight yet, so it must start one.
#[must_use]
pub fn token_step(participation: Participation, my_bid: Bid, token_best: Bid) -> TokenAction {
    let stronger = my_bid.beats(&token_best);
    match participation {
        Participation::Participant if stronger => TokenAction::Discard,
        Participation::Passive if stronger => TokenAction::Initiate,
        _ => TokenAction::Forward,
    }
}
