//! The event-driven election coordinator.

use crate::domain::{token_step, ElectionState, Participation, PriceBand, TokenAction};
use crate::ports::{Dispatcher, PeerCourier, RingView};
use dashmap::DashMap;
use parking_lot::Mutex;
use shared_types::{epoch_millis, Bid, ElectionToken, EnergyRequest, WinnerAnnouncement};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Coordinates every in-flight election of one plant.
///
/// One [`ElectionState`] per request id, created on first exposure to the
/// request (intake or token arrival) and removed by a scheduled cleanup a
/// while after completion so re-deliveries stay inert. The map is sharded;
/// each state has its own mutex. Decisions are taken under the state lock
/// and the resulting RPC side effects run after it is released, so no lock
/// is ever held across an outbound call.
pub struct ElectionManager {
    self_id: u64,
    prices: PriceBand,
    cleanup_delay: Duration,
    /// Shared with the cleanup tasks, which outlive any one call.
    states: Arc<DashMap<String, Arc<Mutex<ElectionState>>>>,
    ring: Arc<dyn RingView>,
    dispatch: Arc<dyn Dispatcher>,
    courier: Arc<dyn PeerCourier>,
}

enum IntakeAction {
    Ignore,
    Queue,
    Initiate(ElectionToken),
}

enum TokenOutcome {
    Drop,
    Forward,
    Launch(ElectionToken),
}

impl ElectionManager {
    pub fn new(
        ring: Arc<dyn RingView>,
        dispatch: Arc<dyn Dispatcher>,
        courier: Arc<dyn PeerCourier>,
        prices: PriceBand,
        cleanup_delay: Duration,
    ) -> Arc<Self> {
        let self_id = ring.self_info().plant_id;
        Arc::new(Self {
            self_id,
            prices,
            cleanup_delay,
            states: Arc::new(DashMap::new()),
            ring,
            dispatch,
            courier,
        })
    }

    #[must_use]
    pub fn self_id(&self) -> u64 {
        self.self_id
    }

    /// Whether election state is currently tracked for a request.
    #[must_use]
    pub fn has_state(&self, request_id: &str) -> bool {
        self.states.contains_key(request_id)
    }

    /// A request arrived from intake (or came back off the pending queue).
    ///
    /// Idle plants bid and put a token in circulation; busy plants record a
    /// passive state and queue the request for after production. Re-delivery
    /// of a request we already participate in is inert.
    pub async fn on_energy_request(&self, request: EnergyRequest) {
        let state = self.state_for(&request);

        let action = {
            let mut guard = state.lock();
            if guard.winner_announced() {
                IntakeAction::Ignore
            } else if guard.participation == Participation::Participant {
                IntakeAction::Ignore
            } else if self.dispatch.is_busy() {
                // Sampled under the state lock, at the instant the bid
                // decision commits: a plant that went busy after this
                // request arrived stays passive.
                IntakeAction::Queue
            } else {
                let bid = Bid::new(self.self_id, self.prices.sample());
                guard.become_participant(bid);
                IntakeAction::Initiate(ElectionToken {
                    initiator_id: self.self_id,
                    request_id: guard.request.request_id.clone(),
                    best_bid: bid,
                    energy_amount_kwh: guard.request.amount_kwh,
                })
            }
        };

        match action {
            IntakeAction::Ignore => {
                debug!(
                    plant_id = self.self_id,
                    request_id = %request.request_id,
                    "Request re-delivered, already handled"
                );
            }
            IntakeAction::Queue => {
                debug!(
                    plant_id = self.self_id,
                    request_id = %request.request_id,
                    "Busy at intake, staying passive"
                );
                self.dispatch.enqueue(request);
            }
            IntakeAction::Initiate(token) => self.launch_token(state, token).await,
        }
    }

    /// An election token arrived from a peer.
    pub async fn on_token(&self, token: ElectionToken) {
        if token.initiator_id == self.self_id {
            self.on_own_token_returned(token).await;
            return;
        }

        // A busy plant never bids; the token passes through unchanged and
        // no local state is created for it.
        if self.dispatch.is_busy() {
            debug!(
                plant_id = self.self_id,
                request_id = %token.request_id,
                "Busy, forwarding token unchanged"
            );
            self.forward(token).await;
            return;
        }

        // A plant that never saw the request through intake reconstructs it
        // from the token.
        let request = EnergyRequest::new(
            token.request_id.clone(),
            token.energy_amount_kwh,
            epoch_millis(),
        );
        let state = self.state_for(&request);

        let outcome = {
            let mut guard = state.lock();
            if guard.winner_announced() {
                TokenOutcome::Drop
            } else if self.dispatch.is_busy() {
                // Went busy between the early check and this commit point;
                // the token passes through without a bid.
                TokenOutcome::Forward
            } else {
                let role_before = guard.participation;
                if role_before == Participation::Passive {
                    let bid = Bid::new(self.self_id, self.prices.sample());
                    guard.become_participant(bid);
                }
                match token_step(role_before, guard.my_bid, token.best_bid) {
                    TokenAction::Forward => {
                        guard.observe(token.best_bid);
                        TokenOutcome::Forward
                    }
                    TokenAction::Discard => TokenOutcome::Drop,
                    TokenAction::Initiate => TokenOutcome::Launch(ElectionToken {
                        initiator_id: self.self_id,
                        request_id: token.request_id.clone(),
                        best_bid: guard.my_bid,
                        energy_amount_kwh: token.energy_amount_kwh,
                    }),
                }
            }
        };

        match outcome {
            TokenOutcome::Drop => {
                debug!(
                    plant_id = self.self_id,
                    request_id = %token.request_id,
                    initiator = token.initiator_id,
                    "Token discarded"
                );
            }
            TokenOutcome::Forward => self.forward(token).await,
            TokenOutcome::Launch(own) => {
                debug!(
                    plant_id = self.self_id,
                    request_id = %own.request_id,
                    price = own.best_bid.price,
                    "Outbidding circulating token with a fresh election"
                );
                self.launch_token(state, own).await;
            }
        }
    }

    /// A winner announcement arrived from a peer.
    pub async fn on_winner_announcement(&self, announcement: WinnerAnnouncement) {
        if announcement.initiator_id == self.self_id {
            debug!(
                plant_id = self.self_id,
                request_id = %announcement.request_id,
                "Winner announcement completed its circulation"
            );
            return;
        }

        // Take the existing state or plant a settled tombstone in one
        // atomic map operation. A separate absence probe would leave a
        // window where a racing intake or token arrival inserts a live
        // passive state that this handler then mistakes for its tombstone.
        let mut planted = false;
        let state = {
            let entry = self
                .states
                .entry(announcement.request_id.clone())
                .or_insert_with(|| {
                    planted = true;
                    Arc::new(Mutex::new(ElectionState::settled(EnergyRequest::new(
                        announcement.request_id.clone(),
                        0,
                        epoch_millis(),
                    ))))
                });
            Arc::clone(entry.value())
        };

        if planted {
            // Never exposed to the request, but a queued copy could still
            // exist from an earlier life of the queue; drop it. The
            // tombstone keeps a late intake of the same request from
            // restarting an election that already has a winner.
            self.dispatch.remove_by_id(&announcement.request_id);
            self.schedule_cleanup(announcement.request_id.clone());
            self.circulate(announcement).await;
            return;
        }

        let latched_now = {
            let mut guard = state.lock();
            if guard.try_latch_winner() {
                Some(guard.request.clone())
            } else {
                None
            }
        };
        match latched_now {
            Some(request) => {
                if announcement.winning_plant_id == self.self_id {
                    info!(
                        plant_id = self.self_id,
                        request_id = %announcement.request_id,
                        price = announcement.winning_price,
                        "Announced as winner, fulfilling"
                    );
                    self.dispatch.fulfill(request, announcement.winning_price);
                } else {
                    debug!(
                        plant_id = self.self_id,
                        request_id = %announcement.request_id,
                        winner = announcement.winning_plant_id,
                        "Election lost, dropping any queued copy"
                    );
                    self.dispatch.remove_by_id(&announcement.request_id);
                }
                self.schedule_cleanup(announcement.request_id.clone());
            }
            // Already latched: this is a re-delivery. Each plant forwards a
            // given announcement at most once, otherwise a circulation whose
            // initiator vanished would orbit the ring forever.
            None => {
                debug!(
                    plant_id = self.self_id,
                    request_id = %announcement.request_id,
                    "Duplicate winner announcement, dropping"
                );
                return;
            }
        }

        self.circulate(announcement).await;
    }

    async fn on_own_token_returned(&self, token: ElectionToken) {
        let Some(state) = self
            .states
            .get(&token.request_id)
            .map(|entry| Arc::clone(entry.value()))
        else {
            debug!(
                plant_id = self.self_id,
                request_id = %token.request_id,
                "Own token returned for an unknown election, dropping"
            );
            return;
        };
        self.complete_circulation(state, token.best_bid).await;
    }

    /// Put our token in circulation, or complete on the spot when the ring
    /// has no other member.
    async fn launch_token(&self, state: Arc<Mutex<ElectionState>>, token: ElectionToken) {
        let next = self.ring.next_in_ring(self.self_id);
        if next.plant_id == self.self_id {
            info!(
                plant_id = self.self_id,
                request_id = %token.request_id,
                "Single-member ring, completing election locally"
            );
            self.complete_circulation(state, token.best_bid).await;
            return;
        }
        info!(
            plant_id = self.self_id,
            request_id = %token.request_id,
            price = token.best_bid.price,
            to = next.plant_id,
            "Election started"
        );
        if let Err(error) = self.courier.forward_token(&next, token).await {
            // The peer stays in the directory: membership refreshes and later
            // elections take the updated ring.
            warn!(
                plant_id = self.self_id,
                %error,
                "Token launch failed, election may be lost this round"
            );
        }
    }

    /// The token survived a full traversal: latch, fulfill if we won, and
    /// start the winner announcement around the ring.
    async fn complete_circulation(&self, state: Arc<Mutex<ElectionState>>, winning: Bid) {
        let request = {
            let mut guard = state.lock();
            if !guard.try_latch_winner() {
                return;
            }
            guard.observe(winning);
            guard.request.clone()
        };
        let request_id = request.request_id.clone();

        if winning.plant_id == self.self_id {
            info!(
                plant_id = self.self_id,
                request_id = %request_id,
                price = winning.price,
                "Election won, fulfilling"
            );
            self.dispatch.fulfill(request, winning.price);
        } else {
            info!(
                plant_id = self.self_id,
                request_id = %request_id,
                winner = winning.plant_id,
                "Election completed"
            );
        }

        self.circulate(WinnerAnnouncement {
            request_id: request_id.clone(),
            winning_plant_id: winning.plant_id,
            winning_price: winning.price,
            initiator_id: self.self_id,
        })
        .await;
        self.schedule_cleanup(request_id);
    }

    /// Forward a foreign token to our successor. Failure keeps the peer.
    async fn forward(&self, token: ElectionToken) {
        let next = self.ring.next_in_ring(self.self_id);
        if next.plant_id == self.self_id {
            warn!(
                plant_id = self.self_id,
                request_id = %token.request_id,
                "Ring collapsed to self, dropping foreign token"
            );
            return;
        }
        if let Err(error) = self.courier.forward_token(&next, token).await {
            warn!(
                plant_id = self.self_id,
                %error,
                "Token forward failed, keeping peer"
            );
        }
    }

    /// Send an announcement to the successor, evicting unreachable peers and
    /// retrying until a delivery lands or the ring collapses to self.
    async fn circulate(&self, announcement: WinnerAnnouncement) {
        loop {
            let next = self.ring.next_in_ring(self.self_id);
            if next.plant_id == self.self_id {
                debug!(
                    plant_id = self.self_id,
                    request_id = %announcement.request_id,
                    "No peers left, winner announcement stops here"
                );
                return;
            }
            match self.courier.announce_winner(&next, announcement.clone()).await {
                Ok(()) => return,
                Err(error) => {
                    warn!(
                        plant_id = self.self_id,
                        peer = next.plant_id,
                        %error,
                        "Peer unreachable during winner circulation, evicting"
                    );
                    self.ring.evict(next.plant_id);
                }
            }
        }
    }

    fn state_for(&self, request: &EnergyRequest) -> Arc<Mutex<ElectionState>> {
        Arc::clone(
            self.states
                .entry(request.request_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(ElectionState::passive(request.clone()))))
                .value(),
        )
    }

    /// Completed elections linger a while to absorb in-flight duplicates.
    fn schedule_cleanup(&self, request_id: String) {
        let states = Arc::clone(&self.states);
        let delay = self.cleanup_delay;
        let plant_id = self.self_id;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if states.remove(&request_id).is_some() {
                debug!(
                    plant_id,
                    request_id = %request_id,
                    "Election state cleaned up"
                );
            }
        });
    }
}
