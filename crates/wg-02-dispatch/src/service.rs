//! Busy/idle state machine, pending queue and production simulation.

use parking_lot::Mutex;
use shared_types::EnergyRequest;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Receiving side of the "next up" handoff: after each production run the
/// dequeued head, if any, arrives here for a fresh election.
pub type NextUpReceiver = mpsc::UnboundedReceiver<EnergyRequest>;

#[derive(Default)]
struct BusyState {
    busy: bool,
    current_request_id: Option<String>,
}

/// State shared with the production task, which outlives any one call.
struct Inner {
    plant_id: u64,
    busy: Mutex<BusyState>,
    queue: Mutex<VecDeque<EnergyRequest>>,
    next_up: mpsc::UnboundedSender<EnergyRequest>,
}

impl Inner {
    /// Completion path: always flips busy to idle, then hands the next
    /// pending request to the election layer.
    fn complete(&self, request_id: &str) {
        {
            let mut busy = self.busy.lock();
            busy.busy = false;
            busy.current_request_id = None;
        }
        info!(plant_id = self.plant_id, request_id, "Production completed");

        let next = self.queue.lock().pop_front();
        if let Some(next) = next {
            debug!(
                plant_id = self.plant_id,
                request_id = %next.request_id,
                "Dequeued pending request for a new election"
            );
            if self.next_up.send(next).is_err() {
                warn!(
                    plant_id = self.plant_id,
                    "Election layer gone, dropping dequeued request"
                );
            }
        }
    }
}

/// The plant's production unit.
///
/// State machine: `Idle -> Busy` only via [`DispatchService::fulfill`],
/// `Busy -> Idle` only when the production task completes. The busy latch
/// and the pending queue are guarded separately; `fulfill` is the only path
/// that touches both.
pub struct DispatchService {
    /// Milliseconds of simulated production per requested kWh.
    millis_per_kwh: u64,
    inner: Arc<Inner>,
}

impl DispatchService {
    /// Create the service plus the receiver for post-production handoffs.
    pub fn new(plant_id: u64, millis_per_kwh: u64) -> (Arc<Self>, NextUpReceiver) {
        let (next_up, rx) = mpsc::unbounded_channel();
        let service = Arc::new(Self {
            millis_per_kwh,
            inner: Arc::new(Inner {
                plant_id,
                busy: Mutex::new(BusyState::default()),
                queue: Mutex::new(VecDeque::new()),
                next_up,
            }),
        });
        (service, rx)
    }

    /// Whether a production run is active right now.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.busy.lock().busy
    }

    /// Id of the request currently in production, if any.
    #[must_use]
    pub fn current_request_id(&self) -> Option<String> {
        self.inner.busy.lock().current_request_id.clone()
    }

    /// Append to the pending queue unless the id is already queued.
    pub fn enqueue(&self, request: EnergyRequest) -> bool {
        let mut queue = self.inner.queue.lock();
        if queue.iter().any(|r| r.request_id == request.request_id) {
            debug!(
                plant_id = self.inner.plant_id,
                request_id = %request.request_id,
                "Request already queued, ignoring duplicate"
            );
            return false;
        }
        debug!(
            plant_id = self.inner.plant_id,
            request_id = %request.request_id,
            queued = queue.len() + 1,
            "Request queued while busy"
        );
        queue.push_back(request);
        true
    }

    /// Drop a queued request whose election was won elsewhere.
    pub fn remove_by_id(&self, request_id: &str) -> bool {
        let mut queue = self.inner.queue.lock();
        let before = queue.len();
        queue.retain(|r| r.request_id != request_id);
        before != queue.len()
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Start producing for a won request.
    ///
    /// Atomically transitions idle to busy; a plant that is already producing
    /// logs and drops the call. A queued copy of the same request is removed
    /// so it cannot be re-elected later. Production runs
    /// `amount_kwh x millis_per_kwh` milliseconds on a spawned task, then the
    /// completion path flips the plant back to idle and hands the queue head,
    /// if any, to the "next up" channel.
    pub fn fulfill(&self, request: EnergyRequest, price: f64) -> bool {
        {
            let mut busy = self.inner.busy.lock();
            if busy.busy {
                warn!(
                    plant_id = self.inner.plant_id,
                    request_id = %request.request_id,
                    current = busy.current_request_id.as_deref().unwrap_or("?"),
                    "Fulfill requested while already producing, dropping"
                );
                return false;
            }
            busy.busy = true;
            busy.current_request_id = Some(request.request_id.clone());
        }
        self.remove_by_id(&request.request_id);

        info!(
            plant_id = self.inner.plant_id,
            request_id = %request.request_id,
            amount_kwh = request.amount_kwh,
            price,
            "Production started"
        );

        let inner = Arc::clone(&self.inner);
        let duration = Duration::from_millis(request.amount_kwh * self.millis_per_kwh);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            inner.complete(&request.request_id);
        });
        true
    }
}
