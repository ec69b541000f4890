//! Outbound peer calls with per-peer cached channels.

use crate::proto::plant_peer_client::PlantPeerClient;
use crate::proto::{Ack, ElectionTokenMsg, PlantInfoMsg, WinnerAnnouncementMsg};
use parking_lot::Mutex;
use shared_types::{ElectionToken, PlantInfo, WinnerAnnouncement};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, warn};

/// Failures on the peer RPC surface.
#[derive(Debug, Error)]
pub enum PeerRpcError {
    /// The configured peer port is already taken by another process.
    #[error("peer RPC port {port} already in use")]
    PortInUse { port: u16 },

    /// Any other bind failure.
    #[error("peer RPC server bind failed: {0}")]
    Bind(#[from] std::io::Error),

    /// The peer endpoint could not be connected.
    #[error("peer {plant_id} unreachable: {source}")]
    Unreachable {
        plant_id: u64,
        #[source]
        source: tonic::transport::Error,
    },

    /// The call itself failed after a connection existed.
    #[error("call to peer {plant_id} failed: {status}")]
    Call {
        plant_id: u64,
        status: tonic::Status,
    },

    /// The peer answered but refused the payload.
    #[error("peer {plant_id} rejected the call: {message}")]
    Rejected { plant_id: u64, message: String },
}

/// One long-lived channel per peer, keyed by plant id, created lazily.
///
/// Every call carries the configured deadline. On any failure the cached
/// channel is dropped so the next call redials; whether the peer is also
/// evicted from the registry is the caller's policy, not this layer's.
pub struct PeerClient {
    deadline: Duration,
    channels: Mutex<HashMap<u64, PlantPeerClient<Channel>>>,
}

impl PeerClient {
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub async fn announce_presence(
        &self,
        to: &PlantInfo,
        me: PlantInfo,
    ) -> Result<(), PeerRpcError> {
        let mut client = self.client_for(to).await?;
        let result = client
            .announce_presence(PlantInfoMsg::from(me))
            .await
            .map(tonic::Response::into_inner);
        self.finish(to.plant_id, result)
    }

    pub async fn forward_token(
        &self,
        to: &PlantInfo,
        token: ElectionToken,
    ) -> Result<(), PeerRpcError> {
        let mut client = self.client_for(to).await?;
        let result = client
            .forward_election_token(ElectionTokenMsg::from(token))
            .await
            .map(tonic::Response::into_inner);
        self.finish(to.plant_id, result)
    }

    pub async fn announce_winner(
        &self,
        to: &PlantInfo,
        announcement: WinnerAnnouncement,
    ) -> Result<(), PeerRpcError> {
        let mut client = self.client_for(to).await?;
        let result = client
            .announce_energy_winner(WinnerAnnouncementMsg::from(announcement))
            .await
            .map(tonic::Response::into_inner);
        self.finish(to.plant_id, result)
    }

    /// Drop the cached channel for a peer (evicted or restarted).
    pub fn forget(&self, plant_id: u64) {
        self.channels.lock().remove(&plant_id);
    }

    /// Drop every cached channel; part of orderly shutdown.
    pub fn close_all(&self) {
        self.channels.lock().clear();
    }

    async fn client_for(&self, peer: &PlantInfo) -> Result<PlantPeerClient<Channel>, PeerRpcError> {
        if let Some(client) = self.channels.lock().get(&peer.plant_id) {
            return Ok(client.clone());
        }
        debug!(peer = peer.plant_id, endpoint = %peer.endpoint(), "Dialing peer");
        let endpoint = Endpoint::from_shared(peer.endpoint())
            .map_err(|source| PeerRpcError::Unreachable {
                plant_id: peer.plant_id,
                source,
            })?
            .connect_timeout(self.deadline)
            .timeout(self.deadline);
        let channel = endpoint
            .connect()
            .await
            .map_err(|source| PeerRpcError::Unreachable {
                plant_id: peer.plant_id,
                source,
            })?;
        let client = PlantPeerClient::new(channel);
        self.channels.lock().insert(peer.plant_id, client.clone());
        Ok(client)
    }

    fn finish(&self, plant_id: u64, result: Result<Ack, tonic::Status>) -> Result<(), PeerRpcError> {
        match result {
            Ok(ack) if ack.success => Ok(()),
            Ok(ack) => {
                warn!(peer = plant_id, message = %ack.message, "Peer refused the call");
                self.forget(plant_id);
                Err(PeerRpcError::Rejected {
                    plant_id,
                    message: ack.message,
                })
            }
            Err(status) => {
                self.forget(plant_id);
                Err(PeerRpcError::Call { plant_id, status })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dial_failure_is_typed_unreachable() {
        // Nothing listens on this port; connect_timeout keeps the test fast.
        let client = PeerClient::new(Duration::from_millis(200));
        let ghost = PlantInfo::new(9, "127.0.0.1", 1, 0);

        let err = client
            .forward_token(
                &ghost,
                ElectionToken {
                    initiator_id: 1,
                    request_id: "R1".into(),
                    best_bid: shared_types::Bid::new(1, 0.5),
                    energy_amount_kwh: 10,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PeerRpcError::Unreachable { plant_id: 9, .. }));
    }

    #[tokio::test]
    async fn test_failed_calls_do_not_cache_channels() {
        let client = PeerClient::new(Duration::from_millis(200));
        let ghost = PlantInfo::new(9, "127.0.0.1", 1, 0);

        let _ = client.announce_presence(&ghost, PlantInfo::new(1, "localhost", 4001, 0)).await;
        assert!(client.channels.lock().is_empty());
    }
}
