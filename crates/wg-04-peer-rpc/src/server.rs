//! gRPC service implementation for the plant peer surface.
//!
//! Handlers validate, convert and enqueue; the runtime's event pump does
//! the actual registry and election work. A handler that cannot accept a
//! payload answers `Ack { success: false }` - the RPC boundary never
//! surfaces an unhandled failure to the caller.

use crate::proto::plant_peer_server::{PlantPeer, PlantPeerServer};
use crate::proto::{Ack, ElectionTokenMsg, PlantInfoMsg, WinnerAnnouncementMsg};
use shared_types::{ElectionToken, PlantInfo, WinnerAnnouncement};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status};
use tracing::{debug, error, info, warn};

/// Inbound peer traffic, decoded and validated, ready for the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    PresenceAnnounced(PlantInfo),
    TokenReceived(ElectionToken),
    WinnerReceived(WinnerAnnouncement),
}

/// The service implementation handed to tonic.
pub struct PeerServer {
    events: mpsc::UnboundedSender<PeerEvent>,
}

impl PeerServer {
    /// Create the service plus the receiving side of its event channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PeerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { events }, rx)
    }

    /// Ack immediately; processing happens on the runtime's pump.
    fn accept(&self, event: PeerEvent) -> Response<Ack> {
        if self.events.send(event).is_err() {
            warn!("Peer event dropped, runtime is shutting down");
            return Response::new(Ack {
                success: false,
                message: "plant shutting down".into(),
            });
        }
        Response::new(Ack {
            success: true,
            message: "ok".into(),
        })
    }

    fn reject(reason: String) -> Response<Ack> {
        debug!(reason = %reason, "Rejected peer payload");
        Response::new(Ack {
            success: false,
            message: reason,
        })
    }
}

#[tonic::async_trait]
impl PlantPeer for PeerServer {
    async fn announce_presence(
        &self,
        request: Request<PlantInfoMsg>,
    ) -> Result<Response<Ack>, Status> {
        Ok(match PlantInfo::try_from(request.into_inner()) {
            Ok(info) => self.accept(PeerEvent::PresenceAnnounced(info)),
            Err(e) => Self::reject(e.to_string()),
        })
    }

    async fn forward_election_token(
        &self,
        request: Request<ElectionTokenMsg>,
    ) -> Result<Response<Ack>, Status> {
        Ok(match ElectionToken::try_from(request.into_inner()) {
            Ok(token) => self.accept(PeerEvent::TokenReceived(token)),
            Err(e) => Self::reject(e.to_string()),
        })
    }

    async fn announce_energy_winner(
        &self,
        request: Request<WinnerAnnouncementMsg>,
    ) -> Result<Response<Ack>, Status> {
        Ok(match WinnerAnnouncement::try_from(request.into_inner()) {
            Ok(announcement) => self.accept(PeerEvent::WinnerReceived(announcement)),
            Err(e) => Self::reject(e.to_string()),
        })
    }
}

/// Running server; dropping the handle leaves the task detached, so call
/// [`PeerServerHandle::shutdown`] for an orderly stop.
pub struct PeerServerHandle {
    shutdown: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl PeerServerHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.join.await;
    }
}

/// Bind and serve the peer surface on `port`.
///
/// Binding is performed eagerly so an occupied port is reported as the
/// distinct [`PeerRpcError::PortInUse`] before anything else starts.
pub async fn spawn_server(
    port: u16,
    server: PeerServer,
) -> Result<PeerServerHandle, crate::client::PeerRpcError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::AddrInUse {
            crate::client::PeerRpcError::PortInUse { port }
        } else {
            crate::client::PeerRpcError::Bind(e)
        }
    })?;
    info!(%addr, "Peer RPC server listening");

    let (shutdown, rx) = oneshot::channel::<()>();
    let incoming = TcpListenerStream::new(listener);
    let join = tokio::spawn(async move {
        let result = tonic::transport::Server::builder()
            .add_service(PlantPeerServer::new(server))
            .serve_with_incoming_shutdown(incoming, async {
                let _ = rx.await;
            })
            .await;
        if let Err(e) = result {
            error!(error = %e, "Peer RPC server terminated abnormally");
        }
    });

    Ok(PeerServerHandle { shutdown, join })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Bid;

    #[tokio::test]
    async fn test_presence_is_acked_and_dispatched() {
        let (server, mut events) = PeerServer::channel();
        let msg = PlantInfoMsg::from(PlantInfo::new(2, "localhost", 4002, 20));

        let ack = server
            .announce_presence(Request::new(msg))
            .await
            .unwrap()
            .into_inner();

        assert!(ack.success);
        assert_eq!(
            events.recv().await.unwrap(),
            PeerEvent::PresenceAnnounced(PlantInfo::new(2, "localhost", 4002, 20)),
        );
    }

    #[tokio::test]
    async fn test_malformed_presence_is_nacked_not_errored() {
        let (server, mut events) = PeerServer::channel();
        let msg = PlantInfoMsg {
            plant_id: 0,
            address: "".into(),
            port: 4002,
            registration_time: 0,
        };

        let ack = server
            .announce_presence(Request::new(msg))
            .await
            .unwrap()
            .into_inner();

        assert!(!ack.success);
        assert!(!ack.message.is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_token_is_dispatched_with_bid() {
        let (server, mut events) = PeerServer::channel();
        let token = ElectionToken {
            initiator_id: 1,
            request_id: "R1".into(),
            best_bid: Bid::new(1, 0.5),
            energy_amount_kwh: 100,
        };

        let ack = server
            .forward_election_token(Request::new(token.clone().into()))
            .await
            .unwrap()
            .into_inner();

        assert!(ack.success);
        assert_eq!(events.recv().await.unwrap(), PeerEvent::TokenReceived(token));
    }

    #[tokio::test]
    async fn test_winner_announcement_is_dispatched() {
        let (server, mut events) = PeerServer::channel();
        let announcement = WinnerAnnouncement {
            request_id: "R1".into(),
            winning_plant_id: 2,
            winning_price: 0.3,
            initiator_id: 1,
        };

        let ack = server
            .announce_energy_winner(Request::new(announcement.clone().into()))
            .await
            .unwrap()
            .into_inner();

        assert!(ack.success);
        assert_eq!(
            events.recv().await.unwrap(),
            PeerEvent::WinnerReceived(announcement),
        );
    }

    #[tokio::test]
    async fn test_closed_runtime_answers_failure_ack() {
        let (server, events) = PeerServer::channel();
        drop(events);

        let ack = server
            .announce_presence(Request::new(PlantInfoMsg::from(PlantInfo::new(
                2,
                "localhost",
                4002,
                20,
            ))))
            .await
            .unwrap()
            .into_inner();

        assert!(!ack.success);
    }
}
