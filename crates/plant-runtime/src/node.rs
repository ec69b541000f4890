//! Plant lifecycle orchestration.

use crate::adapters::{DirectoryRing, DispatchPort, GrpcCourier};
use crate::admin_client::{AdminClient, AdminError};
use crate::config::PlantConfig;
use shared_types::{epoch_millis, EnergyRequest, PlantInfo};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use wg_01_plant_registry::PlantDirectory;
use wg_02_dispatch::{DispatchService, NextUpReceiver};
use wg_03_election::{ElectionManager, PriceBand};
use wg_04_peer_rpc::{
    spawn_server, PeerClient, PeerEvent, PeerRpcError, PeerServer, PeerServerHandle,
};
use wg_05_pollution::{PollutionConfig, PollutionPipeline};
use wg_06_market_broker::{
    spawn_request_intake, BrokerBatchSink, BrokerClient, BrokerConfig, BrokerError,
};

/// Startup failures, split so the operator prompt can decide what is
/// retryable (port, id) and what is fatal.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("peer RPC port {0} already in use")]
    PortInUse(u16),
    #[error("plant id {0} already registered")]
    IdConflict(u64),
    #[error("administration service unreachable: {0}")]
    AdminUnreachable(String),
    #[error("peer RPC server failed to start: {0}")]
    Rpc(String),
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// One running plant process.
pub struct PlantNode {
    plant_id: u64,
    server: PeerServerHandle,
    broker: Arc<BrokerClient>,
    pollution: PollutionPipeline,
    peer_client: Arc<PeerClient>,
    pumps: Vec<JoinHandle<()>>,
}

impl PlantNode {
    /// Run the full startup sequence for `plant_id` on `port`.
    pub async fn start(
        config: &PlantConfig,
        plant_id: u64,
        port: u16,
    ) -> Result<Self, StartupError> {
        // Bind the peer surface first: an occupied port must fail before we
        // touch the administration service.
        let (peer_server, peer_events) = PeerServer::channel();
        let server = spawn_server(port, peer_server).await.map_err(|e| match e {
            PeerRpcError::PortInUse { port } => StartupError::PortInUse(port),
            other => StartupError::Rpc(other.to_string()),
        })?;

        let me = PlantInfo::new(plant_id, config.plant.address.clone(), port, epoch_millis());

        let admin = AdminClient::new(&config.admin.server.base_url);
        let known = match admin.register(&me).await {
            Ok(known) => known,
            Err(error) => {
                server.shutdown().await;
                return Err(match error {
                    AdminError::Conflict(id) => StartupError::IdConflict(id),
                    other => StartupError::AdminUnreachable(other.to_string()),
                });
            }
        };

        let directory = Arc::new(PlantDirectory::new(me.clone()));
        directory.add_initial(known.clone());

        let (dispatch, next_up) =
            DispatchService::new(plant_id, config.timing.production_millis_per_kwh);
        let peer_client = Arc::new(PeerClient::new(config.rpc_deadline()));
        let manager = ElectionManager::new(
            Arc::new(DirectoryRing(Arc::clone(&directory))),
            Arc::new(DispatchPort(Arc::clone(&dispatch))),
            Arc::new(GrpcCourier(Arc::clone(&peer_client))),
            PriceBand::new(config.price.min, config.price.max),
            config.cleanup_delay(),
        );

        let broker = Arc::new(BrokerClient::connect(&BrokerConfig {
            url: config.mqtt.broker.url.clone(),
            client_id: format!("plant-{plant_id}"),
        })?);
        let (requests, intake_pump) =
            spawn_request_intake(&broker, &config.mqtt.topic.energy_requests).await?;

        let sink = Arc::new(BrokerBatchSink::new(
            Arc::clone(&broker),
            &config.mqtt.topic.pollution_publish,
        ));
        let pollution = PollutionPipeline::spawn(plant_id, sink, PollutionConfig::default());

        let pumps = vec![
            intake_pump,
            Self::spawn_request_pump(Arc::clone(&manager), requests),
            Self::spawn_next_up_pump(Arc::clone(&manager), next_up),
            Self::spawn_peer_pump(Arc::clone(&manager), Arc::clone(&directory), peer_events),
        ];

        let node = Self {
            plant_id,
            server,
            broker,
            pollution,
            peer_client,
            pumps,
        };
        node.announce_presence(&me, known, &directory).await;

        info!(plant_id, port, "Plant started");
        Ok(node)
    }

    /// Orderly shutdown, reverse of the startup order.
    pub async fn stop(self) {
        info!(plant_id = self.plant_id, "Plant stopping");
        for pump in &self.pumps {
            pump.abort();
        }
        self.pollution.shutdown().await;
        self.broker.shutdown().await;
        self.peer_client.close_all();
        self.server.shutdown().await;
        info!(plant_id = self.plant_id, "Plant stopped");
    }

    /// Introduce ourselves to every plant learned at registration. A peer
    /// that cannot be reached is presumed gone and evicted immediately.
    async fn announce_presence(
        &self,
        me: &PlantInfo,
        known: Vec<PlantInfo>,
        directory: &Arc<PlantDirectory>,
    ) {
        for peer in known {
            if let Err(error) = self.peer_client.announce_presence(&peer, me.clone()).await {
                warn!(
                    plant_id = self.plant_id,
                    peer = peer.plant_id,
                    %error,
                    "Peer unreachable at presence announcement, evicting"
                );
                directory.remove(peer.plant_id);
            }
        }
    }

    /// Intake channel to the election manager.
    fn spawn_request_pump(
        manager: Arc<ElectionManager>,
        mut requests: mpsc::UnboundedReceiver<EnergyRequest>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(request) = requests.recv().await {
                manager.on_energy_request(request).await;
            }
        })
    }

    /// Post-production handoffs back into fresh elections.
    fn spawn_next_up_pump(
        manager: Arc<ElectionManager>,
        mut next_up: NextUpReceiver,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(request) = next_up.recv().await {
                manager.on_energy_request(request).await;
            }
        })
    }

    /// Inbound peer events. Tokens and announcements are processed on their
    /// own tasks so a slow forward never stalls the pump.
    fn spawn_peer_pump(
        manager: Arc<ElectionManager>,
        directory: Arc<PlantDirectory>,
        mut events: mpsc::UnboundedReceiver<PeerEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    PeerEvent::PresenceAnnounced(info) => {
                        directory.add(info);
                    }
                    PeerEvent::TokenReceived(token) => {
                        let manager = Arc::clone(&manager);
                        tokio::spawn(async move { manager.on_token(token).await });
                    }
                    PeerEvent::WinnerReceived(announcement) => {
                        let manager = Arc::clone(&manager);
                        tokio::spawn(async move {
                            manager.on_winner_announcement(announcement).await;
                        });
                    }
                }
            }
        })
    }
}
