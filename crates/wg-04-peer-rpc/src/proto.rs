//! Generated wire types and their conversions to the shared entities.
//!
//! Ingress conversions validate: a message that does not map to a valid
//! entity becomes a [`WireError`] and the server answers a failure ack
//! instead of processing it.

use shared_types::{Bid, ElectionToken, PlantInfo, WinnerAnnouncement};
use thiserror::Error;

pub mod wattgrid {
    pub mod peer {
        pub mod v1 {
            tonic::include_proto!("wattgrid.peer.v1");
        }
    }
}

pub use wattgrid::peer::v1::{
    plant_peer_client, plant_peer_server, Ack, BidMsg, ElectionTokenMsg, PlantInfoMsg,
    WinnerAnnouncementMsg,
};

/// A wire message that does not map to a valid domain entity.
#[derive(Debug, Clone, Error)]
pub enum WireError {
    #[error("invalid plant info: {0}")]
    InvalidPlant(String),
    #[error("port {0} out of range")]
    PortOutOfRange(u32),
    #[error("blank request id")]
    BlankRequestId,
}

impl From<PlantInfo> for PlantInfoMsg {
    fn from(info: PlantInfo) -> Self {
        Self {
            plant_id: info.plant_id,
            address: info.address,
            port: u32::from(info.port),
            registration_time: info.registration_time,
        }
    }
}

impl TryFrom<PlantInfoMsg> for PlantInfo {
    type Error = WireError;

    fn try_from(msg: PlantInfoMsg) -> Result<Self, Self::Error> {
        let port = u16::try_from(msg.port).map_err(|_| WireError::PortOutOfRange(msg.port))?;
        let info = PlantInfo::new(msg.plant_id, msg.address, port, msg.registration_time);
        if !info.is_valid() {
            return Err(WireError::InvalidPlant(format!(
                "plant_id={} address={:?} port={}",
                info.plant_id, info.address, info.port
            )));
        }
        Ok(info)
    }
}

impl From<Bid> for BidMsg {
    fn from(bid: Bid) -> Self {
        Self {
            plant_id: bid.plant_id,
            price: bid.price,
        }
    }
}

impl From<BidMsg> for Bid {
    fn from(msg: BidMsg) -> Self {
        Bid::new(msg.plant_id, msg.price)
    }
}

impl From<ElectionToken> for ElectionTokenMsg {
    fn from(token: ElectionToken) -> Self {
        Self {
            initiator_id: token.initiator_id,
            request_id: token.request_id,
            best_bid: Some(token.best_bid.into()),
            energy_amount_kwh: token.energy_amount_kwh,
        }
    }
}

impl TryFrom<ElectionTokenMsg> for ElectionToken {
    type Error = WireError;

    fn try_from(msg: ElectionTokenMsg) -> Result<Self, Self::Error> {
        if msg.request_id.trim().is_empty() {
            return Err(WireError::BlankRequestId);
        }
        Ok(Self {
            initiator_id: msg.initiator_id,
            request_id: msg.request_id,
            // An absent bid field reads as the "no bid" sentinel.
            best_bid: msg.best_bid.map(Bid::from).unwrap_or(Bid::NONE),
            energy_amount_kwh: msg.energy_amount_kwh,
        })
    }
}

impl From<WinnerAnnouncement> for WinnerAnnouncementMsg {
    fn from(announcement: WinnerAnnouncement) -> Self {
        Self {
            request_id: announcement.request_id,
            winning_plant_id: announcement.winning_plant_id,
            winning_price: announcement.winning_price,
            initiator_id: announcement.initiator_id,
        }
    }
}

impl TryFrom<WinnerAnnouncementMsg> for WinnerAnnouncement {
    type Error = WireError;

    fn try_from(msg: WinnerAnnouncementMsg) -> Result<Self, Self::Error> {
        if msg.request_id.trim().is_empty() {
            return Err(WireError::BlankRequestId);
        }
        Ok(Self {
            request_id: msg.request_id,
            winning_plant_id: msg.winning_plant_id,
            winning_price: msg.winning_price,
            initiator_id: msg.initiator_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plant_info_round_trip() {
        let info = PlantInfo::new(3, "10.0.0.7", 4003, 1_700_000_000_000);
        let msg = PlantInfoMsg::from(info.clone());
        assert_eq!(PlantInfo::try_from(msg).unwrap(), info);
    }

    #[test]
    fn test_plant_info_rejects_out_of_range_port() {
        let msg = PlantInfoMsg {
            plant_id: 3,
            address: "10.0.0.7".into(),
            port: 70_000,
            registration_time: 0,
        };
        assert!(matches!(
            PlantInfo::try_from(msg),
            Err(WireError::PortOutOfRange(70_000))
        ));
    }

    #[test]
    fn test_plant_info_rejects_blank_address() {
        let msg = PlantInfoMsg {
            plant_id: 3,
            address: "  ".into(),
            port: 4003,
            registration_time: 0,
        };
        assert!(matches!(
            PlantInfo::try_from(msg),
            Err(WireError::InvalidPlant(_))
        ));
    }

    #[test]
    fn test_token_without_bid_reads_as_sentinel() {
        let msg = ElectionTokenMsg {
            initiator_id: 1,
            request_id: "R1".into(),
            best_bid: None,
            energy_amount_kwh: 100,
        };
        let token = ElectionToken::try_from(msg).unwrap();
        assert!(token.best_bid.is_none());
    }

    #[test]
    fn test_token_rejects_blank_request_id() {
        let msg = ElectionTokenMsg {
            initiator_id: 1,
            request_id: "   ".into(),
            best_bid: None,
            energy_amount_kwh: 100,
        };
        assert!(matches!(
            ElectionToken::try_from(msg),
            Err(WireError::BlankRequestId)
        ));
    }

    #[test]
    fn test_announcement_round_trip() {
        let announcement = WinnerAnnouncement {
            request_id: "R1".into(),
            winning_plant_id: 2,
            winning_price: 0.42,
            initiator_id: 1,
        };
        let msg = WinnerAnnouncementMsg::from(announcement.clone());
        assert_eq!(WinnerAnnouncement::try_from(msg).unwrap(), announcement);
    }
}
