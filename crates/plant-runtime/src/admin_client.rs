//! HTTP client for the administration service.

use reqwest::StatusCode;
use shared_types::PlantInfo;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum AdminError {
    /// Another plant already holds this id (HTTP 409).
    #[error("plant id {0} already registered")]
    Conflict(u64),
    /// The service answered, but not with a registration (4xx/5xx).
    #[error("administration service refused registration: {0}")]
    Refused(String),
    /// The service could not be reached at all.
    #[error("administration service unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),
}

/// Thin client over the gateway's registration surface.
pub struct AdminClient {
    http: reqwest::Client,
    base_url: String,
}

impl AdminClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Register this plant; on success returns the plants that were already
    /// registered, which seed the membership view.
    pub async fn register(&self, me: &PlantInfo) -> Result<Vec<PlantInfo>, AdminError> {
        let response = self
            .http
            .post(format!("{}/plants", self.base_url))
            .json(me)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED => {
                let known: Vec<PlantInfo> = response.json().await?;
                info!(
                    plant_id = me.plant_id,
                    known_plants = known.len(),
                    "Registered with the administration service"
                );
                Ok(known)
            }
            StatusCode::CONFLICT => Err(AdminError::Conflict(me.plant_id)),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AdminError::Refused(format!("{status}: {body}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wg_07_admin_gateway::{router, AdminState};

    async fn serve_gateway() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::new(AdminState::new()));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_register_maps_201_and_409() {
        let base_url = serve_gateway().await;
        let client = AdminClient::new(&base_url);

        let first = PlantInfo::new(1, "localhost", 4001, 10);
        assert!(client.register(&first).await.unwrap().is_empty());

        let second = PlantInfo::new(2, "localhost", 4002, 20);
        let known = client.register(&second).await.unwrap();
        assert_eq!(known.len(), 1);
        assert_eq!(known[0].plant_id, 1);

        let conflict = client.register(&first).await.unwrap_err();
        assert!(matches!(conflict, AdminError::Conflict(1)));
    }

    #[tokio::test]
    async fn test_invalid_body_is_refused() {
        let base_url = serve_gateway().await;
        let client = AdminClient::new(&base_url);

        let bogus = PlantInfo::new(0, "localhost", 4001, 10);
        assert!(matches!(
            client.register(&bogus).await.unwrap_err(),
            AdminError::Refused(_),
        ));
    }

    #[tokio::test]
    async fn test_dead_endpoint_is_unreachable() {
        let client = AdminClient::new("http://127.0.0.1:1");
        let me = PlantInfo::new(1, "localhost", 4001, 10);
        assert!(matches!(
            client.register(&me).await.unwrap_err(),
            AdminError::Unreachable(_),
        ));
    }
}
