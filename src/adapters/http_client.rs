//! HTTP client bound to a circuit.
//!
//! # Responsibilities
//! - Send outbound requests through a named circuit
//! - Classify transport errors and 5xx statuses as failures
//!
//! # Design Decisions
//! - 4xx is the caller's problem, not the dependency's; it counts as success
//! - Fallback policy stays with the caller

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::ConfigError;
use crate::resilience::{CallContext, CircuitBreaker, CircuitBreakerManager, CircuitError};

/// Failure of the upstream call itself.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status}")]
    Status { status: reqwest::StatusCode },

    #[error("invalid response body: {0}")]
    Decode(reqwest::Error),
}

/// A `reqwest` client whose calls go through one circuit.
#[derive(Debug, Clone)]
pub struct ProtectedClient {
    client: reqwest::Client,
    circuit: CircuitBreaker,
}

impl ProtectedClient {
    pub fn new(
        client: reqwest::Client,
        manager: &CircuitBreakerManager,
        circuit: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            client,
            circuit: manager.get_circuit(circuit, None)?,
        })
    }

    pub fn circuit(&self) -> &CircuitBreaker {
        &self.circuit
    }

    /// The underlying client, for building requests.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Send `request` through the circuit.
    pub async fn send(
        &self,
        request: reqwest::RequestBuilder,
        context: CallContext,
    ) -> Result<reqwest::Response, CircuitError<UpstreamError>> {
        self.circuit
            .execute(
                move || async move {
                    let response = request.send().await?;
                    check_status(response)
                },
                context,
            )
            .await
    }

    /// GET `url` and decode the JSON body. A body that fails to decode
    /// counts as a failure of the dependency.
    pub async fn get_json<T>(
        &self,
        url: &str,
        context: CallContext,
    ) -> Result<T, CircuitError<UpstreamError>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let request = self.client.get(url);
        self.circuit
            .execute(
                move || async move {
                    let response = check_status(request.send().await?)?;
                    response.json::<T>().await.map_err(UpstreamError::Decode)
                },
                context.with("url", url),
            )
            .await
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_server_error() {
        Err(UpstreamError::Status { status })
    } else {
        Ok(response)
    }
}
