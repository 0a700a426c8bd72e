use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warp::http::StatusCode;
use warp::reply::{self, Reply};

use crate::error_handling::types::{SessionError, WirelessError};
use crate::parsing::types::NetworkRecord;
use crate::session_management::SessionSummary;

/// Error payload of every endpoint: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

/// Body of `/start-monitor`, `/stop-monitor` and `/start-scan`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterfaceRequest {
    #[serde(default)]
    pub interface: Option<String>,
}

/// Query of `/get-devices-in-network`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DevicesQuery {
    pub bssid: Option<String>,
    pub channel: Option<String>,
    pub interface: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub devices: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StartScanResponse {
    pub message: String,
    pub session_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct NetworksResponse {
    pub networks: Vec<NetworkRecord>,
}

#[derive(Debug, Serialize)]
pub struct ScansResponse {
    pub scans: Vec<SessionSummary>,
}

/// A failed request: status plus the message sent back as [`ApiError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub message: String,
}

impl ApiFailure {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn into_response(self) -> reply::Response {
        reply::with_status(
            reply::json(&ApiError {
                error: self.message,
            }),
            self.status,
        )
        .into_response()
    }
}

impl From<SessionError> for ApiFailure {
    fn from(err: SessionError) -> Self {
        let status = match err {
            SessionError::MissingParameter(_) | SessionError::InvalidParameter(_) => {
                StatusCode::BAD_REQUEST
            }
            SessionError::Spawn(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiFailure::new(status, err.to_string())
    }
}

impl From<WirelessError> for ApiFailure {
    fn from(err: WirelessError) -> Self {
        let status = match err {
            WirelessError::MissingParameter(_) | WirelessError::InvalidInterface(_) => {
                StatusCode::BAD_REQUEST
            }
            WirelessError::CommandFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiFailure::new(status, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::types::CaptureError;

    #[test]
    fn test_error_statuses() {
        let missing: ApiFailure = SessionError::MissingParameter("Interface").into();
        assert_eq!(missing.status, StatusCode::BAD_REQUEST);
        assert_eq!(missing.message, "Interface parameter missing");

        let spawn: ApiFailure = SessionError::Spawn(CaptureError::ExitedDuringStartup {
            status: "exit status: 1".into(),
            output: vec!["wlan9mon: No such device".into()],
        })
        .into();
        assert_eq!(spawn.status, StatusCode::INTERNAL_SERVER_ERROR);

        let failed: ApiFailure = WirelessError::CommandFailed {
            command: "airmon-ng start wlan0".into(),
            detail: "exit status: 1".into(),
        }
        .into();
        assert_eq!(failed.status, StatusCode::INTERNAL_SERVER_ERROR);

        let response = ApiFailure::new(StatusCode::NOT_FOUND, "Not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_request_bodies() {
        let body: InterfaceRequest = serde_json::from_str("{}").unwrap();
        assert!(body.interface.is_none());
        let body: InterfaceRequest = serde_json::from_str(r#"{"interface":"wlan0"}"#).unwrap();
        assert_eq!(body.interface.as_deref(), Some("wlan0"));
    }
}
