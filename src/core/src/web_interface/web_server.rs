use log::{debug, info};
use std::convert::Infallible;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};

use super::app_state::AppState;
use super::routes::*;
use super::types::ApiFailure;
use crate::configuration::ServerConfig;
use crate::error_handling::types::WebError;

use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

/// HTTP API in front of the scan sessions.
pub struct WebServer {
    state: AppState,
    allowed_origins: Vec<String>,
}

impl WebServer {
    pub fn new(state: AppState, allowed_origins: Vec<String>) -> Self {
        Self {
            state,
            allowed_origins,
        }
    }

    /// All routes behind the CORS filter, with request logging and JSON
    /// error bodies for rejections.
    pub fn routes(&self) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
        let state = self.state.clone();
        let cors = warp::cors()
            .allow_origins(self.allowed_origins.iter().map(String::as_str))
            .allow_methods(vec!["GET", "POST", "OPTIONS"])
            .allow_headers(vec!["content-type"]);

        list_devices_route(state.clone())
            .or(start_monitor_route(state.clone()))
            .or(stop_monitor_route(state.clone()))
            .or(start_scan_route(state.clone()))
            .or(stop_scan_route(state.clone()))
            .or(networks_route(state.clone()))
            .or(network_stream_route(state.clone()))
            .or(device_stream_route(state.clone()))
            .or(stop_devices_scan_route(state.clone()))
            .or(scans_route(state))
            .with(cors)
            .with(warp::log("airsight::api"))
            .recover(handle_rejection)
    }

    /// Serves until `shutdown` resolves.
    pub async fn start<F>(&self, addr: SocketAddr, shutdown: F) -> Result<(), WebError>
    where
        F: Future<Output = ()> + Send,
    {
        info!("HTTP API listening on http://{}", addr);
        let server = warp::serve(self.routes()).run(addr);
        tokio::select! {
            _ = server => {}
            _ = shutdown => debug!("HTTP API shutting down"),
        }
        Ok(())
    }
}

/// Socket address from the `[server]` section.
pub fn bind_address(server: &ServerConfig) -> Result<SocketAddr, WebError> {
    let ip: IpAddr = server
        .bind_address
        .parse()
        .map_err(|_| WebError::InvalidBindAddress(server.bind_address.clone()))?;
    Ok(SocketAddr::new(ip, server.port))
}

async fn handle_rejection(err: Rejection) -> Result<warp::reply::Response, Infallible> {
    let failure = if err.is_not_found() {
        ApiFailure::new(StatusCode::NOT_FOUND, "Not found")
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        ApiFailure::new(StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ApiFailure::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else if let Some(e) = err.find::<warp::filters::cors::CorsForbidden>() {
        ApiFailure::new(StatusCode::FORBIDDEN, e.to_string())
    } else {
        debug!("Unhandled rejection: {:?}", err);
        ApiFailure::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };
    Ok(failure.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let server = ServerConfig::default();
        assert_eq!(
            bind_address(&server).unwrap(),
            "127.0.0.1:5000".parse::<SocketAddr>().unwrap()
        );

        let bad = ServerConfig {
            bind_address: "localhost".to_string(),
            ..ServerConfig::default()
        };
        assert!(matches!(
            bind_address(&bad),
            Err(WebError::InvalidBindAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_rejections_are_json() {
        let response = handle_rejection(warp::reject::not_found()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
