use futures_util::StreamExt;
use serde::Serialize;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::sse::Event;
use warp::{reply, Filter, Rejection, Reply};

use super::app_state::AppState;
use super::handlers;
use super::types::{ApiFailure, DevicesQuery, InterfaceRequest};
use crate::session_management::Subscription;

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// JSON body with an optional `interface`; a missing or unreadable body
/// counts as an empty one so the handler reports the missing parameter.
fn interface_body() -> impl Filter<Extract = (InterfaceRequest,), Error = Infallible> + Clone {
    warp::body::content_length_limit(4 * 1024)
        .and(warp::body::json::<InterfaceRequest>())
        .or(warp::any().map(InterfaceRequest::default))
        .unify()
}

fn respond<T: Serialize>(result: Result<T, ApiFailure>) -> reply::Response {
    match result {
        Ok(body) => reply::with_status(reply::json(&body), StatusCode::OK).into_response(),
        Err(failure) => failure.into_response(),
    }
}

/// Streams every event of `subscription` as an unnamed SSE `data:` frame.
/// The stream ends after the session's terminal event.
fn event_stream(subscription: Subscription) -> reply::Response {
    let events = subscription
        .into_stream()
        .map(|event| Event::default().json_data(&event));
    warp::sse::reply(warp::sse::keep_alive().stream(events)).into_response()
}

/// GET /list-devices
pub fn list_devices_route(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("list-devices")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .then(|state: AppState| async move { respond(handlers::list_devices(&state).await) })
}

/// POST /start-monitor
pub fn start_monitor_route(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("start-monitor")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state))
        .and(interface_body())
        .then(|state: AppState, body: InterfaceRequest| async move {
            respond(handlers::start_monitor(&state, &body).await)
        })
}

/// POST /stop-monitor
pub fn stop_monitor_route(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("stop-monitor")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state))
        .and(interface_body())
        .then(|state: AppState, body: InterfaceRequest| async move {
            respond(handlers::stop_monitor(&state, &body).await)
        })
}

/// POST /start-scan
pub fn start_scan_route(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("start-scan")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state))
        .and(interface_body())
        .then(|state: AppState, body: InterfaceRequest| async move {
            respond(handlers::start_scan(&state, &body).await)
        })
}

/// POST /stop-scan
pub fn stop_scan_route(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("stop-scan")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state))
        .then(|state: AppState| async move { reply::json(&handlers::stop_scan(&state).await) })
}

/// POST /stop-devices-scan
pub fn stop_devices_scan_route(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("stop-devices-scan")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state))
        .then(|state: AppState| async move {
            reply::json(&handlers::stop_devices_scan(&state).await)
        })
}

/// GET /networks
pub fn networks_route(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("networks")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .then(|state: AppState| async move { reply::json(&handlers::networks(&state).await) })
}

/// GET /scans
pub fn scans_route(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("scans")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .then(|state: AppState| async move { reply::json(&handlers::scans(&state).await) })
}

/// GET /get-networks (SSE)
pub fn network_stream_route(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("get-networks")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .then(|state: AppState| async move {
            match handlers::open_network_stream(&state).await {
                Ok(subscription) => event_stream(subscription),
                Err(failure) => failure.into_response(),
            }
        })
}

/// GET /get-devices-in-network?bssid=..&channel=..[&interface=..] (SSE)
pub fn device_stream_route(
    state: AppState,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("get-devices-in-network")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .and(warp::query::<DevicesQuery>())
        .then(|state: AppState, query: DevicesQuery| async move {
            match handlers::open_device_stream(&state, &query).await {
                Ok(subscription) => event_stream(subscription),
                Err(failure) => failure.into_response(),
            }
        })
}
