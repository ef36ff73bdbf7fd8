//! Open-Meteo gateway against a local stub server

use std::collections::HashMap;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use kaze::config::OpenMeteoConfig;
use kaze::{EnrichmentGateway, GatewayError, OpenMeteoGateway};
use serde_json::json;

async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/v1")
}

fn gateway(base_url: String, api_key: Option<&str>) -> OpenMeteoGateway {
    let config = OpenMeteoConfig {
        base_url,
        api_key: api_key.map(str::to_string),
        timeout_seconds: 5,
        max_retries: 0,
    };
    OpenMeteoGateway::new(&config).unwrap()
}

async fn elevation_from_latitude(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    let latitude: f64 = params["latitude"].parse().unwrap();
    Json(json!({"elevation": [latitude * 10.0]}))
}

#[tokio::test]
async fn test_elevation_uses_first_value() {
    let base_url = spawn_stub(Router::new().route("/v1/elevation", get(elevation_from_latitude))).await;

    let elevation = gateway(base_url, None).elevation(12.5, 7.0).await.unwrap();
    assert_eq!(elevation, 125.0);
}

#[tokio::test]
async fn test_api_key_is_sent_when_configured() {
    let router = Router::new().route(
        "/v1/elevation",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            if params.get("apikey").map(String::as_str) == Some("secret") {
                Json(json!({"elevation": [1.0]})).into_response()
            } else {
                StatusCode::UNAUTHORIZED.into_response()
            }
        }),
    );
    let base_url = spawn_stub(router).await;

    let without_key = gateway(base_url.clone(), None).elevation(1.0, 1.0).await;
    assert_eq!(without_key, Err(GatewayError::Status { status: 401 }));

    let with_key = gateway(base_url, Some("secret")).elevation(1.0, 1.0).await;
    assert_eq!(with_key, Ok(1.0));
}

#[tokio::test]
async fn test_forecast_decodes_hourly_arrays() {
    let router = Router::new().route(
        "/v1/forecast",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            assert!(params["hourly"].contains("wind_direction_10m"));
            Json(json!({
                "latitude": 52.52,
                "longitude": 13.41,
                "hourly_units": {"temperature_2m": "°C"},
                "hourly": {
                    "time": ["2024-03-01T00:00", "2024-03-01T01:00"],
                    "temperature_2m": [3.1, 2.9],
                    "precipitation": [0.0, 0.4],
                    "wind_speed_10m": [9.7, 10.2],
                    "wind_direction_10m": [240.0, 245.0]
                }
            }))
        }),
    );
    let base_url = spawn_stub(router).await;

    let hourly = gateway(base_url, None).forecast(52.52, 13.41).await.unwrap();
    assert_eq!(hourly.time, vec!["2024-03-01T00:00", "2024-03-01T01:00"]);
    assert_eq!(hourly.temperature, vec![3.1, 2.9]);
    assert_eq!(hourly.precipitation, vec![0.0, 0.4]);
    assert_eq!(hourly.wind_speed, vec![9.7, 10.2]);
    assert_eq!(hourly.wind_direction, vec![240.0, 245.0]);
}

#[tokio::test]
async fn test_server_error_is_a_status_failure() {
    let router = Router::new().route(
        "/v1/forecast",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base_url = spawn_stub(router).await;

    let result = gateway(base_url, None).forecast(1.0, 1.0).await;
    assert_eq!(result, Err(GatewayError::Status { status: 500 }));
}

#[tokio::test]
async fn test_malformed_payload_is_a_decode_failure() {
    let router = Router::new().route("/v1/elevation", get(|| async { "elevation: high" }));
    let base_url = spawn_stub(router).await;

    let result = gateway(base_url, None).elevation(1.0, 1.0).await;
    assert!(matches!(result, Err(GatewayError::Decode { .. })), "{result:?}");
}

#[tokio::test]
async fn test_empty_elevation_array_is_reported() {
    let router = Router::new().route(
        "/v1/elevation",
        get(|| async { Json(json!({"elevation": []})) }),
    );
    let base_url = spawn_stub(router).await;

    let result = gateway(base_url, None).elevation(1.0, 1.0).await;
    assert_eq!(result, Err(GatewayError::EmptyElevation));
}

#[tokio::test]
async fn test_unreachable_server_is_a_request_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = gateway(format!("http://{addr}/v1"), None)
        .elevation(1.0, 1.0)
        .await;
    assert!(matches!(result, Err(GatewayError::Request { .. })), "{result:?}");
}
