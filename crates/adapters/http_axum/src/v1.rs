//! Hue v1 API handlers.
//!
//! Every listing is restricted to the page of the registry this hub serves.
//! Item types other than `lights` are answered with `200 {}`, which is what
//! Alexa's discovery expects from a bridge without groups or sensors.

pub mod model;

use std::collections::BTreeMap;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use serde_json::Value;

use huehub_app::ports::EventPublisher;
use huehub_domain::command::RawCommand;
use huehub_domain::device::{DeviceRecord, DeviceType};
use huehub_domain::error::BridgeError;
use huehub_domain::event::CommandOrigin;
use huehub_domain::time::now;

use crate::error::{ApiError, parse_json};
use crate::sse::StreamMessage;
use crate::state::AppState;
use crate::v2::model::LightUpdate;

use self::model::{
    BridgeConfig, FullState, HueError, HueErrorDetail, INVALID_VALUE, Light, LightMap,
    Registration, RegistrationRequest, Success,
};

const LIGHTS: &str = "lights";

/// Build the v1 sub-router.
pub fn routes<P>() -> Router<AppState<P>>
where
    P: EventPublisher + Send + Sync + 'static,
{
    Router::new()
        .route("/api", get(full_state::<P>).post(register::<P>))
        .route("/api/", get(full_state::<P>).post(register::<P>))
        .route("/api/config", get(config::<P>))
        .route("/api/{username}", get(full_state_for::<P>))
        .route("/api/{username}/config", get(config_for::<P>))
        .route("/api/{username}/{item_type}", get(list::<P>).post(list::<P>))
        .route("/api/{username}/{item_type}/{id}", get(get_item::<P>))
        .route(
            "/api/{username}/{item_type}/{id}/state",
            put(update_state::<P>),
        )
}

/// Possible responses from the listing and item endpoints.
pub enum ItemResponse {
    Lights(Json<LightMap>),
    Light(Box<Json<Light>>),
    /// Unsupported item type.
    Empty,
}

impl IntoResponse for ItemResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Lights(json) => json.into_response(),
            Self::Light(json) => (*json).into_response(),
            Self::Empty => Json(serde_json::json!({})).into_response(),
        }
    }
}

/// Possible responses from the state endpoint.
pub enum UpdateResponse {
    Applied(Json<Vec<Success<BTreeMap<String, Value>>>>),
    Rejected(Json<Vec<HueError>>),
    /// Unsupported item type.
    Empty,
}

impl IntoResponse for UpdateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Applied(json) => json.into_response(),
            Self::Rejected(json) => json.into_response(),
            Self::Empty => Json(serde_json::json!({})).into_response(),
        }
    }
}

/// `POST /api`
pub async fn register<P>(
    State(state): State<AppState<P>>,
    body: Bytes,
) -> Result<Json<Vec<Success<Registration>>>, ApiError>
where
    P: EventPublisher + Send + Sync + 'static,
{
    let request = if body.is_empty() {
        RegistrationRequest::default()
    } else {
        parse_json(&body)
            .and_then(serde_json::from_value::<RegistrationRequest>)
            .map_err(|err| ApiError::MalformedBody(err.to_string()))?
    };
    tracing::info!(
        hub = state.hub.index,
        devicetype = request.devicetype.as_deref().unwrap_or("unknown"),
        "client registered"
    );
    let registration = Registration::new(
        &state.settings.default_username,
        request.generateclientkey,
    );
    Ok(Json(vec![Success {
        success: registration,
    }]))
}

/// `GET /api`
pub async fn full_state<P>(State(state): State<AppState<P>>) -> Json<FullState>
where
    P: EventPublisher + Send + Sync + 'static,
{
    Json(render_full_state(&state, None))
}

/// `GET /api/{username}`
pub async fn full_state_for<P>(
    State(state): State<AppState<P>>,
    Path(username): Path<String>,
) -> Json<FullState>
where
    P: EventPublisher + Send + Sync + 'static,
{
    Json(render_full_state(&state, Some(&username)))
}

fn render_full_state<P>(state: &AppState<P>, username: Option<&str>) -> FullState
where
    P: EventPublisher + Send + Sync + 'static,
{
    FullState {
        lights: LightMap::from_devices(&state.page()),
        config: BridgeConfig::new(&state.settings, &state.identity, username, now()),
    }
}

/// `GET /api/config`
pub async fn config<P>(State(state): State<AppState<P>>) -> Json<BridgeConfig>
where
    P: EventPublisher + Send + Sync + 'static,
{
    Json(BridgeConfig::new(&state.settings, &state.identity, None, now()))
}

/// `GET /api/{username}/config`
pub async fn config_for<P>(
    State(state): State<AppState<P>>,
    Path(username): Path<String>,
) -> Json<BridgeConfig>
where
    P: EventPublisher + Send + Sync + 'static,
{
    Json(BridgeConfig::new(
        &state.settings,
        &state.identity,
        Some(&username),
        now(),
    ))
}

/// `GET|POST /api/{username}/{item_type}`
pub async fn list<P>(
    State(state): State<AppState<P>>,
    Path((_username, item_type)): Path<(String, String)>,
) -> ItemResponse
where
    P: EventPublisher + Send + Sync + 'static,
{
    if item_type != LIGHTS {
        return ItemResponse::Empty;
    }
    ItemResponse::Lights(Json(LightMap::from_devices(&state.page())))
}

/// `GET /api/{username}/{item_type}/{id}`
pub async fn get_item<P>(
    State(state): State<AppState<P>>,
    Path((_username, item_type, id)): Path<(String, String, String)>,
) -> Result<ItemResponse, ApiError>
where
    P: EventPublisher + Send + Sync + 'static,
{
    if item_type != LIGHTS {
        return Ok(ItemResponse::Empty);
    }
    let device = state.device(&id)?;
    Ok(ItemResponse::Light(Box::new(Json(Light::from_device(
        &device,
    )))))
}

/// `PUT /api/{username}/{item_type}/{id}/state`
pub async fn update_state<P>(
    State(state): State<AppState<P>>,
    Path((_username, item_type, id)): Path<(String, String, String)>,
    body: Bytes,
) -> Result<UpdateResponse, ApiError>
where
    P: EventPublisher + Send + Sync + 'static,
{
    let payload = parse_json(&body).map_err(|err| ApiError::MalformedBody(err.to_string()))?;
    if item_type != LIGHTS {
        return Ok(UpdateResponse::Empty);
    }
    state.device(&id)?;

    let raw = RawCommand::from_json(&payload);
    let command = match state.control.control(&id, &raw, CommandOrigin::Alexa).await {
        Ok(command) => command,
        Err(BridgeError::Normalize(err)) => {
            return Ok(UpdateResponse::Rejected(Json(vec![HueError {
                error: HueErrorDetail {
                    kind: INVALID_VALUE,
                    address: format!("/lights/{id}/state"),
                    description: err.to_string(),
                },
            }])));
        }
        Err(err) => return Err(err.into()),
    };

    let device = state.device(&id)?;
    state.sse.broadcast(&StreamMessage::new(
        "update",
        serde_json::to_value(LightUpdate::new(&device, &command))
            .into_iter()
            .collect(),
    ));
    Ok(UpdateResponse::Applied(Json(success_entries(
        &id, &payload, &device,
    ))))
}

/// One `{"success": {"/lights/<id>/state/<key>": value}}` entry per requested
/// key the device stores; other keys are left out.
fn success_entries(
    id: &str,
    payload: &Value,
    device: &DeviceRecord,
) -> Vec<Success<BTreeMap<String, Value>>> {
    let entry = |key: &str, value: Value| Success {
        success: BTreeMap::from([(format!("/lights/{id}/state/{key}"), value)]),
    };
    match payload {
        Value::Object(fields) => fields
            .keys()
            .filter_map(|key| applied_value(key, device).map(|value| entry(key, value)))
            .collect(),
        _ => vec![entry("on", Value::Bool(device.state.on))],
    }
}

/// The stored value of a state attribute, if the key names one the device has.
fn applied_value(key: &str, device: &DeviceRecord) -> Option<Value> {
    let state = &device.state;
    match (key, device.device_type) {
        ("on", _) => Some(Value::from(state.on)),
        ("bri", _) => Some(Value::from(state.bri)),
        ("xy", _) => state.xy.map(|[x, y]| Value::from(vec![x, y])),
        ("hue", _) => state.hue.map(Value::from),
        ("sat", _) => state.sat.map(Value::from),
        ("ct", _) => state.ct.map(Value::from),
        ("position", DeviceType::WindowCovering) => Some(Value::from(state.position)),
        ("temperature", DeviceType::TemperatureSensor) => Some(Value::from(state.temperature)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::tests::{body_json, request, test_state};
    use axum::http::StatusCode;
    use huehub_domain::device::{AccessoryRegistration, DeviceType};
    use serde_json::json;

    fn add(state: &AppState<std::sync::Arc<huehub_app::event_bus::InProcessEventBus>>, id: &str, ty: DeviceType) {
        state
            .registry
            .register(
                AccessoryRegistration::builder()
                    .id(id)
                    .name(id)
                    .device_type(ty)
                    .build()
                    .unwrap(),
            )
            .unwrap();
    }

    #[tokio::test]
    async fn should_hand_out_default_username() {
        let (state, _bus) = test_state(0, 0);
        let response = request(state, "POST", "/api", Some(json!({"devicetype": "Echo"}))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body, json!([{"success": {"username": "huehub"}}]));
    }

    #[tokio::test]
    async fn should_add_client_key_when_requested() {
        let (state, _bus) = test_state(0, 0);
        let response = request(
            state,
            "POST",
            "/api",
            Some(json!({"devicetype": "Echo", "generateclientkey": true})),
        )
        .await;
        let body = body_json(response).await;
        assert!(body[0]["success"]["clientkey"].is_string());
    }

    #[tokio::test]
    async fn should_list_only_lights_of_own_page() {
        let (state, _bus) = test_state(1, 2);
        for id in ["a", "b", "c", "d", "e"] {
            add(&state, id, DeviceType::DimmableLight);
        }
        let body = body_json(request(state, "GET", "/api/user/lights", None).await).await;
        let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["c", "d"]);
    }

    #[tokio::test]
    async fn should_answer_empty_object_for_other_item_types() {
        let (state, _bus) = test_state(0, 0);
        add(&state, "a", DeviceType::DimmableLight);
        let response = request(state, "GET", "/api/user/groups", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({}));
    }

    #[tokio::test]
    async fn should_omit_lights_from_full_state_when_page_is_empty() {
        let (state, _bus) = test_state(0, 0);
        let body = body_json(request(state, "GET", "/api/user", None).await).await;
        assert!(body.get("lights").is_none());
        assert_eq!(body["config"]["whitelist"]["user"]["name"], "Echo");
    }

    #[tokio::test]
    async fn should_serve_config_without_username() {
        let (state, _bus) = test_state(0, 0);
        let body = body_json(request(state, "GET", "/api/config", None).await).await;
        assert_eq!(body["modelid"], "BSB002");
        assert!(body.get("whitelist").is_none());
    }

    #[tokio::test]
    async fn should_answer_bad_gateway_for_unknown_light() {
        let (state, _bus) = test_state(0, 0);
        let response = request(state, "GET", "/api/user/lights/ghost", None).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await, json!({}));
    }

    #[tokio::test]
    async fn should_apply_state_and_report_success_paths() {
        let (state, _bus) = test_state(0, 0);
        add(&state, "lamp", DeviceType::DimmableLight);
        let registry = std::sync::Arc::clone(&state.registry);

        let response = request(
            state,
            "PUT",
            "/api/user/lights/lamp/state",
            Some(json!({"on": true, "bri": 300})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body,
            json!([
                {"success": {"/lights/lamp/state/bri": 254}},
                {"success": {"/lights/lamp/state/on": true}}
            ])
        );
        assert_eq!(registry.get("lamp").unwrap().state.bri, 254);
    }

    #[tokio::test]
    async fn should_only_report_success_for_applied_keys() {
        let (state, _bus) = test_state(0, 0);
        add(&state, "lamp", DeviceType::DimmableLight);

        let response = request(
            state,
            "PUT",
            "/api/user/lights/lamp/state",
            Some(json!({"on": true, "alert": "select"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!([{"success": {"/lights/lamp/state/on": true}}])
        );
    }

    #[tokio::test]
    async fn should_reject_malformed_json_without_mutation() {
        let (state, _bus) = test_state(0, 0);
        add(&state, "lamp", DeviceType::DimmableLight);
        let registry = std::sync::Arc::clone(&state.registry);
        let before = registry.get("lamp").unwrap().state;

        let response = crate::router::tests::raw_request(
            state,
            "PUT",
            "/api/user/lights/lamp/state",
            "{\"on\": tru",
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(registry.get("lamp").unwrap().state, before);
    }

    #[tokio::test]
    async fn should_report_hue_error_for_unrecognized_payload() {
        let (state, _bus) = test_state(0, 0);
        add(&state, "lamp", DeviceType::DimmableLight);
        let response = request(
            state,
            "PUT",
            "/api/user/lights/lamp/state",
            Some(json!({"alert": "select"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body[0]["error"]["type"], 7);
    }

    #[tokio::test]
    async fn should_answer_bad_gateway_when_controlling_unknown_light() {
        let (state, _bus) = test_state(0, 0);
        let response = request(
            state,
            "PUT",
            "/api/user/lights/ghost/state",
            Some(json!({"on": true})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
