//! Hue v2 (CLIP) resource handlers, mounted under `/clip/v2/resource`.

pub mod model;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::get;
use serde_json::Value;

use huehub_app::ports::EventPublisher;
use huehub_domain::command::{CommandFields, RawCommand, XyInput};
use huehub_domain::error::BridgeError;
use huehub_domain::event::CommandOrigin;
use huehub_domain::normalizer::brightness_to_bri;
use huehub_domain::time::now;

use crate::error::{Envelope, V2Error, parse_json};
use crate::sse::StreamMessage;
use crate::state::AppState;

use self::model::{
    BridgeResource, DeviceResource, LightResource, LightUpdate, LightUpdateRequest, PutSuccess,
    ResourceRef,
};

/// Resource types answered with an empty list.
const PLACEHOLDER_TYPES: [&str; 4] = ["room", "zone", "scene", "bridge_home"];

/// Build the `/clip/v2/resource` sub-router.
pub fn routes<P>() -> Router<AppState<P>>
where
    P: EventPublisher + Send + Sync + 'static,
{
    Router::new()
        .route("/light", get(list_lights::<P>))
        .route("/light/{id}", get(get_light::<P>).put(update_light::<P>))
        .route("/device", get(list_devices::<P>))
        .route("/bridge", get(bridge::<P>))
        .route("/bridge/{username}", get(bridge_for::<P>))
        .route("/{resource_type}", get(other::<P>))
        .route("/{resource_type}/{id}", get(other_item::<P>))
}

/// `GET /clip/v2/resource/light`
pub async fn list_lights<P>(State(state): State<AppState<P>>) -> Json<Envelope<LightResource>>
where
    P: EventPublisher + Send + Sync + 'static,
{
    Json(Envelope::data(
        state.page().iter().map(LightResource::from_device).collect(),
    ))
}

/// `GET /clip/v2/resource/light/{id}`
pub async fn get_light<P>(
    State(state): State<AppState<P>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<LightResource>>, V2Error>
where
    P: EventPublisher + Send + Sync + 'static,
{
    let device = state
        .device_by_v2_id(&id)
        .ok_or_else(|| V2Error::not_available(format!("/resource/light/{id}")))?;
    Ok(Json(Envelope::data(vec![LightResource::from_device(
        &device,
    )])))
}

/// `PUT /clip/v2/resource/light/{id}`
///
/// Each recognized attribute is applied as its own command and reported as
/// its own data entry. Attributes the device rejects are skipped.
pub async fn update_light<P>(
    State(state): State<AppState<P>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Envelope<PutSuccess>>, V2Error>
where
    P: EventPublisher + Send + Sync + 'static,
{
    let address = format!("/resource/light/{id}");
    let request: LightUpdateRequest = parse_json(&body)
        .and_then(serde_json::from_value)
        .map_err(|err| V2Error::invalid_body(&address, err.to_string()))?;
    let device = state
        .device_by_v2_id(&id)
        .ok_or_else(|| V2Error::not_available(&address))?;
    let rid = model::light_id(&device);

    let mut data = Vec::new();
    for fields in commands(&request) {
        match state
            .control
            .control(&device.uuid, &RawCommand::Object(fields), CommandOrigin::Alexa)
            .await
        {
            Ok(command) => {
                if let Ok(updated) = state.device(&device.uuid) {
                    broadcast_update(&state, &LightUpdate::new(&updated, &command));
                }
                data.push(PutSuccess {
                    success: ResourceRef::new(rid, "light"),
                });
            }
            Err(BridgeError::Normalize(err)) => {
                tracing::warn!(light = %id, reason = %err, "attribute skipped");
            }
            Err(err) => return Err(V2Error::from_domain(&address, &err)),
        }
    }
    Ok(Json(Envelope::data(data)))
}

/// Split a partial update into one normalizer input per attribute.
fn commands(request: &LightUpdateRequest) -> Vec<CommandFields> {
    let mut steps = Vec::new();
    if let Some(on) = &request.on {
        steps.push(CommandFields {
            on: Some(on.on),
            ..CommandFields::default()
        });
    }
    if let Some(dimming) = &request.dimming {
        steps.push(CommandFields {
            bri: Some(f64::from(brightness_to_bri(dimming.brightness))),
            ..CommandFields::default()
        });
    }
    if let Some(color) = &request.color {
        steps.push(CommandFields {
            xy: Some(XyInput::Point([color.xy.x, color.xy.y])),
            ..CommandFields::default()
        });
    }
    if let Some(temperature) = &request.color_temperature {
        steps.push(CommandFields {
            ct: Some(temperature.mirek),
            ..CommandFields::default()
        });
    }
    steps
}

fn broadcast_update<P>(state: &AppState<P>, update: &LightUpdate) {
    match serde_json::to_value(update) {
        Ok(value) => state.sse.broadcast(&StreamMessage::new("update", vec![value])),
        Err(err) => tracing::warn!(%err, "failed to serialize light update"),
    }
}

/// `GET /clip/v2/resource/device`
pub async fn list_devices<P>(State(state): State<AppState<P>>) -> Json<Envelope<DeviceResource>>
where
    P: EventPublisher + Send + Sync + 'static,
{
    Json(Envelope::data(
        state.page().iter().map(DeviceResource::from_device).collect(),
    ))
}

/// `GET /clip/v2/resource/bridge`
pub async fn bridge<P>(State(state): State<AppState<P>>) -> Json<Envelope<BridgeResource>>
where
    P: EventPublisher + Send + Sync + 'static,
{
    Json(Envelope::data(vec![BridgeResource::new(
        &state.settings,
        &state.identity,
        None,
        now(),
    )]))
}

/// `GET /clip/v2/resource/bridge/{username}`
pub async fn bridge_for<P>(
    State(state): State<AppState<P>>,
    Path(username): Path<String>,
) -> Json<Envelope<BridgeResource>>
where
    P: EventPublisher + Send + Sync + 'static,
{
    Json(Envelope::data(vec![BridgeResource::new(
        &state.settings,
        &state.identity,
        Some(&username),
        now(),
    )]))
}

/// `GET /clip/v2/resource/{resource_type}`
pub async fn other<P>(
    State(_state): State<AppState<P>>,
    Path(resource_type): Path<String>,
) -> Result<Json<Envelope<Value>>, V2Error>
where
    P: EventPublisher + Send + Sync + 'static,
{
    if PLACEHOLDER_TYPES.contains(&resource_type.as_str()) {
        return Ok(Json(Envelope::data(Vec::new())));
    }
    Err(V2Error::not_available(format!("/resource/{resource_type}")))
}

/// `GET /clip/v2/resource/{resource_type}/{id}`
pub async fn other_item<P>(
    State(_state): State<AppState<P>>,
    Path((resource_type, id)): Path<(String, String)>,
) -> V2Error
where
    P: EventPublisher + Send + Sync + 'static,
{
    V2Error::not_available(format!("/resource/{resource_type}/{id}"))
}
