//! UPnP device descriptor served at `/description.xml`.
//!
//! Alexa fetches this document from the SSDP `LOCATION` header to confirm
//! the hub is a Hue bridge before it talks to the API.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use huehub_app::ports::EventPublisher;

use crate::state::AppState;

/// Render the descriptor of one hub.
#[must_use]
pub fn render(protocol: &str, host: &str, port: u16, name: &str, serial: &str, udn: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" ?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
<specVersion>
<major>1</major>
<minor>0</minor>
</specVersion>
<URLBase>{protocol}://{host}:{port}/</URLBase>
<device>
<deviceType>urn:schemas-upnp-org:device:Basic:1</deviceType>
<friendlyName>{name} ({host})</friendlyName>
<manufacturer>Signify</manufacturer>
<manufacturerURL>http://www.philips-hue.com</manufacturerURL>
<modelDescription>Philips hue Personal Wireless Lighting</modelDescription>
<modelName>Philips hue bridge 2015</modelName>
<modelNumber>BSB002</modelNumber>
<modelURL>http://www.philips-hue.com</modelURL>
<serialNumber>{serial}</serialNumber>
<UDN>uuid:{udn}</UDN>
<presentationURL>index.html</presentationURL>
</device>
</root>
"#
    )
}

/// `GET /description.xml`
pub async fn description<P>(State(state): State<AppState<P>>) -> impl IntoResponse
where
    P: EventPublisher + Send + Sync + 'static,
{
    let serial = state.identity.mac.replace(':', "").to_ascii_lowercase();
    let body = render(
        &state.settings.protocol,
        &state.settings.advertise_host,
        state.hub.port,
        &escape(&state.settings.name),
        &serial,
        &state.identity.bridge_uuid,
    );
    ([(header::CONTENT_TYPE, "text/xml; charset=utf-8")], body)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
