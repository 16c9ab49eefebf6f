//! Command normalization.
//!
//! [`normalize`] turns a [`RawCommand`] into a [`NormalizedCommand`] against
//! the current [`DeviceState`]. The first matching rule wins:
//!
//! 1. device-type extensions (`position` for coverings, `temperature` for sensors)
//! 2. `xy`
//! 3. `hue` together with `sat`
//! 4. `ct`
//! 5. `bri`
//! 6. explicit on/off
//!
//! Normalization is pure; callers write the result back with
//! [`DeviceState::apply`].

use crate::command::{
    CommandFields, CommandKind, NormalizedCommand, RawCommand, XyInput, parse_switch_number,
    parse_switch_text,
};
use crate::device::{DEFAULT_XY, DeviceState, DeviceType};
use crate::error::NormalizeError;

pub const MAX_BRI: u8 = 254;
pub const MAX_HUE: u16 = 65535;
pub const MAX_SAT: u8 = 254;
pub const MIN_MIREK: u16 = 153;
pub const MAX_MIREK: u16 = 500;

/// Normalize `raw` for a device of `device_type` currently in `state`.
///
/// # Errors
///
/// Returns [`NormalizeError::Unrecognized`] when the payload carries no
/// instruction this device understands. The state must be left unchanged.
pub fn normalize(
    device_type: DeviceType,
    state: &DeviceState,
    raw: &RawCommand,
) -> Result<NormalizedCommand, NormalizeError> {
    match raw {
        RawCommand::Bool(on) => Ok(switch(device_type, state, *on)),
        RawCommand::Number(value) => parse_switch_number(*value)
            .map(|on| switch(device_type, state, on))
            .ok_or_else(|| NormalizeError::Unrecognized(format!("number {value}"))),
        RawCommand::Text(text) => parse_switch_text(text)
            .map(|on| switch(device_type, state, on))
            .ok_or_else(|| NormalizeError::Unrecognized(format!("string {text:?}"))),
        RawCommand::Object(fields) => normalize_fields(device_type, state, fields),
        RawCommand::Unsupported(kind) => Err(NormalizeError::Unrecognized((*kind).to_string())),
    }
}

fn normalize_fields(
    device_type: DeviceType,
    state: &DeviceState,
    fields: &CommandFields,
) -> Result<NormalizedCommand, NormalizeError> {
    if let Some(cmd) = extension(device_type, state, fields) {
        return Ok(cmd);
    }

    let on = fields.on.unwrap_or(state.on);
    let bri = fields.bri.map_or(state.bri, clamp_bri);

    if let Some(xy) = fields.xy {
        let [x, y] = match xy {
            XyInput::Point(point) => point,
            XyInput::Malformed => DEFAULT_XY,
        };
        let mut cmd = NormalizedCommand::new(CommandKind::Color, on, bri);
        cmd.xy = Some([x.clamp(0.0, 1.0), y.clamp(0.0, 1.0)]);
        return Ok(cmd);
    }

    if let (Some(hue), Some(sat)) = (fields.hue, fields.sat) {
        let mut cmd = NormalizedCommand::new(CommandKind::Color, on, bri);
        cmd.hue = Some(clamp_hue(hue));
        cmd.sat = Some(clamp_sat(sat));
        return Ok(cmd);
    }

    if let Some(ct) = fields.ct {
        let mut cmd = NormalizedCommand::new(CommandKind::Color, on, bri);
        cmd.ct = Some(clamp_mirek(ct));
        return Ok(cmd);
    }

    if fields.bri.is_some() {
        let mut cmd = NormalizedCommand::new(CommandKind::Dim, bri > 0, bri);
        cmd.change_direction = Some(i8::from(bri > state.bri) - i8::from(bri < state.bri));
        if device_type == DeviceType::WindowCovering {
            cmd.position = Some(bri_to_brightness(bri));
        }
        return Ok(cmd);
    }

    if let Some(on) = fields.on {
        return Ok(switch(device_type, state, on));
    }

    Err(NormalizeError::Unrecognized(
        "object without a recognized attribute".to_string(),
    ))
}

fn extension(
    device_type: DeviceType,
    state: &DeviceState,
    fields: &CommandFields,
) -> Option<NormalizedCommand> {
    match device_type {
        DeviceType::WindowCovering => fields.position.map(|raw| {
            let position = clamp_percent(raw);
            let mut cmd = NormalizedCommand::new(
                CommandKind::Position,
                position > 0,
                brightness_to_bri(f64::from(position)),
            );
            cmd.position = Some(position);
            cmd
        }),
        DeviceType::TemperatureSensor => fields.temperature.map(|temperature| {
            let mut cmd = NormalizedCommand::new(CommandKind::Temperature, state.on, state.bri);
            cmd.temperature = Some(temperature);
            cmd
        }),
        _ => None,
    }
}

fn switch(device_type: DeviceType, state: &DeviceState, on: bool) -> NormalizedCommand {
    // A light switched on at zero brightness would stay dark.
    let bri = if on && state.bri == 0 { MAX_BRI } else { state.bri };
    let mut cmd = NormalizedCommand::new(CommandKind::Switch, on, bri);
    if device_type == DeviceType::WindowCovering {
        cmd.position = Some(if on { 100 } else { 0 });
    }
    cmd
}

/// v1 brightness (0–254) to v2 brightness percent (0–100).
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn bri_to_brightness(bri: u8) -> u8 {
    (f64::from(bri) / f64::from(MAX_BRI) * 100.0).round() as u8
}

/// v2 brightness percent (0–100) to v1 brightness (0–254).
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn brightness_to_bri(brightness: f64) -> u8 {
    (brightness.clamp(0.0, 100.0) / 100.0 * f64::from(MAX_BRI)).round() as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_bri(value: f64) -> u8 {
    value.clamp(0.0, f64::from(MAX_BRI)).round() as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_hue(value: f64) -> u16 {
    value.clamp(0.0, f64::from(MAX_HUE)).round() as u16
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_sat(value: f64) -> u8 {
    value.clamp(0.0, f64::from(MAX_SAT)).round() as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_mirek(value: f64) -> u16 {
    value
        .clamp(f64::from(MIN_MIREK), f64::from(MAX_MIREK))
        .round() as u16
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_percent(value: f64) -> u8 {
    value.clamp(0.0, 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ColorMode;
    use serde_json::json;

    fn light() -> DeviceState {
        DeviceState::initial(DeviceType::ExtendedColorLight)
    }

    fn run(device_type: DeviceType, state: &DeviceState, payload: serde_json::Value) -> Result<NormalizedCommand, NormalizeError> {
        normalize(device_type, state, &RawCommand::from_json(&payload))
    }

    #[test]
    fn should_prefer_xy_over_hue_and_sat() {
        let cmd = run(
            DeviceType::ExtendedColorLight,
            &light(),
            json!({"xy": [0.5, 0.5], "hue": 100, "sat": 200}),
        )
        .unwrap();
        assert_eq!(cmd.command, CommandKind::Color);
        assert_eq!(cmd.xy, Some([0.5, 0.5]));
        assert!(cmd.hue.is_none());
        assert!(cmd.sat.is_none());
    }

    #[test]
    fn should_not_emit_color_for_hue_without_sat() {
        let result = run(DeviceType::ExtendedColorLight, &light(), json!({"hue": 100}));
        assert!(matches!(result, Err(NormalizeError::Unrecognized(_))));
    }

    #[test]
    fn should_fall_through_to_switch_when_hue_alone_comes_with_on() {
        let cmd = run(
            DeviceType::ExtendedColorLight,
            &light(),
            json!({"hue": 100, "on": true}),
        )
        .unwrap();
        assert_eq!(cmd.command, CommandKind::Switch);
        assert!(cmd.on);
    }

    #[test]
    fn should_clamp_hue_and_sat() {
        let cmd = run(
            DeviceType::ExtendedColorLight,
            &light(),
            json!({"hue": 70000, "sat": 300}),
        )
        .unwrap();
        assert_eq!(cmd.hue, Some(65535));
        assert_eq!(cmd.sat, Some(254));
        assert_eq!(cmd.color_mode(), Some(ColorMode::Hs));
    }

    #[test]
    fn should_clamp_xy_components_to_unit_range() {
        let cmd = run(DeviceType::ExtendedColorLight, &light(), json!({"xy": [1.5, -2]})).unwrap();
        assert_eq!(cmd.xy, Some([1.0, 0.0]));
    }

    #[test]
    fn should_substitute_default_white_for_malformed_xy() {
        let cmd = run(DeviceType::ColorLight, &light(), json!({"xy": [0.2]})).unwrap();
        assert_eq!(cmd.xy, Some(DEFAULT_XY));
        assert_eq!(cmd.command, CommandKind::Color);
    }

    #[test]
    fn should_clamp_ct_to_mirek_range() {
        let cmd = run(DeviceType::ColorTemperatureLight, &light(), json!({"ct": 20})).unwrap();
        assert_eq!(cmd.ct, Some(MIN_MIREK));
        assert_eq!(cmd.command, CommandKind::Color);
    }

    #[test]
    fn should_dim_and_report_direction() {
        let mut state = light();
        state.bri = 100;
        let up = run(DeviceType::DimmableLight, &state, json!({"bri": 150})).unwrap();
        assert_eq!(up.command, CommandKind::Dim);
        assert_eq!(up.change_direction, Some(1));
        assert!(up.on);

        let down = run(DeviceType::DimmableLight, &state, json!({"bri": 0})).unwrap();
        assert_eq!(down.change_direction, Some(-1));
        assert!(!down.on);

        let same = run(DeviceType::DimmableLight, &state, json!({"bri": 100})).unwrap();
        assert_eq!(same.change_direction, Some(0));
    }

    #[test]
    fn should_switch_from_every_scalar_shape() {
        let state = light();
        for payload in [json!(true), json!(1), json!("on"), json!("1"), json!({"on": true})] {
            let cmd = run(DeviceType::OnOffPlug, &state, payload).unwrap();
            assert_eq!(cmd.command, CommandKind::Switch);
            assert!(cmd.on);
        }
        for payload in [json!(false), json!(0), json!("off"), json!("0"), json!({"on": "off"})] {
            let cmd = run(DeviceType::OnOffPlug, &state, payload).unwrap();
            assert!(!cmd.on);
        }
    }

    #[test]
    fn should_reject_unrecognized_shapes() {
        let state = light();
        for payload in [json!(null), json!([true]), json!("maybe"), json!(7), json!({})] {
            assert!(run(DeviceType::DimmableLight, &state, payload).is_err());
        }
    }

    #[test]
    fn should_restore_full_brightness_when_switching_on_a_dark_light() {
        let mut state = light();
        state.bri = 0;
        let cmd = run(DeviceType::DimmableLight, &state, json!(true)).unwrap();
        assert_eq!(cmd.bri, MAX_BRI);
    }

    #[test]
    fn should_clamp_covering_position() {
        let state = DeviceState::initial(DeviceType::WindowCovering);
        let cmd = run(DeviceType::WindowCovering, &state, json!({"position": 150})).unwrap();
        assert_eq!(cmd.command, CommandKind::Position);
        assert_eq!(cmd.position, Some(100));
        assert_eq!(cmd.bri, MAX_BRI);
    }

    #[test]
    fn should_track_covering_position_when_dimmed() {
        let state = DeviceState::initial(DeviceType::WindowCovering);
        let cmd = run(DeviceType::WindowCovering, &state, json!({"bri": 127})).unwrap();
        assert_eq!(cmd.command, CommandKind::Dim);
        assert_eq!(cmd.position, Some(50));
    }

    #[test]
    fn should_ignore_position_for_lights() {
        let result = run(DeviceType::DimmableLight, &light(), json!({"position": 40}));
        assert!(result.is_err());
    }

    #[test]
    fn should_store_sensor_temperature_verbatim() {
        let state = DeviceState::initial(DeviceType::TemperatureSensor);
        let cmd = run(DeviceType::TemperatureSensor, &state, json!({"temperature": -4.5})).unwrap();
        assert_eq!(cmd.command, CommandKind::Temperature);
        assert_eq!(cmd.temperature, Some(-4.5));
    }

    #[test]
    fn should_write_back_clamped_values() {
        let mut state = light();
        let cmd = run(
            DeviceType::ExtendedColorLight,
            &state,
            json!({"hue": 70000, "sat": 300}),
        )
        .unwrap();
        state.apply(&cmd);
        assert_eq!(state.hue, Some(65535));
        assert_eq!(state.sat, Some(254));
    }

    #[test]
    fn should_round_trip_brightness_within_one_step() {
        for bri in 0..=MAX_BRI {
            let back = brightness_to_bri(f64::from(bri_to_brightness(bri)));
            assert!(back.abs_diff(bri) <= 1, "bri {bri} came back as {back}");
        }
    }

    #[test]
    fn should_convert_three_quarters_brightness_to_191() {
        assert_eq!(brightness_to_bri(75.0), 191);
        assert_eq!(bri_to_brightness(191), 75);
    }
}
