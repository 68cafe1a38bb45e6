//! Wire models for the evohome EMEA v1 API.
//!
//! Scope: types only, no client code.
//!
//! Notes
//! - Field names follow the API's camelCase JSON keys.
//! - Objects the engine never reads (gateway info, capabilities) keep only the
//!   fields worth logging; unknown keys are ignored.
//! - Time-of-day values use `chrono::NaiveTime`, instants use `DateTime<Utc>`.

use chrono::{DateTime, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =====================
// Scalar ID newtype wrappers
// =====================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub String);

macro_rules! display_id {
    ($($t:ty),*) => {
        $(impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })*
    };
}

display_id!(UserId, LocationId, GatewayId, SystemId, ZoneId);

// =====================
// Account
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(rename = "firstname", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastname", default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub street_address: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

// =====================
// Installation tree (bootstrap snapshot)
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    pub location_info: LocationInfo,
    #[serde(default)]
    pub gateways: Vec<Gateway>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInfo {
    pub location_id: LocationId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub street_address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub time_zone: Option<TimeZone>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeZone {
    pub time_zone_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gateway {
    pub gateway_info: GatewayInfo,
    #[serde(default)]
    pub temperature_control_systems: Vec<ControlSystem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayInfo {
    pub gateway_id: GatewayId,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(rename = "isWiFi", default)]
    pub is_wifi: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlSystem {
    pub system_id: SystemId,
    pub model_type: String,
    #[serde(default)]
    pub zones: Vec<Zone>,
}

/// Zone as listed in the installation tree. Status fields are absent here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub zone_id: ZoneId,
    pub name: String,
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub zone_type: Option<String>,
}

// =====================
// Location status (temperature refresh snapshot)
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationStatus {
    pub location_id: LocationId,
    #[serde(default)]
    pub gateways: Vec<GatewayStatus>,
}

impl LocationStatus {
    /// Zone statuses of the control system with the given id, wherever it sits
    /// among the location's gateways.
    pub fn zones_of(&self, system_id: &SystemId) -> Option<&[ZoneStatus]> {
        self.gateways
            .iter()
            .flat_map(|g| g.temperature_control_systems.iter())
            .find(|s| &s.system_id == system_id)
            .map(|s| s.zones.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatus {
    pub gateway_id: GatewayId,
    #[serde(default)]
    pub temperature_control_systems: Vec<ControlSystemStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlSystemStatus {
    pub system_id: SystemId,
    #[serde(default)]
    pub zones: Vec<ZoneStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStatus {
    pub zone_id: ZoneId,
    #[serde(default)]
    pub name: Option<String>,
    pub temperature_status: TemperatureStatus,
    #[serde(rename = "heatSetpointStatus")]
    pub heat_setpoint_status: HeatSetpointStatus,
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureStatus {
    pub is_available: bool,
    /// Absent when the sensor is unavailable.
    #[serde(default)]
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatSetpointStatus {
    pub target_temperature: f64,
    #[serde(rename = "setpointMode")]
    pub setpoint_mode: SetpointMode,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
}

/// Setpoint mode as reported by the service.
///
/// Unrecognised strings are kept as `Other` so newer API modes survive a
/// round-trip and count as an override.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SetpointMode {
    #[default]
    FollowSchedule,
    PermanentOverride,
    TemporaryOverride,
    Other(String),
}

impl SetpointMode {
    pub fn is_override(&self) -> bool {
        !matches!(self, SetpointMode::FollowSchedule)
    }

    pub fn as_str(&self) -> &str {
        match self {
            SetpointMode::FollowSchedule => "FollowSchedule",
            SetpointMode::PermanentOverride => "PermanentOverride",
            SetpointMode::TemporaryOverride => "TemporaryOverride",
            SetpointMode::Other(s) => s,
        }
    }

    /// Numeric code used by the heat setpoint write endpoint.
    /// Modes the endpoint does not accept have none.
    pub fn wire_code(&self) -> Option<u8> {
        match self {
            SetpointMode::FollowSchedule => Some(FOLLOW_SCHEDULE_CODE),
            SetpointMode::PermanentOverride => Some(PERMANENT_OVERRIDE_CODE),
            SetpointMode::TemporaryOverride => Some(TEMPORARY_OVERRIDE_CODE),
            SetpointMode::Other(_) => None,
        }
    }
}

impl From<String> for SetpointMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "FollowSchedule" => SetpointMode::FollowSchedule,
            "PermanentOverride" => SetpointMode::PermanentOverride,
            "TemporaryOverride" => SetpointMode::TemporaryOverride,
            _ => SetpointMode::Other(value),
        }
    }
}

impl From<SetpointMode> for String {
    fn from(value: SetpointMode) -> Self {
        match value {
            SetpointMode::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for SetpointMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =====================
// Schedules
// =====================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(default)]
    pub daily_schedules: Vec<DailySchedule>,
}

impl Schedule {
    pub fn day(&self, day: DayOfWeek) -> Option<&DailySchedule> {
        self.daily_schedules.iter().find(|d| d.day_of_week == day)
    }

    /// The switch point in effect at `day`/`time`: the last one at or before
    /// `time` that day, otherwise the last one of the closest earlier day,
    /// which can be the same weekday a week back.
    pub fn active_switch_point(&self, day: DayOfWeek, time: NaiveTime) -> Option<&SwitchPoint> {
        if let Some(sp) = self
            .day(day)
            .and_then(|d| d.switch_points.iter().rev().find(|sp| sp.time_of_day <= time))
        {
            return Some(sp);
        }
        let mut prev = day;
        for _ in 0..7 {
            prev = prev.pred();
            if let Some(sp) = self.day(prev).and_then(|d| d.switch_points.last()) {
                return Some(sp);
            }
        }
        None
    }

    /// The first switch point strictly after `day`/`time`, searching up to a week ahead.
    pub fn next_switch_point(&self, day: DayOfWeek, time: NaiveTime) -> Option<(DayOfWeek, &SwitchPoint)> {
        if let Some(sp) = self
            .day(day)
            .and_then(|d| d.switch_points.iter().find(|sp| sp.time_of_day > time))
        {
            return Some((day, sp));
        }
        let mut next = day;
        for _ in 0..7 {
            next = next.succ();
            if let Some(sp) = self.day(next).and_then(|d| d.switch_points.first()) {
                return Some((next, sp));
            }
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySchedule {
    pub day_of_week: DayOfWeek,
    #[serde(rename = "switchpoints", default)]
    pub switch_points: Vec<SwitchPoint>,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchPoint {
    #[serde(alias = "heatSetpoint")]
    pub temperature: f64,
    pub time_of_day: NaiveTime,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn succ(self) -> Self {
        chrono::Weekday::from(self).succ().into()
    }

    pub fn pred(self) -> Self {
        chrono::Weekday::from(self).pred().into()
    }
}

impl From<chrono::Weekday> for DayOfWeek {
    fn from(value: chrono::Weekday) -> Self {
        match value {
            chrono::Weekday::Mon => DayOfWeek::Monday,
            chrono::Weekday::Tue => DayOfWeek::Tuesday,
            chrono::Weekday::Wed => DayOfWeek::Wednesday,
            chrono::Weekday::Thu => DayOfWeek::Thursday,
            chrono::Weekday::Fri => DayOfWeek::Friday,
            chrono::Weekday::Sat => DayOfWeek::Saturday,
            chrono::Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl From<DayOfWeek> for chrono::Weekday {
    fn from(value: DayOfWeek) -> Self {
        match value {
            DayOfWeek::Monday => chrono::Weekday::Mon,
            DayOfWeek::Tuesday => chrono::Weekday::Tue,
            DayOfWeek::Wednesday => chrono::Weekday::Wed,
            DayOfWeek::Thursday => chrono::Weekday::Thu,
            DayOfWeek::Friday => chrono::Weekday::Fri,
            DayOfWeek::Saturday => chrono::Weekday::Sat,
            DayOfWeek::Sunday => chrono::Weekday::Sun,
        }
    }
}

// =====================
// Heat setpoint write
// =====================

/// Body of `PUT temperatureZone/{id}/heatSetpoint`.
///
/// The endpoint takes PascalCase keys and a numeric mode, unlike the read side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatSetpointRequest {
    #[serde(rename = "HeatSetpointValue")]
    pub heat_setpoint_value: f64,
    #[serde(rename = "SetpointMode")]
    pub setpoint_mode: u8,
    #[serde(rename = "TimeUntil", default, skip_serializing_if = "Option::is_none")]
    pub time_until: Option<String>,
}

const FOLLOW_SCHEDULE_CODE: u8 = 0;
const PERMANENT_OVERRIDE_CODE: u8 = 1;
const TEMPORARY_OVERRIDE_CODE: u8 = 2;

impl HeatSetpointRequest {
    pub fn permanent(temperature: f64) -> Self {
        HeatSetpointRequest {
            heat_setpoint_value: temperature,
            setpoint_mode: PERMANENT_OVERRIDE_CODE,
            time_until: None,
        }
    }

    pub fn temporary(temperature: f64, until: DateTime<Utc>) -> Self {
        HeatSetpointRequest {
            heat_setpoint_value: temperature,
            setpoint_mode: TEMPORARY_OVERRIDE_CODE,
            time_until: Some(format_until(until)),
        }
    }

    pub fn follow_schedule() -> Self {
        HeatSetpointRequest {
            heat_setpoint_value: 0.0,
            setpoint_mode: FOLLOW_SCHEDULE_CODE,
            time_until: None,
        }
    }
}

/// `YYYY-MM-DDTHH:MM:SSZ`, sub-second precision dropped.
pub fn format_until(until: DateTime<Utc>) -> String {
    until.to_rfc3339_opts(SecondsFormat::Secs, true)
}
