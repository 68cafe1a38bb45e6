//! Temperature overrides, written straight through to the service.
//!
//! Nothing here touches the cached zone: the confirmed state shows up with
//! the next temperature refresh. Failures are returned as-is and never
//! retried, since replaying a heating override needs the caller's say-so.

use crate::error::Result;
use crate::model::Zone;
use crate::models::evohome::HeatSetpointRequest;
use crate::source::RemoteDataSource;
use chrono::{DateTime, Utc};
use log::{info, warn};

/// Hold `temperature` until `until`, or indefinitely when `until` is `None`.
pub fn set_temperature(
    source: &dyn RemoteDataSource,
    zone: &Zone,
    temperature: f64,
    until: Option<DateTime<Utc>>,
) -> Result<()> {
    let request = match until {
        Some(until) => HeatSetpointRequest::temporary(temperature, until),
        None => HeatSetpointRequest::permanent(temperature),
    };
    send(source, zone, &request)
}

/// Return the zone to its schedule.
pub fn cancel_override(source: &dyn RemoteDataSource, zone: &Zone) -> Result<()> {
    send(source, zone, &HeatSetpointRequest::follow_schedule())
}

fn send(source: &dyn RemoteDataSource, zone: &Zone, request: &HeatSetpointRequest) -> Result<()> {
    match source.put_heat_setpoint(zone.id(), request) {
        Ok(()) => {
            info!(
                "Override: zone {} ({}) -> {} C, mode {}{}",
                zone.name(),
                zone.id(),
                request.heat_setpoint_value,
                request.setpoint_mode,
                request
                    .time_until
                    .as_deref()
                    .map(|u| format!(" until {u}"))
                    .unwrap_or_default()
            );
            Ok(())
        }
        Err(e) => {
            warn!("Override: zone {} ({}) rejected: {}", zone.name(), zone.id(), e);
            Err(e)
        }
    }
}
