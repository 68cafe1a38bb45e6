//! Folding remote snapshots into the cached zones.
//!
//! Merges are keyed on zone id and only touch the fields the snapshot
//! carries. Each zone is written under its own lock, so readers see either
//! the previous or the new values, never a mix.

use crate::model::{Zone, ZoneState};
use crate::models::evohome::{Schedule, ZoneStatus};
use log::trace;
use std::sync::Arc;

/// Overwrite temperature and setpoint of every zone the snapshot reports.
///
/// Zones missing from `remote` keep their cached values: the service omits
/// zones it temporarily cannot reach. Returns the number of zones updated.
pub fn merge_temperature(zones: &[Arc<Zone>], remote: &[ZoneStatus]) -> usize {
    let mut updated = 0;
    for zone in zones {
        let Some(status) = remote.iter().find(|r| &r.zone_id == zone.id()) else {
            trace!("Merge: zone {} not in status snapshot", zone.id());
            continue;
        };
        let next = ZoneState {
            temperature_status: status.temperature_status,
            heat_setpoint_status: status.heat_setpoint_status.clone(),
        };
        *zone.state.write() = next;
        updated += 1;
    }
    updated
}

/// Replace the zone's schedule wholesale.
pub fn merge_schedule(zone: &Zone, remote: Schedule) {
    *zone.schedule.write() = remote;
}
