//! Read accessors over the tracked control system.
//!
//! Lookups hand out the live `Arc<Zone>` held by the model, so a caller that
//! keeps a handle sees every later merge.

use crate::error::{EvohomeError, Result};
use crate::model::{ControlSystem, Zone};
use crate::models::evohome::ZoneId;
use std::collections::HashMap;
use std::sync::Arc;

impl ControlSystem {
    /// First zone with this name. Duplicate names shadow later zones.
    pub fn zone(&self, name: &str) -> Option<Arc<Zone>> {
        self.zones.iter().find(|z| z.name() == name).cloned()
    }

    pub fn zone_by_id(&self, id: &ZoneId) -> Result<Arc<Zone>> {
        self.zones
            .iter()
            .find(|z| z.id() == id)
            .cloned()
            .ok_or_else(|| EvohomeError::NotFound(format!("zone id {id} in control system {}", self.id())))
    }

    pub fn zone_names(&self) -> Vec<String> {
        self.zones.iter().map(|z| z.name().to_string()).collect()
    }

    /// Names of zones not following their schedule, in zone order.
    pub fn zone_names_with_override(&self) -> Vec<String> {
        self.zones
            .iter()
            .filter(|z| z.has_override())
            .map(|z| z.name().to_string())
            .collect()
    }

    /// Name to zone. On a name collision the later zone wins.
    pub fn zones_map(&self) -> HashMap<String, Arc<Zone>> {
        self.zones.iter().map(|z| (z.name().to_string(), Arc::clone(z))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_temperature;
    use crate::models::evohome::{HeatSetpointStatus, SetpointMode, SystemId, TemperatureStatus, ZoneStatus};

    fn system(names: &[(&str, &str)]) -> ControlSystem {
        let zones = names
            .iter()
            .map(|(id, name)| Zone::new(ZoneId(id.to_string()), *name))
            .collect();
        ControlSystem::new(SystemId("sys".into()), "EvoTouch", zones)
    }

    fn with_mode(id: &str, mode: SetpointMode) -> ZoneStatus {
        ZoneStatus {
            zone_id: ZoneId(id.into()),
            name: None,
            temperature_status: TemperatureStatus {
                is_available: true,
                temperature: 20.0,
            },
            heat_setpoint_status: HeatSetpointStatus {
                target_temperature: 21.0,
                setpoint_mode: mode,
                until: None,
            },
        }
    }

    #[test]
    fn names_keep_zone_order() {
        let cs = system(&[("1", "Living Room"), ("2", "Kitchen"), ("3", "Bedroom")]);
        assert_eq!(cs.zone_names(), ["Living Room", "Kitchen", "Bedroom"]);
    }

    #[test]
    fn zone_lookup_returns_a_live_handle() {
        let cs = system(&[("1", "Living Room"), ("2", "Kitchen")]);
        let kitchen = cs.zone("Kitchen").expect("kitchen");
        assert!(cs.zone("Garage").is_none());

        merge_temperature(cs.zones(), &[with_mode("2", SetpointMode::PermanentOverride)]);

        assert!(kitchen.has_override());
        assert_eq!(kitchen.heat_setpoint_status().target_temperature, 21.0);
        assert!(Arc::ptr_eq(&kitchen, &cs.zones()[1]));
    }

    #[test]
    fn duplicate_names_resolve_to_first_for_lookup_and_last_for_map() {
        let cs = system(&[("1", "Bedroom"), ("2", "Bedroom")]);
        assert_eq!(cs.zone("Bedroom").unwrap().id(), &ZoneId("1".into()));
        let map = cs.zones_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map["Bedroom"].id(), &ZoneId("2".into()));
    }

    #[test]
    fn override_listing_treats_unknown_modes_as_overrides() {
        let cs = system(&[("1", "A"), ("2", "B"), ("3", "C"), ("4", "D")]);
        merge_temperature(
            cs.zones(),
            &[
                with_mode("1", SetpointMode::FollowSchedule),
                with_mode("2", SetpointMode::TemporaryOverride),
                with_mode("3", SetpointMode::Other("VacationHold".into())),
                with_mode("4", SetpointMode::PermanentOverride),
            ],
        );
        assert_eq!(cs.zone_names_with_override(), ["B", "C", "D"]);
    }

    #[test]
    fn zone_by_id_reports_misses() {
        let cs = system(&[("1", "A")]);
        assert_eq!(cs.zone_by_id(&ZoneId("1".into())).unwrap().name(), "A");
        let err = cs.zone_by_id(&ZoneId("9".into())).unwrap_err();
        assert!(matches!(err, EvohomeError::NotFound(_)));
    }
}
