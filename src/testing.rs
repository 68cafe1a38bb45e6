//! In-memory `RemoteDataSource` backed by the JSON fixtures in `tests/data`.

use crate::error::{EvohomeError, Result};
use crate::models::evohome::{
    Account, HeatSetpointRequest, Installation, LocationId, LocationStatus, Schedule, SystemId, UserId, ZoneId,
    ZoneStatus,
};
use crate::source::RemoteDataSource;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

fn load<T: serde::de::DeserializeOwned>(name: &str) -> T {
    let json = std::fs::read_to_string(format!("tests/data/{name}")).expect("fixture present");
    serde_json::from_str(&json).expect("parse fixture")
}

pub(crate) struct FakeSource {
    pub account: Account,
    pub installations: Mutex<Vec<Installation>>,
    pub status: Mutex<LocationStatus>,
    pub schedules: Mutex<HashMap<ZoneId, Schedule>>,
    pub default_schedule: Schedule,
    pub setpoints: Mutex<Vec<(ZoneId, HeatSetpointRequest)>>,
    failures: Mutex<HashMap<&'static str, VecDeque<EvohomeError>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn from_fixtures() -> Self {
        FakeSource {
            account: load("user-account.json"),
            installations: Mutex::new(load("installation-info.json")),
            status: Mutex::new(load("location-status.json")),
            schedules: Mutex::new(HashMap::new()),
            default_schedule: load("zone-schedule.json"),
            setpoints: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make the next call to `method` fail with `err`. Queued failures are consumed in order.
    pub fn fail_next(&self, method: &'static str, err: EvohomeError) {
        self.failures.lock().entry(method).or_default().push_back(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.starts_with(prefix)).count()
    }

    /// Rewrite one zone's status in the location snapshot served by `get_zone_statuses`.
    pub fn update_status(&self, zone_id: &str, f: impl FnOnce(&mut ZoneStatus)) {
        let mut status = self.status.lock();
        let zone = status
            .gateways
            .iter_mut()
            .flat_map(|g| g.temperature_control_systems.iter_mut())
            .flat_map(|s| s.zones.iter_mut())
            .find(|z| z.zone_id.0 == zone_id)
            .expect("zone in fixture");
        f(zone);
    }

    fn enter(&self, method: &'static str, call: String) -> Result<()> {
        self.calls.lock().push(call);
        match self.failures.lock().get_mut(method).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl RemoteDataSource for FakeSource {
    fn get_account(&self) -> Result<Account> {
        self.enter("get_account", "get_account".into())?;
        Ok(self.account.clone())
    }

    fn get_installations(&self, user_id: &UserId) -> Result<Vec<Installation>> {
        self.enter("get_installations", format!("get_installations({user_id})"))?;
        Ok(self.installations.lock().clone())
    }

    fn get_zone_statuses(&self, location_id: &LocationId, system_id: &SystemId) -> Result<Vec<ZoneStatus>> {
        self.enter("get_zone_statuses", format!("get_zone_statuses({location_id})"))?;
        let status = self.status.lock();
        status
            .zones_of(system_id)
            .map(<[ZoneStatus]>::to_vec)
            .ok_or_else(|| EvohomeError::Decode {
                path: "gateways".into(),
                message: format!("control system {system_id} missing from status"),
            })
    }

    fn get_zone_schedule(&self, zone_id: &ZoneId) -> Result<Schedule> {
        self.enter("get_zone_schedule", format!("get_zone_schedule({zone_id})"))?;
        Ok(self
            .schedules
            .lock()
            .get(zone_id)
            .cloned()
            .unwrap_or_else(|| self.default_schedule.clone()))
    }

    fn put_heat_setpoint(&self, zone_id: &ZoneId, request: &HeatSetpointRequest) -> Result<()> {
        self.enter("put_heat_setpoint", format!("put_heat_setpoint({zone_id})"))?;
        self.setpoints.lock().push((zone_id.clone(), request.clone()));
        Ok(())
    }
}
