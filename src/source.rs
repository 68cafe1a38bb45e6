//! The remote side of the engine as a trait, so the sync loops and the
//! override path can run against the HTTP client or an in-memory fake.

use crate::error::Result;
use crate::models::evohome::{
    Account, HeatSetpointRequest, Installation, LocationId, Schedule, SystemId, UserId, ZoneId, ZoneStatus,
};

pub trait RemoteDataSource: Send + Sync {
    fn get_account(&self) -> Result<Account>;

    /// Full installation tree, including control systems and zones.
    fn get_installations(&self, user_id: &UserId) -> Result<Vec<Installation>>;

    /// Temperature-bearing status of every zone in one control system.
    fn get_zone_statuses(&self, location_id: &LocationId, system_id: &SystemId) -> Result<Vec<ZoneStatus>>;

    fn get_zone_schedule(&self, zone_id: &ZoneId) -> Result<Schedule>;

    fn put_heat_setpoint(&self, zone_id: &ZoneId, request: &HeatSetpointRequest) -> Result<()>;
}
