//! Temperature refresh: fold the location status into the tracked zones.

use crate::config::SyncConfig;
use crate::error::Result;
use crate::merge::merge_temperature;
use crate::model::ControlSystem;
use crate::models::evohome::LocationId;
use crate::services::sync;
use crate::shutdown::Shutdown;
use crate::source::RemoteDataSource;
use log::debug;
use std::sync::Arc;

pub fn tick(
    source: &dyn RemoteDataSource,
    location_id: &LocationId,
    system: &ControlSystem,
    shutdown: &Shutdown,
) -> Result<()> {
    let statuses = source.get_zone_statuses(location_id, system.id())?;
    if shutdown.is_triggered() {
        return Ok(());
    }
    let updated = merge_temperature(system.zones(), &statuses);
    debug!(
        "Temperatures: merged {}/{} zone(s) of system {}",
        updated,
        system.zones().len(),
        system.id()
    );
    Ok(())
}

pub fn run_loop(
    source: Arc<dyn RemoteDataSource>,
    location_id: LocationId,
    system: Arc<ControlSystem>,
    config: &SyncConfig,
    shutdown: Shutdown,
) {
    sync::run_loop(
        "Temperatures",
        config.temperature_interval,
        config.max_backoff,
        &shutdown,
        || tick(source.as_ref(), &location_id, &system, &shutdown),
    );
}
