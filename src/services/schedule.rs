//! Schedule refresh: re-read every tracked zone's weekly schedule.

use crate::config::SyncConfig;
use crate::error::Result;
use crate::merge::merge_schedule;
use crate::model::ControlSystem;
use crate::services::sync;
use crate::shutdown::Shutdown;
use crate::source::RemoteDataSource;
use log::{debug, warn};
use std::sync::Arc;

/// Refresh each zone in order. A zone that fails is skipped so the others
/// still update; the first failure is reported once the pass completes.
pub fn tick(source: &dyn RemoteDataSource, system: &ControlSystem, shutdown: &Shutdown) -> Result<()> {
    let mut first_err = None;
    let mut refreshed = 0;

    for zone in system.zones() {
        if shutdown.is_triggered() {
            return Ok(());
        }
        match source.get_zone_schedule(zone.id()) {
            Ok(schedule) => {
                if shutdown.is_triggered() {
                    return Ok(());
                }
                merge_schedule(zone, schedule);
                refreshed += 1;
            }
            Err(e) => {
                warn!("Schedules: zone {} ({}) failed: {}", zone.name(), zone.id(), e);
                first_err.get_or_insert(e);
            }
        }
    }

    debug!("Schedules: refreshed {}/{} zone(s)", refreshed, system.zones().len());
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

pub fn run_loop(
    source: Arc<dyn RemoteDataSource>,
    system: Arc<ControlSystem>,
    config: &SyncConfig,
    shutdown: Shutdown,
) {
    sync::run_loop(
        "Schedules",
        config.schedule_interval,
        config.max_backoff,
        &shutdown,
        || tick(source.as_ref(), &system, &shutdown),
    );
}
