//! Bootstrap once, then keep the tracked control system fresh in the background.

use crate::commands;
use crate::config::SyncConfig;
use crate::error::{EvohomeError, Result};
use crate::model::{ControlSystem, InstallationModel, SystemSelector, Zone};
use crate::services::{schedule, temperature};
use crate::shutdown::Shutdown;
use crate::source::RemoteDataSource;
use chrono::{DateTime, Utc};
use log::{error, info};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub struct Engine {
    source: Arc<dyn RemoteDataSource>,
    model: Arc<InstallationModel>,
    system: Arc<ControlSystem>,
    shutdown: Shutdown,
    workers: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Bootstrap the model and start both sync threads.
    ///
    /// Bootstrap errors are returned before any thread is spawned.
    pub fn start(source: Arc<dyn RemoteDataSource>, selector: SystemSelector, config: SyncConfig) -> Result<Self> {
        let model = Arc::new(InstallationModel::bootstrap(source.as_ref(), selector)?);
        let system = Arc::clone(model.control_system()?);
        let location_id = model.location()?.id.clone();
        let shutdown = Shutdown::new();

        let temperature_worker = {
            let (source, system, config, shutdown) =
                (Arc::clone(&source), Arc::clone(&system), config.clone(), shutdown.clone());
            thread::spawn(move || temperature::run_loop(source, location_id, system, &config, shutdown))
        };
        let schedule_worker = {
            let (source, system, shutdown) = (Arc::clone(&source), Arc::clone(&system), shutdown.clone());
            thread::spawn(move || schedule::run_loop(source, system, &config, shutdown))
        };
        info!("Engine started for control system {}", system.id());

        Ok(Engine {
            source,
            model,
            system,
            shutdown,
            workers: vec![temperature_worker, schedule_worker],
        })
    }

    pub fn model(&self) -> &InstallationModel {
        &self.model
    }

    /// The control system kept in sync, for zone lookups and listings.
    pub fn control_system(&self) -> &Arc<ControlSystem> {
        &self.system
    }

    fn zone_named(&self, name: &str) -> Result<Arc<Zone>> {
        self.system
            .zone(name)
            .ok_or_else(|| EvohomeError::NotFound(format!("zone named {:?} in control system {}", name, self.system.id())))
    }

    /// Override the named zone's setpoint, permanently when `until` is `None`.
    pub fn set_temperature(&self, zone_name: &str, temperature: f64, until: Option<DateTime<Utc>>) -> Result<()> {
        let zone = self.zone_named(zone_name)?;
        commands::set_temperature(self.source.as_ref(), &zone, temperature, until)
    }

    pub fn cancel_override(&self, zone_name: &str) -> Result<()> {
        let zone = self.zone_named(zone_name)?;
        commands::cancel_override(self.source.as_ref(), &zone)
    }

    /// True while both sync threads are alive. A thread that panicked ends
    /// its loop for good, so callers can use this to notice a dead engine.
    pub fn is_running(&self) -> bool {
        !self.shutdown.is_triggered() && self.workers.iter().all(|w| !w.is_finished())
    }

    /// Stop both sync threads and wait for them to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.shutdown.trigger();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("Sync thread panicked before shutdown");
            }
        }
        info!("Engine stopped");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ZoneState;
    use crate::models::evohome::{
        Account, DailySchedule, DayOfWeek, HeatSetpointRequest, HeatSetpointStatus, Installation, LocationId,
        Schedule, SetpointMode, SwitchPoint, SystemId, TemperatureStatus, UserId, ZoneId, ZoneStatus,
    };
    use crate::testing::FakeSource;
    use chrono::NaiveTime;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{Duration, Instant};

    fn fast() -> SyncConfig {
        SyncConfig {
            temperature_interval: Duration::from_millis(2),
            schedule_interval: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
        }
    }

    fn slow() -> SyncConfig {
        SyncConfig {
            temperature_interval: Duration::from_secs(60),
            schedule_interval: Duration::from_secs(60),
            max_backoff: Duration::from_secs(60),
        }
    }

    fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !cond() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn loops_fill_the_model_after_bootstrap() {
        let source = Arc::new(FakeSource::from_fixtures());
        let engine = Engine::start(source.clone(), SystemSelector::default(), fast()).unwrap();
        let system = engine.control_system();

        wait_until("temperatures", || system.zone_names_with_override() == ["Kitchen"]);
        wait_until("schedules", || {
            system.zones().iter().all(|z| z.schedule() == source.default_schedule)
        });
        assert_eq!(system.zone("Living Room").unwrap().temperature_status().temperature, 21.5);
        assert_eq!(engine.model().account().user_id, UserId("2263181".into()));
        assert_eq!(engine.model().installations().len(), 1);
        assert_eq!(engine.model().selector(), SystemSelector::default());
        assert!(engine.is_running());
        engine.shutdown();
    }

    #[test]
    fn failed_bootstrap_starts_no_loops() {
        let source = Arc::new(FakeSource::from_fixtures());
        source.installations.lock().clear();

        let err = Engine::start(source.clone(), SystemSelector::default(), fast()).err().unwrap();
        assert!(matches!(err, EvohomeError::NotInitialized(_)), "{err}");
        thread::sleep(Duration::from_millis(20));
        assert_eq!(source.count("get_zone_statuses"), 0);
        assert_eq!(source.count("get_zone_schedule"), 0);
    }

    #[test]
    fn loops_keep_running_through_failures() {
        let source = Arc::new(FakeSource::from_fixtures());
        for _ in 0..3 {
            source.fail_next("get_zone_statuses", EvohomeError::transport("connection refused"));
        }
        source.fail_next(
            "get_zone_statuses",
            EvohomeError::Decode {
                path: "gateways".into(),
                message: "truncated".into(),
            },
        );
        source.fail_next("get_zone_schedule", EvohomeError::Auth("token expired".into()));

        let engine = Engine::start(source.clone(), SystemSelector::default(), fast()).unwrap();
        let living = engine.control_system().zone("Living Room").unwrap();
        source.update_status("3432521", |z| z.temperature_status.temperature = 23.0);

        wait_until("recovered temperature", || living.temperature_status().temperature == 23.0);
        wait_until("recovered schedule", || living.schedule() == source.default_schedule);
        assert!(source.count("get_zone_statuses") >= 5);
        engine.shutdown();
    }

    #[test]
    fn shutdown_does_not_wait_for_the_interval() {
        let source = Arc::new(FakeSource::from_fixtures());
        let engine = Engine::start(source.clone(), SystemSelector::default(), slow()).unwrap();
        wait_until("first tick", || source.count("get_zone_statuses") == 1);

        let start = Instant::now();
        engine.shutdown();
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn overrides_by_name_go_straight_to_the_source() {
        let source = Arc::new(FakeSource::from_fixtures());
        let engine = Engine::start(source.clone(), SystemSelector::default(), slow()).unwrap();
        let kitchen = engine.control_system().zone("Kitchen").unwrap();
        wait_until("first tick", || kitchen.has_override());
        let cached = kitchen.state();

        engine.set_temperature("Kitchen", 18.5, None).unwrap();
        engine.cancel_override("Kitchen").unwrap();
        let err = engine.set_temperature("Garage", 18.5, None).unwrap_err();
        assert!(matches!(err, EvohomeError::NotFound(_)));

        let sent = source.setpoints.lock().clone();
        assert_eq!(
            sent,
            vec![
                (ZoneId("3432576".into()), HeatSetpointRequest::permanent(18.5)),
                (ZoneId("3432576".into()), HeatSetpointRequest::follow_schedule()),
            ]
        );
        assert_eq!(kitchen.state(), cached);
    }

    /// Fixture data, except that fetching a schedule panics.
    struct PanickingSchedules(FakeSource);

    impl RemoteDataSource for PanickingSchedules {
        fn get_account(&self) -> Result<Account> {
            self.0.get_account()
        }

        fn get_installations(&self, user_id: &UserId) -> Result<Vec<Installation>> {
            self.0.get_installations(user_id)
        }

        fn get_zone_statuses(&self, location_id: &LocationId, system_id: &SystemId) -> Result<Vec<ZoneStatus>> {
            self.0.get_zone_statuses(location_id, system_id)
        }

        fn get_zone_schedule(&self, zone_id: &ZoneId) -> Result<Schedule> {
            panic!("schedule for {zone_id} unavailable");
        }

        fn put_heat_setpoint(&self, zone_id: &ZoneId, request: &HeatSetpointRequest) -> Result<()> {
            self.0.put_heat_setpoint(zone_id, request)
        }
    }

    #[test]
    fn dead_sync_thread_stops_the_engine_running() {
        let source = Arc::new(PanickingSchedules(FakeSource::from_fixtures()));
        let engine = Engine::start(source, SystemSelector::default(), fast()).unwrap();
        wait_until("schedule thread to die", || !engine.is_running());
        engine.shutdown();
    }

    /// Serves a new, internally consistent snapshot on every fetch: tick k
    /// reports temperature k, target k and an override exactly when k is odd.
    struct TickingSource {
        inner: FakeSource,
        tick: AtomicU64,
    }

    impl RemoteDataSource for TickingSource {
        fn get_account(&self) -> Result<Account> {
            self.inner.get_account()
        }

        fn get_installations(&self, user_id: &UserId) -> Result<Vec<Installation>> {
            self.inner.get_installations(user_id)
        }

        fn get_zone_statuses(&self, location_id: &LocationId, system_id: &SystemId) -> Result<Vec<ZoneStatus>> {
            let k = self.tick.fetch_add(1, Ordering::SeqCst) + 1;
            let mut zones = self.inner.get_zone_statuses(location_id, system_id)?;
            for z in &mut zones {
                z.temperature_status = TemperatureStatus {
                    is_available: true,
                    temperature: k as f64,
                };
                z.heat_setpoint_status = HeatSetpointStatus {
                    target_temperature: k as f64,
                    setpoint_mode: if k % 2 == 1 {
                        SetpointMode::PermanentOverride
                    } else {
                        SetpointMode::FollowSchedule
                    },
                    until: None,
                };
            }
            Ok(zones)
        }

        fn get_zone_schedule(&self, _zone_id: &ZoneId) -> Result<Schedule> {
            let k = self.tick.load(Ordering::SeqCst) as f64;
            Ok(Schedule {
                daily_schedules: vec![DailySchedule {
                    day_of_week: DayOfWeek::Monday,
                    switch_points: vec![
                        SwitchPoint {
                            temperature: k,
                            time_of_day: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
                        },
                        SwitchPoint {
                            temperature: k,
                            time_of_day: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
                        },
                    ],
                }],
            })
        }

        fn put_heat_setpoint(&self, zone_id: &ZoneId, request: &HeatSetpointRequest) -> Result<()> {
            self.inner.put_heat_setpoint(zone_id, request)
        }
    }

    fn assert_consistent(state: &ZoneState) {
        let hs = &state.heat_setpoint_status;
        if hs.target_temperature == 0.0 {
            assert_eq!(*state, ZoneState::default());
            return;
        }
        let k = hs.target_temperature as u64;
        assert_eq!(state.temperature_status.temperature, hs.target_temperature, "{state:?}");
        assert_eq!(hs.setpoint_mode.is_override(), k % 2 == 1, "{state:?}");
    }

    #[test]
    fn concurrent_readers_only_see_whole_ticks() {
        let source = Arc::new(TickingSource {
            inner: FakeSource::from_fixtures(),
            tick: AtomicU64::new(0),
        });
        let config = SyncConfig {
            temperature_interval: Duration::from_micros(100),
            schedule_interval: Duration::from_micros(100),
            max_backoff: Duration::from_millis(1),
        };
        let engine = Engine::start(source.clone(), SystemSelector::default(), config).unwrap();

        let readers: Vec<_> = (0..8)
            .map(|i| {
                let system = Arc::clone(engine.control_system());
                thread::spawn(move || {
                    let deadline = Instant::now() + Duration::from_millis(300);
                    let mut reads = 0u64;
                    while Instant::now() < deadline {
                        let zone = match i % 2 {
                            0 => system.zone("Kitchen").unwrap(),
                            _ => system.zones_map()["Bedroom"].clone(),
                        };
                        assert_consistent(&zone.state());
                        let schedule = zone.schedule();
                        if let Some(day) = schedule.daily_schedules.first() {
                            assert_eq!(day.switch_points[0].temperature, day.switch_points[1].temperature);
                        }
                        reads += 1;
                    }
                    reads
                })
            })
            .collect();

        let total: u64 = readers.into_iter().map(|r| r.join().unwrap()).sum();
        assert!(total > 0);
        assert!(source.tick.load(Ordering::SeqCst) > 1);
        engine.shutdown();
    }
}
