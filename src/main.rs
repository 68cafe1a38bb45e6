use chrono::{Datelike, Local};
use evohome_sync::client::{EvohomeClient, Session};
use evohome_sync::config::Config;
use evohome_sync::model::ControlSystem;
use evohome_sync::Engine;
use log::{error, info};
use std::sync::Arc;
use std::thread;

pub fn run() -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (temperature_interval={}s, schedule_interval={}s, request_timeout={}s, max_backoff={}s, system={}/{}/{})",
        cfg.sync.temperature_interval.as_secs(),
        cfg.sync.schedule_interval.as_secs(),
        cfg.request_timeout.as_secs(),
        cfg.sync.max_backoff.as_secs(),
        cfg.selector.installation,
        cfg.selector.gateway,
        cfg.selector.system
    );

    // 2) Authenticate
    let client = EvohomeClient::new(Session::new(&cfg.username, &cfg.password), cfg.request_timeout)
        .map_err(|e| format!("evohome auth failed (credentials invalid?): {}", e))?;

    // 3) Bootstrap and start the sync threads
    let engine = Engine::start(Arc::new(client), cfg.selector, cfg.sync.clone())
        .map_err(|e| format!("bootstrap failed: {}", e))?;
    let model = engine.model();
    let selector = model.selector();
    info!(
        "Account {} has {} installation(s); using installation {}, gateway {}, system {}",
        model.account().username,
        model.installations().len(),
        selector.installation,
        selector.gateway,
        selector.system
    );
    let system = Arc::clone(engine.control_system());
    info!(
        "Tracking {} zone(s): {}",
        system.zones().len(),
        system.zone_names().join(", ")
    );

    // 4) Periodic summary
    while engine.is_running() {
        thread::sleep(cfg.report_interval);
        report(&system);
    }
    Err("a sync thread stopped unexpectedly".to_string())
}

fn report(system: &ControlSystem) {
    let now = Local::now();
    for zone in system.zones() {
        let state = zone.state();
        let current = if state.temperature_status.is_available {
            format!("{:.1}C", state.temperature_status.temperature)
        } else {
            "n/a".to_string()
        };
        let setpoint = &state.heat_setpoint_status;
        let until = setpoint
            .until
            .map(|u| format!(" until {}", u.with_timezone(&Local).format("%a %H:%M")))
            .unwrap_or_default();
        let schedule = zone.schedule();
        let scheduled = schedule
            .active_switch_point(now.weekday().into(), now.time())
            .map(|sp| format!("{:.1}C", sp.temperature))
            .unwrap_or_else(|| "-".to_string());
        let next = schedule
            .next_switch_point(now.weekday().into(), now.time())
            .map(|(day, sp)| format!("{:?} {} -> {:.1}C", day, sp.time_of_day.format("%H:%M"), sp.temperature))
            .unwrap_or_else(|| "-".to_string());
        info!(
            "{}: {} (target {:.1}C, {}{}), scheduled {}, next {}",
            zone.name(),
            current,
            setpoint.target_temperature,
            setpoint.setpoint_mode,
            until,
            scheduled,
            next
        );
    }

    let overrides = system.zone_names_with_override();
    if !overrides.is_empty() {
        info!("Overrides active: {}", overrides.join(", "));
    }
}

fn main() {
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    info!(
        "evohome-sync {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run() {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
