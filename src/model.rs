//! In-memory mirror of the account's installation tree.
//!
//! The skeleton (ids, names, hierarchy) is built once from the bootstrap
//! snapshot and never resized. Each zone is a shared handle whose mutable
//! fields sit behind their own locks, so the sync loops can overwrite them in
//! place while callers keep reading.

use crate::error::{EvohomeError, Result};
use crate::models::evohome::{
    self, Account, GatewayId, HeatSetpointStatus, LocationId, Schedule, SystemId, TemperatureStatus, ZoneId,
};
use crate::source::RemoteDataSource;
use log::{debug, info};
use parking_lot::RwLock;
use std::sync::Arc;

/// Which control system the engine mirrors, by position in the installation tree.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SystemSelector {
    pub installation: usize,
    pub gateway: usize,
    pub system: usize,
}

impl SystemSelector {
    pub fn new(installation: usize, gateway: usize, system: usize) -> Self {
        SystemSelector {
            installation,
            gateway,
            system,
        }
    }
}

/// Temperature reading and setpoint of one zone, always read and written together.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ZoneState {
    pub temperature_status: TemperatureStatus,
    pub heat_setpoint_status: HeatSetpointStatus,
}

#[derive(Debug)]
pub struct Zone {
    id: ZoneId,
    name: String,
    model_type: Option<String>,
    zone_type: Option<String>,
    pub(crate) state: RwLock<ZoneState>,
    pub(crate) schedule: RwLock<Schedule>,
}

impl Zone {
    pub fn new(id: ZoneId, name: impl Into<String>) -> Self {
        Zone {
            id,
            name: name.into(),
            model_type: None,
            zone_type: None,
            state: RwLock::new(ZoneState::default()),
            schedule: RwLock::new(Schedule::default()),
        }
    }

    fn from_snapshot(zone: &evohome::Zone) -> Self {
        Zone {
            model_type: zone.model_type.clone(),
            zone_type: zone.zone_type.clone(),
            ..Zone::new(zone.zone_id.clone(), zone.name.clone())
        }
    }

    pub fn id(&self) -> &ZoneId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_type(&self) -> Option<&str> {
        self.model_type.as_deref()
    }

    pub fn zone_type(&self) -> Option<&str> {
        self.zone_type.as_deref()
    }

    /// Temperature and setpoint as of one merge.
    pub fn state(&self) -> ZoneState {
        self.state.read().clone()
    }

    pub fn temperature_status(&self) -> TemperatureStatus {
        self.state.read().temperature_status
    }

    pub fn heat_setpoint_status(&self) -> HeatSetpointStatus {
        self.state.read().heat_setpoint_status.clone()
    }

    pub fn has_override(&self) -> bool {
        self.state.read().heat_setpoint_status.setpoint_mode.is_override()
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule.read().clone()
    }
}

#[derive(Debug)]
pub struct ControlSystem {
    id: SystemId,
    model_type: String,
    pub(crate) zones: Vec<Arc<Zone>>,
}

impl ControlSystem {
    pub fn new(id: SystemId, model_type: impl Into<String>, zones: Vec<Zone>) -> Self {
        ControlSystem {
            id,
            model_type: model_type.into(),
            zones: zones.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn id(&self) -> &SystemId {
        &self.id
    }

    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    /// Zones in the order the service listed them at bootstrap.
    pub fn zones(&self) -> &[Arc<Zone>] {
        &self.zones
    }
}

#[derive(Debug)]
pub struct Gateway {
    pub id: GatewayId,
    pub mac: Option<String>,
    pub is_wifi: Option<bool>,
    pub control_systems: Vec<Arc<ControlSystem>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: LocationId,
    pub name: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
    pub time_zone: Option<String>,
}

#[derive(Debug)]
pub struct Installation {
    pub location: Location,
    pub gateways: Vec<Gateway>,
}

#[derive(Debug)]
pub struct InstallationModel {
    account: Account,
    installations: Vec<Installation>,
    selector: SystemSelector,
}

impl InstallationModel {
    /// Fetch the account and its installation tree, then pin the control
    /// system named by `selector` as the one to keep in sync.
    pub fn bootstrap(source: &dyn RemoteDataSource, selector: SystemSelector) -> Result<Self> {
        let account = source.get_account()?;
        info!("Bootstrap: account {} ({})", account.user_id, account.username);
        let installations = source.get_installations(&account.user_id)?;
        debug!("Bootstrap: fetched {} installation(s)", installations.len());
        Self::from_snapshot(account, installations, selector)
    }

    pub fn from_snapshot(
        account: Account,
        installations: Vec<evohome::Installation>,
        selector: SystemSelector,
    ) -> Result<Self> {
        let installations = installations.into_iter().map(build_installation).collect();
        let model = InstallationModel {
            account,
            installations,
            selector,
        };
        let system = model.control_system()?;
        info!(
            "Bootstrap: tracking control system {} ({}) with {} zone(s)",
            system.id(),
            system.model_type(),
            system.zones().len()
        );
        Ok(model)
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn installations(&self) -> &[Installation] {
        &self.installations
    }

    pub fn selector(&self) -> SystemSelector {
        self.selector
    }

    pub fn installation(&self) -> Result<&Installation> {
        self.installations.get(self.selector.installation).ok_or_else(|| {
            EvohomeError::NotInitialized(format!(
                "no installation at index {} ({} available)",
                self.selector.installation,
                self.installations.len()
            ))
        })
    }

    pub fn location(&self) -> Result<&Location> {
        self.installation().map(|i| &i.location)
    }

    /// The control system the sync loops keep fresh.
    pub fn control_system(&self) -> Result<&Arc<ControlSystem>> {
        let installation = self.installation()?;
        let gateway = installation.gateways.get(self.selector.gateway).ok_or_else(|| {
            EvohomeError::NotInitialized(format!(
                "location {} has no gateway at index {} ({} available)",
                installation.location.id,
                self.selector.gateway,
                installation.gateways.len()
            ))
        })?;
        gateway.control_systems.get(self.selector.system).ok_or_else(|| {
            EvohomeError::NotInitialized(format!(
                "gateway {} has no control system at index {} ({} available)",
                gateway.id,
                self.selector.system,
                gateway.control_systems.len()
            ))
        })
    }
}

fn build_installation(installation: evohome::Installation) -> Installation {
    let info = installation.location_info;
    Installation {
        location: Location {
            id: info.location_id,
            name: info.name,
            street_address: info.street_address,
            city: info.city,
            postcode: info.postcode,
            country: info.country,
            time_zone: info.time_zone.map(|tz| tz.time_zone_id),
        },
        gateways: installation
            .gateways
            .into_iter()
            .map(|g| Gateway {
                id: g.gateway_info.gateway_id,
                mac: g.gateway_info.mac,
                is_wifi: g.gateway_info.is_wifi,
                control_systems: g
                    .temperature_control_systems
                    .into_iter()
                    .map(|cs| {
                        let zones = cs.zones.iter().map(Zone::from_snapshot).collect();
                        Arc::new(ControlSystem::new(cs.system_id, cs.model_type, zones))
                    })
                    .collect(),
            })
            .collect(),
    }
}
