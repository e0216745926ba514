//! Collaborator wiring with an explicit capability contract.
//!
//! Every external collaborator (cloud client, serial link, downlink/OTA
//! executors) is bound to a role at startup. The trait it implements fixes
//! the call surface at compile time; on top of that each registrant declares
//! the operations it actually supports, and registration is rejected when the
//! declared set does not cover what the role requires. The runtime check
//! exists for dynamically wired collaborators (plugins, test doubles built
//! from partial stubs) where the trait alone cannot prove completeness.
//!
//! A failed registration leaves the previously registered collaborator in
//! place. Looking up a role that was never filled is a [`CoreError::NotRegistered`]
//! error rather than a silent no-op: it marks a wiring bug.

use std::sync::Arc;

use crate::cloud::{CloudClient, OtaExecutor, RawDataExecutor};
use crate::error::CoreError;
use crate::serial::SerialLink;

/// One operation a collaborator can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Connect,
    Publish,
    OtaCheck,
    OtaAction,
    DeviceReport,
    SerialRead,
    SerialWrite,
    RawData,
    Query,
    OtaPlan,
}

/// Logical roles a collaborator can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    CloudClient,
    SerialLink,
    RawDataExecutor,
    OtaExecutor,
}

impl Role {
    /// Operations a registrant must declare to fill this role.
    pub fn required(&self) -> &'static [Capability] {
        match self {
            Role::CloudClient => &[
                Capability::Connect,
                Capability::Publish,
                Capability::OtaCheck,
                Capability::OtaAction,
                Capability::DeviceReport,
            ],
            Role::SerialLink => &[Capability::SerialRead, Capability::SerialWrite],
            Role::RawDataExecutor => &[Capability::RawData, Capability::Query],
            Role::OtaExecutor => &[Capability::OtaPlan],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::CloudClient => "cloud-client",
            Role::SerialLink => "serial-link",
            Role::RawDataExecutor => "raw-data-executor",
            Role::OtaExecutor => "ota-executor",
        }
    }

    /// Parse a role name as used by dynamic wiring surfaces.
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        match name {
            "cloud-client" => Ok(Role::CloudClient),
            "serial-link" => Ok(Role::SerialLink),
            "raw-data-executor" => Ok(Role::RawDataExecutor),
            "ota-executor" => Ok(Role::OtaExecutor),
            other => Err(CoreError::UnknownRole(other.to_string())),
        }
    }
}

fn check_capabilities(
    role: Role,
    declared: &[Capability],
) -> Result<(), CoreError> {
    for cap in role.required() {
        if !declared.contains(cap) {
            return Err(CoreError::MissingCapability {
                role: role.name(),
                capability: *cap,
            });
        }
    }
    Ok(())
}

/// Role → collaborator bindings for one gateway process.
///
/// Mutated only during startup wiring; components hold it behind an `Arc`
/// afterwards and only read.
#[derive(Default)]
pub struct HandlerRegistry {
    cloud: Option<Arc<dyn CloudClient>>,
    serial: Option<Arc<dyn SerialLink>>,
    raw_data: Option<Arc<dyn RawDataExecutor>>,
    ota: Option<Arc<dyn OtaExecutor>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_cloud(&mut self, client: Arc<dyn CloudClient>) -> Result<(), CoreError> {
        check_capabilities(Role::CloudClient, client.capabilities())?;
        log::info!("registered cloud-client collaborator");
        self.cloud = Some(client);
        Ok(())
    }

    pub fn register_serial(&mut self, link: Arc<dyn SerialLink>) -> Result<(), CoreError> {
        check_capabilities(Role::SerialLink, link.capabilities())?;
        log::info!("registered serial-link collaborator");
        self.serial = Some(link);
        Ok(())
    }

    pub fn register_raw_data_executor(
        &mut self,
        executor: Arc<dyn RawDataExecutor>,
    ) -> Result<(), CoreError> {
        check_capabilities(Role::RawDataExecutor, executor.capabilities())?;
        log::info!("registered raw-data executor");
        self.raw_data = Some(executor);
        Ok(())
    }

    pub fn register_ota_executor(
        &mut self,
        executor: Arc<dyn OtaExecutor>,
    ) -> Result<(), CoreError> {
        check_capabilities(Role::OtaExecutor, executor.capabilities())?;
        log::info!("registered ota executor");
        self.ota = Some(executor);
        Ok(())
    }

    pub fn cloud(&self) -> Result<Arc<dyn CloudClient>, CoreError> {
        self.cloud
            .clone()
            .ok_or(CoreError::NotRegistered("cloud-client"))
    }

    pub fn serial(&self) -> Result<Arc<dyn SerialLink>, CoreError> {
        self.serial
            .clone()
            .ok_or(CoreError::NotRegistered("serial-link"))
    }

    pub fn raw_data_executor(&self) -> Result<Arc<dyn RawDataExecutor>, CoreError> {
        self.raw_data
            .clone()
            .ok_or(CoreError::NotRegistered("raw-data-executor"))
    }

    pub fn ota_executor(&self) -> Result<Arc<dyn OtaExecutor>, CoreError> {
        self.ota
            .clone()
            .ok_or(CoreError::NotRegistered("ota-executor"))
    }
}
