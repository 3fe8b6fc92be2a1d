//! Device configuration, loaded from TOML via `serdeconv` (mirroring `GameConfig` in the
//! original game server's core crate).

use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use cip_objects::IdentityConfig;
use cip_support::logging::LoggingConfig;

pub const DEFAULT_TCP_PORT: u16 = 0xAF12; // 44818, the registered EtherNet/IP port
pub const DEFAULT_TICK_MILLIS: u32 = 10;

#[derive(Serialize, Deserialize)]
pub struct NetworkConfig {
    pub bind_address: String,
    pub tcp_port: u16,
    pub broadcast_port: u16,
    pub tick_millis: u32,
}

impl Default for NetworkConfig {
    fn default() -> NetworkConfig {
        NetworkConfig {
            bind_address: String::from("0.0.0.0"),
            tcp_port: DEFAULT_TCP_PORT,
            broadcast_port: DEFAULT_TCP_PORT,
            tick_millis: DEFAULT_TICK_MILLIS,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct Identity {
    pub vendor_id: u16,
    pub device_type: u16,
    pub product_code: u16,
    pub revision_major: u8,
    pub revision_minor: u8,
    pub serial_number: u32,
    pub product_name: String,
}

impl Default for Identity {
    fn default() -> Identity {
        let defaults = IdentityConfig::default();
        Identity {
            vendor_id: defaults.vendor_id,
            device_type: defaults.device_type,
            product_code: defaults.product_code,
            revision_major: defaults.revision.0,
            revision_minor: defaults.revision.1,
            serial_number: defaults.serial_number,
            product_name: defaults.product_name,
        }
    }
}

impl From<&Identity> for IdentityConfig {
    fn from(identity: &Identity) -> IdentityConfig {
        IdentityConfig {
            vendor_id: identity.vendor_id,
            device_type: identity.device_type,
            product_code: identity.product_code,
            revision: (identity.revision_major, identity.revision_minor),
            serial_number: identity.serial_number,
            product_name: identity.product_name.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Default)]
pub struct DeviceConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub identity: Identity,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DeviceConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> DeviceConfig {
        serdeconv::from_toml_file(path).expect("error loading device configuration file")
    }
}
