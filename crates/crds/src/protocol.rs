//! Device protocol configuration
//!
//! At most one of the protocol blocks is expected to be set.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opcua: Option<OpcUaConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modbus: Option<ModbusConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bluetooth: Option<BluetoothConfig>,
}

/// OPC-UA server connection
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct OpcUaConfig {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    /// Path to the password file on the edge node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_policy: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,

    /// Request timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct ModbusConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtu: Option<ModbusRtuConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp: Option<ModbusTcpConfig>,
}

/// Modbus over a serial line
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModbusRtuConfig {
    pub serial_port: String,
    #[serde(default)]
    pub baud_rate: i64,
    #[serde(default)]
    pub data_bits: i64,
    #[serde(default)]
    pub parity: String,
    #[serde(default)]
    pub stop_bits: i64,
    #[serde(rename = "slaveID", default)]
    pub slave_id: i64,
}

/// Modbus over TCP
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct ModbusTcpConfig {
    pub ip: String,
    #[serde(default)]
    pub port: i64,
    #[serde(rename = "slaveID", default)]
    pub slave_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct BluetoothConfig {
    #[serde(default)]
    pub mac_address: String,
}
