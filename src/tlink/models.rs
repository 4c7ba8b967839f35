//! Wire models for the TLINK cloud API
//!
//! Every field is optional so that a missing or `null` field is reported by
//! name instead of failing the whole document.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::sync::coerce::SensorReading;

/// A JSON scalar the API sends either as a number or as numeric text
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

/// `i64` range as floats; the upper bound (2^63) is itself out of range
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

impl Scalar {
    pub fn as_text(&self) -> String {
        match self {
            Scalar::Int(v) => v.to_string(),
            Scalar::Float(v) => v.to_string(),
            Scalar::Bool(v) => v.to_string(),
            Scalar::Text(v) => v.clone(),
        }
    }

    pub fn as_i64(&self, field: &'static str) -> Result<i64, ValidationError> {
        let unparsable = || ValidationError::Unparsable {
            field,
            value: self.as_text(),
        };
        match self {
            Scalar::Int(v) => Ok(*v),
            Scalar::Float(v) if v.fract() == 0.0 && (I64_LOWER..I64_UPPER).contains(v) => {
                Ok(*v as i64)
            }
            Scalar::Float(_) => Err(unparsable()),
            Scalar::Bool(v) => Ok(i64::from(*v)),
            Scalar::Text(v) => v.trim().parse().map_err(|_| unparsable()),
        }
    }

    pub fn as_f64(&self, field: &'static str) -> Result<f64, ValidationError> {
        match self {
            Scalar::Int(v) => Ok(*v as f64),
            Scalar::Float(v) => Ok(*v),
            Scalar::Text(v) => v.trim().parse().map_err(|_| ValidationError::Unparsable {
                field,
                value: v.clone(),
            }),
            Scalar::Bool(_) => Err(ValidationError::Unparsable {
                field,
                value: self.as_text(),
            }),
        }
    }

    /// Node identifiers are unsigned 32-bit
    pub fn as_node_id(&self, field: &'static str) -> Result<u32, ValidationError> {
        let v = self.as_i64(field)?;
        u32::try_from(v).map_err(|_| ValidationError::Unparsable {
            field,
            value: v.to_string(),
        })
    }
}

fn required<'a, T>(value: &'a Option<T>, field: &'static str) -> Result<&'a T, ValidationError> {
    value.as_ref().ok_or(ValidationError::MissingField(field))
}

// ============================================================================
// Token exchange
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(rename = "userId", default)]
    pub user_id: Option<Scalar>,
    #[serde(default)]
    pub expires_in: Option<Scalar>,
    #[serde(default)]
    pub access_token: Option<String>,
}

// ============================================================================
// Device listing
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRequest {
    pub user_id: i64,
    pub curr_page: u32,
    pub page_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct DevicePage {
    #[serde(default)]
    pub flag: Option<Scalar>,
    #[serde(default)]
    pub msg: Option<Value>,
    #[serde(rename = "rowCount", default)]
    pub row_count: Option<Scalar>,
    #[serde(rename = "dataList", default)]
    pub data_list: Option<Value>,
}

/// Identity fields of a device record
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceIdentity {
    pub device_id: u32,
    pub device_no: String,
    pub device_name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeviceRecord {
    #[serde(default)]
    pub id: Option<Scalar>,
    #[serde(rename = "deviceName", default)]
    pub device_name: Option<Scalar>,
    #[serde(rename = "deviceNo", default)]
    pub device_no: Option<Scalar>,
    #[serde(rename = "sensorsList", default)]
    pub sensors_list: Option<Value>,
}

impl DeviceRecord {
    pub fn identity(&self) -> Result<DeviceIdentity, ValidationError> {
        let id = required(&self.id, "id")?;
        let device_name = required(&self.device_name, "deviceName")?;
        let device_no = required(&self.device_no, "deviceNo")?;

        Ok(DeviceIdentity {
            device_id: id.as_node_id("id")?,
            device_no: device_no.as_text(),
            device_name: device_name.as_text(),
        })
    }

    pub fn sensors(&self) -> Result<&[Value], ValidationError> {
        match self.sensors_list.as_ref() {
            None | Some(Value::Null) => Err(ValidationError::MissingField("sensorsList")),
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(_) => Err(ValidationError::Malformed(
                "sensorsList is not an array".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SensorRecord {
    #[serde(default)]
    pub id: Option<Scalar>,
    #[serde(rename = "sensorName", default)]
    pub sensor_name: Option<Scalar>,
    #[serde(rename = "sensorTypeId", default)]
    pub sensor_type_id: Option<Scalar>,
    #[serde(default)]
    pub value: Option<Scalar>,
    #[serde(rename = "decimalPlacse", alias = "decimalPlaces", default)]
    pub decimal_places: Option<Scalar>,
    #[serde(default)]
    pub switcher: Option<Scalar>,
    #[serde(rename = "isLine", default)]
    pub is_line: Option<Scalar>,
    #[serde(rename = "updateDate", default)]
    pub update_date: Option<Scalar>,
}

impl SensorRecord {
    /// Check the fields every sensor type needs and build the transient reading
    pub fn into_reading(self) -> Result<SensorReading, ValidationError> {
        let id = required(&self.id, "id")?;
        let sensor_name = required(&self.sensor_name, "sensorName")?;
        let is_line = required(&self.is_line, "isLine")?;
        let update_date = required(&self.update_date, "updateDate")?;
        let sensor_type_id = required(&self.sensor_type_id, "sensorTypeId")?;

        Ok(SensorReading {
            sensor_id: id.as_node_id("id")?,
            sensor_name: sensor_name.as_text(),
            type_discriminator: sensor_type_id.as_i64("sensorTypeId")?,
            online: is_line.as_i64("isLine")? > 0,
            update_timestamp: update_date.as_text(),
            raw_value: self.value,
            decimal_places: self.decimal_places,
            switcher: self.switcher,
        })
    }
}
