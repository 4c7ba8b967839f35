//! Sensor value coercion
//!
//! Turns a loosely typed sensor reading into one strongly typed scalar,
//! selected by the sensor type id:
//!
//! | type id  | needs                 | result                                   |
//! |----------|-----------------------|------------------------------------------|
//! | 1        | value, decimalPlacse  | `Float` if decimal places > 0, else `Integer` |
//! | 4, 6, 8  | value                 | `Text`                                   |
//! | 2, 5     | switcher              | `Boolean` (switcher > 0)                 |

use serde::Serialize;

use crate::error::ValidationError;
use crate::tlink::models::Scalar;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum TypedValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
}

/// Declared data type of a variable node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataType {
    Int64,
    Double,
    String,
    Boolean,
}

impl TypedValue {
    pub fn data_type(&self) -> DataType {
        match self {
            TypedValue::Integer(_) => DataType::Int64,
            TypedValue::Float(_) => DataType::Double,
            TypedValue::Text(_) => DataType::String,
            TypedValue::Boolean(_) => DataType::Boolean,
        }
    }
}

/// One sensor entry of a listing page, after the common fields were checked
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub sensor_id: u32,
    pub sensor_name: String,
    pub type_discriminator: i64,
    pub raw_value: Option<Scalar>,
    pub decimal_places: Option<Scalar>,
    pub switcher: Option<Scalar>,
    pub online: bool,
    pub update_timestamp: String,
}

pub fn coerce(reading: &SensorReading) -> Result<TypedValue, ValidationError> {
    match reading.type_discriminator {
        1 => {
            let raw = reading
                .raw_value
                .as_ref()
                .ok_or(ValidationError::MissingField("value"))?;
            let places = reading
                .decimal_places
                .as_ref()
                .ok_or(ValidationError::MissingField("decimalPlacse"))?
                .as_i64("decimalPlacse")?;

            if places > 0 {
                raw.as_f64("value").map(TypedValue::Float)
            } else {
                raw.as_i64("value").map(TypedValue::Integer)
            }
        }
        4 | 6 | 8 => reading
            .raw_value
            .as_ref()
            .map(|raw| TypedValue::Text(raw.as_text()))
            .ok_or(ValidationError::MissingField("value")),
        2 | 5 => {
            let switcher = reading
                .switcher
                .as_ref()
                .ok_or(ValidationError::MissingField("switcher"))?
                .as_i64("switcher")?;
            Ok(TypedValue::Boolean(switcher > 0))
        }
        other => Err(ValidationError::UnsupportedType(other)),
    }
}
