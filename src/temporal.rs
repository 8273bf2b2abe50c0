//! Decoding of time units and time zones sent by the host.

use crate::datatypes::{DataType, TimeUnit};
use crate::error::Error;
use crate::host::HostString;
use serde::Deserialize;
use std::str::FromStr;

/// Unit and zone of a temporal array, as sent by the host.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TemporalMeta {
    pub time_unit: HostString,
    #[serde(default)]
    pub time_zone: HostString,
}

impl TemporalMeta {
    pub fn new(time_unit: impl Into<HostString>, time_zone: impl Into<HostString>) -> Self {
        Self {
            time_unit: time_unit.into(),
            time_zone: time_zone.into(),
        }
    }
}

/// Builds a timestamp type from a unit tag and a time zone.
///
/// The zone is not checked against any time zone database; an empty zone
/// yields a zone-naive type.
///
/// # Errors
///
/// Returns `Error::UnknownTimeUnit` if `unit` is not exactly one of `Second`,
/// `Millisecond`, `Microsecond` or `Nanosecond`, and
/// `Error::UnicodeConversion` if `zone` is not valid UTF-16.
pub fn resolve(unit: &HostString, zone: &HostString) -> Result<DataType, Error> {
    let unit = time_unit_from_host(unit)?;
    let timezone = String::from_utf16(zone.units())?;
    Ok(DataType::Timestamp { unit, timezone })
}

fn time_unit_from_host(tag: &HostString) -> Result<TimeUnit, Error> {
    let tag = String::from_utf16(tag.units())
        .map_err(|_| Error::UnknownTimeUnit(String::from_utf16_lossy(tag.units())))?;
    TimeUnit::from_str(&tag).map_err(|_| Error::UnknownTimeUnit(tag))
}
