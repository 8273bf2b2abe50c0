use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::mem;
use std::panic::RefUnwindSafe;
use std::sync::Arc;
use strum_macros::{Display, EnumIter, EnumString};

/// Supported element types.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// A 64-bit count of `unit`s since the UNIX epoch. An empty `timezone`
    /// means the values are zone-naive.
    Timestamp { unit: TimeUnit, timezone: String },
}

impl DataType {
    /// Returns the number of bytes of one element.
    #[must_use]
    pub fn byte_width(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 | Self::Timestamp { .. } => 8,
        }
    }

    #[must_use]
    pub fn bit_width(&self) -> usize {
        self.byte_width() * 8
    }

    #[must_use]
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Timestamp { .. })
    }

    #[must_use]
    pub fn time_unit(&self) -> Option<TimeUnit> {
        match self {
            Self::Timestamp { unit, .. } => Some(*unit),
            _ => None,
        }
    }

    /// Returns the time zone of a temporal type; empty if zone-naive.
    #[must_use]
    pub fn time_zone(&self) -> Option<&str> {
        match self {
            Self::Timestamp { timezone, .. } => Some(timezone),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int8 => write!(f, "int8"),
            Self::Int16 => write!(f, "int16"),
            Self::Int32 => write!(f, "int32"),
            Self::Int64 => write!(f, "int64"),
            Self::UInt8 => write!(f, "uint8"),
            Self::UInt16 => write!(f, "uint16"),
            Self::UInt32 => write!(f, "uint32"),
            Self::UInt64 => write!(f, "uint64"),
            Self::Float32 => write!(f, "float"),
            Self::Float64 => write!(f, "double"),
            Self::Timestamp { unit, timezone } if timezone.is_empty() => {
                write!(f, "timestamp[{}]", unit.abbreviation())
            }
            Self::Timestamp { unit, timezone } => {
                write!(f, "timestamp[{}, tz={}]", unit.abbreviation(), timezone)
            }
        }
    }
}

impl From<&DataType> for arrow::datatypes::DataType {
    fn from(dt: &DataType) -> Self {
        match dt {
            DataType::Int8 => Self::Int8,
            DataType::Int16 => Self::Int16,
            DataType::Int32 => Self::Int32,
            DataType::Int64 => Self::Int64,
            DataType::UInt8 => Self::UInt8,
            DataType::UInt16 => Self::UInt16,
            DataType::UInt32 => Self::UInt32,
            DataType::UInt64 => Self::UInt64,
            DataType::Float32 => Self::Float32,
            DataType::Float64 => Self::Float64,
            DataType::Timestamp { unit, timezone } => {
                let tz = if timezone.is_empty() {
                    None
                } else {
                    Some(Arc::from(timezone.as_str()))
                };
                Self::Timestamp((*unit).into(), tz)
            }
        }
    }
}

/// The resolution of temporal values.
#[derive(
    Clone, Copy, Debug, Deserialize, Display, EnumIter, EnumString, Eq, Hash, PartialEq, Serialize,
)]
pub enum TimeUnit {
    Second,
    Millisecond,
    Microsecond,
    Nanosecond,
}

impl TimeUnit {
    /// Returns the short form used in type strings, e.g. `ms`.
    #[must_use]
    pub fn abbreviation(self) -> &'static str {
        match self {
            Self::Second => "s",
            Self::Millisecond => "ms",
            Self::Microsecond => "us",
            Self::Nanosecond => "ns",
        }
    }

    fn per_second(self) -> i64 {
        match self {
            Self::Second => 1,
            Self::Millisecond => 1_000,
            Self::Microsecond => 1_000_000,
            Self::Nanosecond => 1_000_000_000,
        }
    }

    /// Interprets `value` as a count of this unit since the UNIX epoch.
    ///
    /// Returns `None` if the instant is out of the representable range.
    #[must_use]
    pub fn to_datetime(self, value: i64) -> Option<NaiveDateTime> {
        let per_second = self.per_second();
        let secs = value.div_euclid(per_second);
        let nsecs = value.rem_euclid(per_second) * (1_000_000_000 / per_second);
        let nsecs = u32::try_from(nsecs).ok()?;
        DateTime::from_timestamp(secs, nsecs).map(|dt| dt.naive_utc())
    }
}

impl From<TimeUnit> for arrow::datatypes::TimeUnit {
    fn from(unit: TimeUnit) -> Self {
        match unit {
            TimeUnit::Second => Self::Second,
            TimeUnit::Millisecond => Self::Millisecond,
            TimeUnit::Microsecond => Self::Microsecond,
            TimeUnit::Nanosecond => Self::Nanosecond,
        }
    }
}

/// A named, typed column slot.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Field {
    name: String,
    data_type: DataType,
    nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.data_type)?;
        if !self.nullable {
            write!(f, " not null")?;
        }
        Ok(())
    }
}

impl From<&Field> for arrow::datatypes::Field {
    fn from(field: &Field) -> Self {
        Self::new(field.name(), field.data_type().into(), field.is_nullable())
    }
}

/// A Rust type that can be stored as one fixed-width element of an array.
pub trait NativeType:
    fmt::Debug + fmt::Display + Send + Sync + Copy + PartialEq + RefUnwindSafe + 'static
{
}

impl NativeType for i8 {}
impl NativeType for i16 {}
impl NativeType for i32 {}
impl NativeType for i64 {}
impl NativeType for u8 {}
impl NativeType for u16 {}
impl NativeType for u32 {}
impl NativeType for u64 {}
impl NativeType for f32 {}
impl NativeType for f64 {}

/// Layout of one element kind, as seen by the bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementKind {
    pub byte_width: usize,
    /// Temporal kinds take their unit and zone from the construction record.
    pub temporal: bool,
}

/// Trait indicating a primitive fixed-width element kind.
pub trait PrimitiveType: 'static {
    /// Corresponding Rust native type for the primitive type.
    type Native: NativeType;

    /// The data type of every array of this kind, or `None` if it depends on
    /// per-array temporal metadata.
    const DATA_TYPE: Option<DataType>;

    fn element_kind() -> ElementKind {
        ElementKind {
            byte_width: mem::size_of::<Self::Native>(),
            temporal: Self::DATA_TYPE.is_none(),
        }
    }

    /// Writes one element as it appears in an array's string form.
    fn format_value(
        value: Self::Native,
        _data_type: &DataType,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", value)
    }
}

macro_rules! make_type {
    ($name:ident, $native_ty:ty, $data_ty:expr) => {
        #[derive(Debug)]
        pub struct $name {}

        impl PrimitiveType for $name {
            type Native = $native_ty;
            const DATA_TYPE: Option<DataType> = Some($data_ty);
        }
    };
}

make_type!(Int8Type, i8, DataType::Int8);
make_type!(Int16Type, i16, DataType::Int16);
make_type!(Int32Type, i32, DataType::Int32);
make_type!(Int64Type, i64, DataType::Int64);
make_type!(UInt8Type, u8, DataType::UInt8);
make_type!(UInt16Type, u16, DataType::UInt16);
make_type!(UInt32Type, u32, DataType::UInt32);
make_type!(UInt64Type, u64, DataType::UInt64);
make_type!(Float32Type, f32, DataType::Float32);
make_type!(Float64Type, f64, DataType::Float64);

/// Timestamps, stored as `i64`, whose unit and zone are given per array.
#[derive(Debug)]
pub struct TimestampType {}

impl PrimitiveType for TimestampType {
    type Native = i64;
    const DATA_TYPE: Option<DataType> = None;

    fn format_value(value: i64, data_type: &DataType, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match data_type.time_unit().and_then(|unit| unit.to_datetime(value)) {
            Some(dt) => write!(f, "{}", dt),
            None => write!(f, "{}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn type_strings() {
        assert_eq!("int64", DataType::Int64.to_string());
        assert_eq!("double", DataType::Float64.to_string());
        assert_eq!("float", DataType::Float32.to_string());
        let naive = DataType::Timestamp {
            unit: TimeUnit::Second,
            timezone: String::new(),
        };
        assert_eq!("timestamp[s]", naive.to_string());
        let utc = DataType::Timestamp {
            unit: TimeUnit::Millisecond,
            timezone: "UTC".to_string(),
        };
        assert_eq!("timestamp[ms, tz=UTC]", utc.to_string());
    }

    #[test]
    fn time_unit_names() {
        for unit in TimeUnit::iter() {
            assert_eq!(Ok(unit), TimeUnit::from_str(&unit.to_string()));
        }
        assert!(TimeUnit::from_str("millisecond").is_err());
        assert!(TimeUnit::from_str("ms").is_err());
    }

    #[test]
    fn to_datetime() {
        let expected = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_milli_opt(0, 0, 1, 500)
            .unwrap();
        let secs = expected.and_utc().timestamp();
        assert_eq!(
            Some(expected),
            TimeUnit::Millisecond.to_datetime(secs * 1_000 + 500)
        );
        assert_eq!(
            Some(expected),
            TimeUnit::Nanosecond.to_datetime(secs * 1_000_000_000 + 500_000_000)
        );
        let before_epoch = TimeUnit::Microsecond.to_datetime(-1).unwrap();
        assert_eq!(
            NaiveDate::from_ymd_opt(1969, 12, 31)
                .unwrap()
                .and_hms_micro_opt(23, 59, 59, 999_999)
                .unwrap(),
            before_epoch
        );
        assert_eq!(None, TimeUnit::Second.to_datetime(i64::MAX));
    }

    #[test]
    fn widths() {
        assert_eq!(8, Int64Type::element_kind().byte_width);
        assert!(!Int64Type::element_kind().temporal);
        assert_eq!(2, UInt16Type::element_kind().byte_width);
        assert!(TimestampType::element_kind().temporal);
        assert_eq!(64, DataType::Float64.bit_width());
    }

    #[test]
    fn field_display() {
        let field = Field::new("ts", DataType::Int32, true);
        assert_eq!("ts: int32", field.to_string());
        let field = Field::new("id", DataType::UInt64, false);
        assert_eq!("id: uint64 not null", field.to_string());
    }

    #[test]
    fn to_arrow() {
        use arrow::datatypes as adt;
        let dt = DataType::Timestamp {
            unit: TimeUnit::Microsecond,
            timezone: "Asia/Seoul".to_string(),
        };
        assert_eq!(
            adt::DataType::Timestamp(adt::TimeUnit::Microsecond, Some("Asia/Seoul".into())),
            adt::DataType::from(&dt)
        );
        let naive = DataType::Timestamp {
            unit: TimeUnit::Second,
            timezone: String::new(),
        };
        assert_eq!(
            adt::DataType::Timestamp(adt::TimeUnit::Second, None),
            adt::DataType::from(&naive)
        );
        let field = adt::Field::from(&Field::new("x", DataType::Float32, false));
        assert_eq!("x", field.name());
        assert_eq!(&adt::DataType::Float32, field.data_type());
        assert!(!field.is_nullable());
    }
}
