use super::{ArrayData, RawPtrBox};
use crate::bitmap::{self, Bitmap};
use crate::datatypes::{
    Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, PrimitiveType,
    TimestampType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use crate::error::Error;
use crate::handle::TypeHandle;
use crate::host::{HostArray, HostString};
use crate::memory::{self, Buffer};
use crate::temporal::{self, TemporalMeta};
use arrow::array::{make_array, ArrayData as ArrowArrayData, ArrayRef as ArrowArrayRef};
use arrow::error::ArrowError;
use serde::Deserialize;
use std::any::Any;
use std::fmt;
use std::ops::{Deref, Index};
use std::ptr::NonNull;
use std::slice;
use std::sync::Arc;
use tracing::debug;

/// Everything the host sends to build one array.
#[derive(Clone, Debug, Deserialize)]
#[serde(
    rename_all = "PascalCase",
    bound(deserialize = "N: crate::datatypes::NativeType + Deserialize<'de>")
)]
pub struct ArrayOptions<N> {
    /// The element values, borrowed by the array.
    pub data: HostArray<N>,
    /// One logical per element; empty if every element is valid.
    #[serde(default)]
    pub valid: HostArray<u8>,
    /// Required for temporal element kinds, ignored otherwise.
    #[serde(flatten)]
    pub meta: Option<TemporalMeta>,
}

impl<N: crate::datatypes::NativeType> ArrayOptions<N> {
    pub fn new(data: HostArray<N>, valid: HostArray<u8>) -> Self {
        Self {
            data,
            valid,
            meta: None,
        }
    }

    #[must_use]
    pub fn with_time_unit(
        mut self,
        time_unit: impl Into<HostString>,
        time_zone: impl Into<HostString>,
    ) -> Self {
        self.meta = Some(TemporalMeta::new(time_unit, time_zone));
        self
    }
}

/// An array whose elements are of primitive types.
pub struct PrimitiveArray<T: PrimitiveType> {
    data: Arc<ArrayData>,
    raw_values: RawPtrBox<T::Native>,
}

pub type Int8Array = PrimitiveArray<Int8Type>;
pub type Int16Array = PrimitiveArray<Int16Type>;
pub type Int32Array = PrimitiveArray<Int32Type>;
pub type Int64Array = PrimitiveArray<Int64Type>;
pub type UInt8Array = PrimitiveArray<UInt8Type>;
pub type UInt16Array = PrimitiveArray<UInt16Type>;
pub type UInt32Array = PrimitiveArray<UInt32Type>;
pub type UInt64Array = PrimitiveArray<UInt64Type>;
pub type Float32Array = PrimitiveArray<Float32Type>;
pub type Float64Array = PrimitiveArray<Float64Type>;
pub type TimestampArray = PrimitiveArray<TimestampType>;

impl<T: PrimitiveType> PrimitiveArray<T> {
    /// Builds an array over the host's values without copying them. Only the
    /// validity is converted, into a bitmap owned by the array.
    ///
    /// The host allocation stays alive as long as the array does.
    ///
    /// # Errors
    ///
    /// * `Error::MissingTemporalMetadata` if the element kind is temporal and
    ///   no time unit is given.
    /// * `Error::UnknownTimeUnit` or `Error::UnicodeConversion` if the
    ///   temporal metadata cannot be decoded.
    /// * `Error::BitPackValidity` if the validity cannot be packed.
    pub fn build(options: &ArrayOptions<T::Native>) -> Result<Self, Error> {
        let data_type = match T::DATA_TYPE {
            Some(data_type) => data_type,
            None => {
                let meta = options
                    .meta
                    .as_ref()
                    .ok_or(Error::MissingTemporalMetadata)?;
                temporal::resolve(&meta.time_unit, &meta.time_zone)?
            }
        };
        let len = options.data.len();
        let validity = bitmap::pack(&options.valid, len)?;
        let values = Buffer::from_host_array(&options.data);
        let data = ArrayData::new(data_type, len, validity, values);
        debug!(
            data_type = %data.data_type(),
            len,
            null_count = data.null_count(),
            "built array over host buffer"
        );
        Ok(Self::from_data(Arc::new(data)))
    }

    fn from_data(data: Arc<ArrayData>) -> Self {
        let raw_values = data.values().raw_data().cast::<T::Native>();
        Self {
            data,
            raw_values: RawPtrBox::new(raw_values),
        }
    }

    /// Copies the values into a new host array of `len x 1` elements.
    ///
    /// Values behind invalid elements are copied as stored. The result never
    /// shares memory with this array.
    ///
    /// # Errors
    ///
    /// Returns `Error::Allocation` if the host array cannot be allocated.
    /// Callers should treat this as fatal.
    pub fn extract(&self) -> Result<HostArray<T::Native>, Error> {
        let values = self.values();
        let mut out = memory::try_alloc_vec(values.len())?;
        out.extend_from_slice(values);
        debug!(
            len = values.len(),
            bytes = values.len() * T::element_kind().byte_width,
            "copied array into host buffer"
        );
        Ok(HostArray::column(out))
    }

    /// Unpacks the validity into a new `len x 1` host logical array.
    ///
    /// # Errors
    ///
    /// Returns `Error::Allocation` if the host array cannot be allocated.
    pub fn valid_to_host(&self) -> Result<HostArray<u8>, Error> {
        let mut out = memory::try_alloc_vec(self.len())?;
        out.extend(self.validity().iter().map(u8::from));
        Ok(HostArray::column(out))
    }

    /// Returns a handle to the element type.
    pub fn data_type(&self) -> TypeHandle {
        super::Array::data_type(self)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.data.null_count()
    }

    pub fn validity(&self) -> &Bitmap {
        self.data.validity()
    }

    /// # Panics
    ///
    /// Panics if `i` is out of bound.
    pub fn is_valid(&self, i: usize) -> bool {
        self.data.validity().is_set(i)
    }

    /// Returns the element at `i`, or `None` if it is invalid or out of bound.
    pub fn get(&self, i: usize) -> Option<T::Native> {
        if i < self.len() && self.is_valid(i) {
            Some(self[i])
        } else {
            None
        }
    }

    /// Returns all stored values, including those behind invalid elements.
    pub fn values(&self) -> &[T::Native] {
        if self.data.is_empty() {
            return &[];
        }
        unsafe { slice::from_raw_parts(self.raw_values.get(), self.data.len()) }
    }

    pub fn iter(&self) -> slice::Iter<T::Native> {
        self.values().iter()
    }

    /// Exposes this array to `arrow` without copying either buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if `arrow` rejects the array layout.
    pub fn to_arrow(&self) -> Result<ArrowArrayRef, ArrowError> {
        let data = ArrowArrayData::builder(self.data.data_type().into())
            .len(self.len())
            .add_buffer(share_with_arrow(self.data.values()))
            .null_bit_buffer(Some(share_with_arrow(self.data.validity().buffer())))
            .build()?;
        Ok(make_array(data))
    }
}

fn share_with_arrow(buffer: &Buffer) -> arrow::buffer::Buffer {
    match NonNull::new(buffer.raw_data() as *mut u8) {
        // The clone keeps the bytes alive, and they are never written to.
        Some(ptr) => unsafe {
            arrow::buffer::Buffer::from_custom_allocation(ptr, buffer.len(), Arc::new(buffer.clone()))
        },
        None => arrow::buffer::MutableBuffer::new(0).into(),
    }
}

impl<T: PrimitiveType> super::Array for PrimitiveArray<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data(&self) -> &ArrayData {
        &self.data
    }
}

impl<T: PrimitiveType> Clone for PrimitiveArray<T> {
    fn clone(&self) -> Self {
        Self::from_data(self.data.clone())
    }
}

impl<T: PrimitiveType> PartialEq for PrimitiveArray<T> {
    /// Arrays are equal if they have the same type, length and validity, and
    /// equal values wherever they are valid.
    fn eq(&self, other: &Self) -> bool {
        self.data.data_type() == other.data.data_type()
            && self.len() == other.len()
            && self.validity().iter().eq(other.validity().iter())
            && self
                .iter()
                .zip(other.iter())
                .enumerate()
                .all(|(i, (a, b))| !self.is_valid(i) || a == b)
    }
}

impl<T: PrimitiveType> fmt::Debug for PrimitiveArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PrimitiveArray<{}>", self.data.data_type())?;
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PrimitiveType> fmt::Display for PrimitiveArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "[]");
        }
        writeln!(f, "[")?;
        let last = self.len() - 1;
        for (i, v) in self.iter().enumerate() {
            write!(f, "  ")?;
            if self.is_valid(i) {
                T::format_value(*v, self.data.data_type(), f)?;
            } else {
                write!(f, "null")?;
            }
            if i < last {
                writeln!(f, ",")?;
            } else {
                writeln!(f)?;
            }
        }
        write!(f, "]")
    }
}

impl<T: PrimitiveType> Deref for PrimitiveArray<T> {
    type Target = [T::Native];

    fn deref(&self) -> &[T::Native] {
        self.values()
    }
}

impl<T: PrimitiveType> Index<usize> for PrimitiveArray<T> {
    type Output = T::Native;

    /// Returns a reference to an element, valid or not.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bound.
    fn index(&self, index: usize) -> &Self::Output {
        &self.values()[index]
    }
}

impl<'a, T: PrimitiveType> IntoIterator for &'a PrimitiveArray<T> {
    type Item = &'a T::Native;
    type IntoIter = slice::Iter<'a, T::Native>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;
    use crate::datatypes::{DataType, TimeUnit};
    use crate::memory::Origin;
    use arrow::array::Array as _;

    fn int64_options(data: Vec<i64>, valid: &[bool]) -> ArrayOptions<i64> {
        ArrayOptions::new(HostArray::from_vec(data), HostArray::logical(valid))
    }

    #[test]
    fn build_int64() {
        let options = int64_options(vec![1, 2, 3, 4, 5], &[true, true, false, true, true]);
        let array = Int64Array::build(&options).unwrap();
        assert_eq!(5, array.len());
        assert_eq!(1, array.null_count());
        assert_eq!(&[0b0001_1011], array.validity().as_bytes());
        assert_eq!(&[1, 2, 3, 4, 5], array.values());
        assert_eq!(Some(2), array.get(1));
        assert_eq!(None, array.get(2));
        assert_eq!(None, array.get(5));
        assert_eq!(3, array[2]);
    }

    #[test]
    fn build_does_not_copy_values() {
        let options = int64_options(vec![10, 20], &[true, true]);
        let array = Int64Array::build(&options).unwrap();
        assert_eq!(Origin::Host, array.data().values().origin());
        assert_eq!(options.data.as_slice().as_ptr(), array.values().as_ptr());
    }

    #[test]
    fn array_outlives_host_handle() {
        let options = int64_options(vec![7, 8, 9], &[true, false, true]);
        let array = Int64Array::build(&options).unwrap();
        drop(options);
        assert_eq!(&[7, 8, 9], array.values());
    }

    #[test]
    fn extract_copies() {
        let options = int64_options(vec![1, 2, 3, 4, 5], &[true, true, false, true, true]);
        let array = Int64Array::build(&options).unwrap();
        let out = array.extract().unwrap();
        assert_eq!(options.data, out);
        assert_eq!([5, 1], out.shape());
        assert!(!out.ptr_eq(&options.data));
        assert_ne!(out.as_slice().as_ptr(), array.values().as_ptr());
    }

    #[test]
    fn round_trip_keeps_invalid_payloads() {
        let data = vec![1.5_f64, f64::NAN, -0.0, f64::INFINITY];
        let options = ArrayOptions::new(
            HostArray::from_vec(data.clone()),
            HostArray::logical(&[false, false, true, false]),
        );
        let array = Float64Array::build(&options).unwrap();
        let out = array.extract().unwrap();
        let bits: Vec<u64> = out.iter().map(|v| v.to_bits()).collect();
        let expected: Vec<u64> = data.iter().map(|v| v.to_bits()).collect();
        assert_eq!(expected, bits);
    }

    #[test]
    fn round_trip_all_numeric_kinds() {
        let i8s = Int8Array::build(&ArrayOptions::new(
            HostArray::from_vec(vec![i8::MIN, 0, i8::MAX]),
            HostArray::default(),
        ))
        .unwrap();
        assert_eq!(&[i8::MIN, 0, i8::MAX], i8s.extract().unwrap().as_slice());
        assert_eq!(0, i8s.null_count());

        let u16s = UInt16Array::build(&ArrayOptions::new(
            HostArray::from_vec(vec![1_u16, u16::MAX]),
            HostArray::logical(&[false, true]),
        ))
        .unwrap();
        assert_eq!(&[1, u16::MAX], u16s.extract().unwrap().as_slice());
        assert_eq!(DataType::UInt16, *u16s.data_type().data_type());

        let f32s = Float32Array::build(&ArrayOptions::new(
            HostArray::from_vec(vec![0.25_f32]),
            HostArray::logical(&[true]),
        ))
        .unwrap();
        assert_eq!(&[0.25], f32s.extract().unwrap().as_slice());
    }

    #[test]
    fn build_empty() {
        let array = Int32Array::build(&ArrayOptions::new(
            HostArray::from_vec(Vec::new()),
            HostArray::default(),
        ))
        .unwrap();
        assert!(array.is_empty());
        assert_eq!(0, array.validity().num_bytes());
        assert!(array.extract().unwrap().is_empty());
        assert_eq!("[]", array.to_string());
    }

    #[test]
    fn bad_validity() {
        let options = ArrayOptions::new(
            HostArray::from_vec(vec![1_u32, 2, 3]),
            HostArray::from_vec(vec![1, 0]),
        );
        let err = UInt32Array::build(&options).unwrap_err();
        assert!(matches!(err, Error::BitPackValidity(_)));
        assert_eq!("colbridge:array:BitPackValidityError", err.id());

        let options = ArrayOptions::new(
            HostArray::from_vec(vec![1_u32]),
            HostArray::from_vec(vec![3]),
        );
        assert!(matches!(
            UInt32Array::build(&options),
            Err(Error::BitPackValidity(_))
        ));
    }

    #[test]
    fn build_timestamp() {
        let options = ArrayOptions::new(
            HostArray::from_vec(vec![1000_i64]),
            HostArray::logical(&[true]),
        )
        .with_time_unit("Millisecond", "UTC");
        let array = TimestampArray::build(&options).unwrap();
        let data_type = array.data_type();
        assert_eq!(Some(TimeUnit::Millisecond), data_type.time_unit());
        assert_eq!(Some("UTC"), data_type.time_zone());
        assert_eq!(&[1000], array.extract().unwrap().as_slice());
    }

    #[test]
    fn build_timestamp_zone_naive() {
        let options = ArrayOptions::new(HostArray::from_vec(vec![0_i64]), HostArray::default())
            .with_time_unit("Second", "");
        let array = TimestampArray::build(&options).unwrap();
        assert_eq!(Some(""), array.data_type().time_zone());
        assert_eq!("timestamp[s]", array.data_type().to_string());
    }

    #[test]
    fn build_timestamp_unknown_unit() {
        let options = ArrayOptions::new(HostArray::from_vec(vec![0_i64]), HostArray::default())
            .with_time_unit("Day", "UTC");
        let err = TimestampArray::build(&options).unwrap_err();
        assert!(matches!(err, Error::UnknownTimeUnit(_)));
    }

    #[test]
    fn build_timestamp_bad_zone() {
        let options = ArrayOptions::new(HostArray::from_vec(vec![0_i64]), HostArray::default())
            .with_time_unit("Second", HostString::from_utf16_units(vec![0xd800]));
        assert_eq!(
            Some(TemporalMeta::new(
                "Second",
                HostString::from_utf16_units(vec![0xd800])
            )),
            options.meta
        );
        let err = TimestampArray::build(&options).unwrap_err();
        assert!(matches!(err, Error::UnicodeConversion(_)));
    }

    #[test]
    fn build_timestamp_without_unit() {
        let options = ArrayOptions::new(HostArray::from_vec(vec![0_i64]), HostArray::default());
        let err = TimestampArray::build(&options).unwrap_err();
        assert!(matches!(err, Error::MissingTemporalMetadata));
    }

    #[test]
    fn numeric_kinds_ignore_time_unit() {
        let options = ArrayOptions::new(HostArray::from_vec(vec![0_i64]), HostArray::default())
            .with_time_unit("Day", "");
        let array = Int64Array::build(&options).unwrap();
        assert_eq!(DataType::Int64, *array.data_type().data_type());
    }

    #[test]
    fn valid_to_host() {
        let options = int64_options(vec![1, 2, 3], &[true, false, true]);
        let array = Int64Array::build(&options).unwrap();
        let valid = array.valid_to_host().unwrap();
        assert_eq!([3, 1], valid.shape());
        assert_eq!(&[1, 0, 1], valid.as_slice());
    }

    #[test]
    fn display() {
        let options = int64_options(vec![1, 2, 3], &[true, false, true]);
        let array = Int64Array::build(&options).unwrap();
        assert_eq!("[\n  1,\n  null,\n  3\n]", array.to_string());
        assert_eq!("PrimitiveArray<int64>[1, 2, 3]", format!("{:?}", array));

        let options = ArrayOptions::new(
            HostArray::from_vec(vec![1_577_836_801_000_i64]),
            HostArray::default(),
        )
        .with_time_unit("Millisecond", "UTC");
        let array = TimestampArray::build(&options).unwrap();
        assert_eq!("[\n  2020-01-01 00:00:01\n]", array.to_string());
    }

    #[test]
    fn equality_ignores_invalid_payloads() {
        let a = Int64Array::build(&int64_options(vec![1, 2, 3], &[true, false, true])).unwrap();
        let b = Int64Array::build(&int64_options(vec![1, 99, 3], &[true, false, true])).unwrap();
        let c = Int64Array::build(&int64_options(vec![1, 99, 3], &[true, true, true])).unwrap();
        assert_eq!(a, b);
        assert_ne!(b, c);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn options_from_json() {
        let options: ArrayOptions<i64> = serde_json::from_str(
            r#"{"Data": [1000, 2000], "Valid": [1, 0], "TimeUnit": "Microsecond", "TimeZone": "UTC"}"#,
        )
        .unwrap();
        let array = TimestampArray::build(&options).unwrap();
        assert_eq!(1, array.null_count());
        assert_eq!("timestamp[us, tz=UTC]", array.data_type().to_string());

        assert_eq!(
            Some(TemporalMeta::new("Microsecond", "UTC")),
            options.meta
        );

        let options: ArrayOptions<u8> = serde_json::from_str(r#"{"Data": [4, 5]}"#).unwrap();
        assert!(options.meta.is_none());
        let array = UInt8Array::build(&options).unwrap();
        assert_eq!(0, array.null_count());
    }

    #[test]
    fn options_from_json_without_unit() {
        let options: ArrayOptions<i64> =
            serde_json::from_str(r#"{"Data": [1], "TimeZone": "UTC"}"#).unwrap();
        assert!(options.meta.is_none());
        let err = TimestampArray::build(&options).unwrap_err();
        assert!(matches!(err, Error::MissingTemporalMetadata));
        assert_eq!("colbridge:type:MissingTemporalMetadataError", err.id());
    }

    #[test]
    fn to_arrow_shares_buffers() {
        let options = int64_options(vec![1, 2, 3], &[true, false, true]);
        let array = Int64Array::build(&options).unwrap();
        let arrow_array = array.to_arrow().unwrap();
        let ints = arrow_array
            .as_any()
            .downcast_ref::<arrow::array::Int64Array>()
            .unwrap();
        assert_eq!(3, ints.len());
        assert!(ints.is_null(1));
        assert_eq!(1, ints.null_count());
        assert_eq!(options.data.as_slice().as_ptr(), ints.values().as_ptr());

        drop(array);
        drop(options);
        assert_eq!(3, ints.value(2));
    }

    #[test]
    fn to_arrow_timestamp() {
        let options = ArrayOptions::new(HostArray::from_vec(vec![5_i64]), HostArray::default())
            .with_time_unit("Nanosecond", "UTC");
        let arrow_array = TimestampArray::build(&options).unwrap().to_arrow().unwrap();
        assert_eq!(
            &arrow::datatypes::DataType::Timestamp(
                arrow::datatypes::TimeUnit::Nanosecond,
                Some("UTC".into())
            ),
            arrow_array.data_type()
        );
    }

    #[test]
    fn to_arrow_empty() {
        let array = Float64Array::build(&ArrayOptions::new(
            HostArray::from_vec(Vec::new()),
            HostArray::default(),
        ))
        .unwrap();
        assert_eq!(0, array.to_arrow().unwrap().len());
    }

    #[test]
    fn dyn_array() {
        let array: crate::array::ArrayRef =
            Arc::new(Int64Array::build(&int64_options(vec![1, 2], &[false, true])).unwrap());
        assert_eq!(2, array.len());
        assert_eq!(1, array.null_count());
        assert_eq!("int64", array.data_type().to_string());
        assert!(array.as_any().downcast_ref::<Int64Array>().is_some());
    }
}
