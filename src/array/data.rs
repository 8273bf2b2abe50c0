use crate::bitmap::Bitmap;
use crate::datatypes::DataType;
use crate::memory::Buffer;
use crate::util::bit_util;
use std::sync::Arc;

/// A generic representation of array data, shared by the typed arrays built
/// on top of it. Immutable once constructed.
#[derive(PartialEq, Debug)]
pub struct ArrayData {
    data_type: Arc<DataType>,

    /// The number of elements in this array data
    len: usize,

    null_count: usize,

    /// One bit per element, owned by this array.
    validity: Bitmap,

    /// The element values. Usually borrowed from the host without copying.
    values: Buffer,
}

impl ArrayData {
    pub(crate) fn new(data_type: DataType, len: usize, validity: Bitmap, values: Buffer) -> Self {
        debug_assert_eq!(validity.len(), len);
        debug_assert_eq!(validity.num_bytes(), bit_util::bytes_for(len));
        debug_assert!(values.len() >= len * data_type.byte_width());
        let null_count = len - validity.count_set_bits();
        Self {
            data_type: Arc::new(data_type),
            len,
            null_count,
            validity,
            values,
        }
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub(crate) fn data_type_ref(&self) -> &Arc<DataType> {
        &self.data_type
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn null_count(&self) -> usize {
        self.null_count
    }

    pub fn validity(&self) -> &Bitmap {
        &self.validity
    }

    pub fn values(&self) -> &Buffer {
        &self.values
    }
}
