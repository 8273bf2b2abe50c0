mod data;
mod primitive;

pub use data::ArrayData;
pub use primitive::{
    ArrayOptions, Float32Array, Float64Array, Int16Array, Int32Array, Int64Array, Int8Array,
    PrimitiveArray, TimestampArray, UInt16Array, UInt32Array, UInt64Array, UInt8Array,
};

use crate::handle::TypeHandle;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A dynamically-typed array.
pub trait Array: fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn data(&self) -> &ArrayData;

    /// Returns the number of elements, valid or not.
    fn len(&self) -> usize {
        self.data().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn null_count(&self) -> usize {
        self.data().null_count()
    }

    /// Returns a handle to the type of the elements.
    fn data_type(&self) -> TypeHandle {
        TypeHandle::new(self.data().data_type_ref().clone())
    }
}

pub type ArrayRef = Arc<dyn Array>;

struct RawPtrBox<T> {
    inner: *const T,
}

impl<T> RawPtrBox<T> {
    fn new(inner: *const T) -> Self {
        Self { inner }
    }

    fn get(&self) -> *const T {
        self.inner
    }
}

unsafe impl<T> Send for RawPtrBox<T> {}
unsafe impl<T> Sync for RawPtrBox<T> {}
