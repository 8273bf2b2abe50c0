//! Read-only handles over types and fields, as handed to the host.

use crate::datatypes::{DataType, Field, TimeUnit};
use std::fmt;
use std::sync::Arc;

/// A shared, immutable reference to a [`DataType`].
#[derive(Clone, Debug, PartialEq)]
pub struct TypeHandle {
    data_type: Arc<DataType>,
}

impl TypeHandle {
    #[must_use]
    pub fn new(data_type: Arc<DataType>) -> Self {
        Self { data_type }
    }

    #[must_use]
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Returns the shared type this handle wraps.
    #[must_use]
    pub fn inner(&self) -> Arc<DataType> {
        self.data_type.clone()
    }

    #[must_use]
    pub fn bit_width(&self) -> usize {
        self.data_type.bit_width()
    }

    /// Primitive and temporal types have no child fields.
    #[must_use]
    pub fn num_fields(&self) -> usize {
        0
    }

    #[must_use]
    pub fn time_unit(&self) -> Option<TimeUnit> {
        self.data_type.time_unit()
    }

    #[must_use]
    pub fn time_zone(&self) -> Option<&str> {
        self.data_type.time_zone()
    }
}

impl From<DataType> for TypeHandle {
    fn from(data_type: DataType) -> Self {
        Self::new(Arc::new(data_type))
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.data_type, f)
    }
}

/// A shared, immutable reference to a [`Field`].
#[derive(Clone, Debug, PartialEq)]
pub struct FieldHandle {
    field: Arc<Field>,
}

impl FieldHandle {
    #[must_use]
    pub fn new(field: Arc<Field>) -> Self {
        Self { field }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.field.name()
    }

    #[must_use]
    pub fn data_type(&self) -> TypeHandle {
        TypeHandle::from(self.field.data_type().clone())
    }

    #[must_use]
    pub fn inner(&self) -> Arc<Field> {
        self.field.clone()
    }
}

impl From<Field> for FieldHandle {
    fn from(field: Field) -> Self {
        Self::new(Arc::new(field))
    }
}

impl fmt::Display for FieldHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.field, f)
    }
}
