//! Arrays and strings as the host runtime hands them to the bridge.

use crate::memory::HostAllocation;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A typed, contiguous array owned by the host runtime.
///
/// The values are immutable and reference counted; cloning a `HostArray`
/// shares its storage. The shape is `(rows, columns)` in host terms, and the
/// values are stored column-major.
#[derive(Clone)]
pub struct HostArray<T> {
    values: Arc<Vec<T>>,
    shape: [usize; 2],
}

impl<T> HostArray<T>
where
    T: Send + Sync + std::panic::RefUnwindSafe + 'static,
{
    /// Creates a row vector (`1 x len`), which is how hosts usually pass data in.
    #[must_use]
    pub fn from_vec(values: Vec<T>) -> Self {
        let shape = [1, values.len()];
        Self {
            values: Arc::new(values),
            shape,
        }
    }

    /// Creates a column vector (`len x 1`).
    #[must_use]
    pub fn column(values: Vec<T>) -> Self {
        let shape = [values.len(), 1];
        Self {
            values: Arc::new(values),
            shape,
        }
    }

    /// Returns the allocation backing this array, for buffers that borrow it.
    pub(crate) fn allocation(&self) -> Arc<dyn HostAllocation> {
        self.values.clone()
    }
}

impl<T> HostArray<T> {
    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns `(rows, columns)`.
    #[must_use]
    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        self.values.as_slice()
    }

    /// Returns `true` if both arrays share the same storage.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }
}

impl HostArray<u8> {
    /// Creates a logical array, one byte per element.
    #[must_use]
    pub fn logical(values: &[bool]) -> Self {
        Self::from_vec(values.iter().map(|&v| u8::from(v)).collect())
    }
}

impl<T> Default for HostArray<T>
where
    T: Send + Sync + std::panic::RefUnwindSafe + 'static,
{
    fn default() -> Self {
        Self::from_vec(Vec::new())
    }
}

impl<T> Deref for HostArray<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: fmt::Debug> fmt::Debug for HostArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HostArray<{}x{}>", self.shape[0], self.shape[1])?;
        f.debug_list().entries(self.values.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for HostArray<T> {
    /// Two host arrays are equal if they hold the same values, regardless of
    /// shape.
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<'de, T> Deserialize<'de> for HostArray<T>
where
    T: Deserialize<'de> + Send + Sync + std::panic::RefUnwindSafe + 'static,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Self::from_vec)
    }
}

/// A string in the host's native encoding (UTF-16 code units).
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HostString {
    units: Vec<u16>,
}

impl HostString {
    #[must_use]
    pub fn from_utf16_units(units: Vec<u16>) -> Self {
        Self { units }
    }

    #[must_use]
    pub fn units(&self) -> &[u16] {
        &self.units
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl From<&str> for HostString {
    fn from(s: &str) -> Self {
        Self {
            units: s.encode_utf16().collect(),
        }
    }
}

impl fmt::Debug for HostString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", String::from_utf16_lossy(&self.units))
    }
}

impl<'de> Deserialize<'de> for HostString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}
