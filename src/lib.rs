//! Moves typed numeric arrays between a host runtime and a columnar layout.
//!
//! Building an array borrows the host's value buffer without copying it and
//! packs the host's per-element validity into a bitmap. Extracting an array
//! always copies the values into a new host array.

pub mod array;
pub mod bitmap;
pub mod datatypes;
pub mod error;
pub mod handle;
pub mod host;
pub mod memory;
pub mod registry;
pub mod temporal;
mod util;

pub use arrow;
pub use array::{Array, ArrayData, ArrayOptions, ArrayRef, PrimitiveArray, TimestampArray};
pub use bitmap::{pack, unpack, Bitmap};
pub use datatypes::{DataType, Field, TimeUnit};
pub use error::Error;
pub use handle::{FieldHandle, TypeHandle};
pub use host::{HostArray, HostString};
pub use temporal::{resolve, TemporalMeta};
