//! Immutable byte buffers backing columnar arrays.
//!
//! A [`Buffer`] either owns 64-byte aligned memory allocated by this crate, or
//! refers to memory owned by the host runtime without copying it. The latter
//! is how array construction avoids duplicating element data.

use crate::datatypes::NativeType;
use crate::host::HostArray;
use crate::util::bit_util;
use std::alloc::{alloc, dealloc, Layout};
use std::fmt::{self, Debug, Formatter};
use std::mem;
use std::panic::RefUnwindSafe;
use std::ptr::{self, copy_nonoverlapping};
use std::slice;
use std::sync::Arc;
use thiserror::Error;

const ALIGNMENT: usize = 64;

/// An allocation that can keep borrowed host memory alive.
pub trait HostAllocation: RefUnwindSafe + Send + Sync {}

impl<T: RefUnwindSafe + Send + Sync> HostAllocation for T {}

/// Where the bytes of a [`Buffer`] come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Allocated by this crate and released when the last reference drops.
    Owned,
    /// Owned by the host; the buffer holds a reference to the host allocation.
    Host,
    /// Owned by the host; the caller guarantees it outlives the buffer.
    Foreign,
}

/// A contiguous, immutable memory region of fixed size.
#[derive(Clone, Debug, PartialEq)]
pub struct Buffer {
    data: Arc<BufferData>,
}

impl Buffer {
    /// Creates a buffer by copying `bytes` into newly allocated memory aligned
    /// on a 64-byte boundary.
    ///
    /// # Errors
    ///
    /// Returns an error if the memory cannot be allocated.
    pub fn from_slice_copy(bytes: &[u8]) -> Result<Self, AllocationError> {
        let len = bytes.len();
        if len > usize::MAX - (ALIGNMENT - 1) {
            return Err(AllocationError::TooLarge);
        }
        let capacity = bit_util::round_upto_multiple_of_64(len);
        let ptr = if capacity == 0 {
            ptr::null()
        } else {
            // `capacity` is a non-zero multiple of `ALIGNMENT`, which is a power of two.
            let data = unsafe { alloc(Layout::from_size_align_unchecked(capacity, ALIGNMENT)) };
            if data.is_null() {
                return Err(AllocationError::Other);
            }
            unsafe {
                copy_nonoverlapping(bytes.as_ptr(), data, len);
                ptr::write_bytes(data.add(len), 0, capacity - len);
            }
            data as *const u8
        };
        Ok(Self::with_storage(ptr, len, Storage::Owned { capacity }))
    }

    /// Wraps the values of a host array without copying them.
    ///
    /// The returned buffer shares the host allocation, which stays alive at
    /// least as long as the buffer does.
    pub fn from_host_array<T: NativeType>(array: &HostArray<T>) -> Self {
        let values = array.as_slice();
        // The pointer, width and length describe exactly the live host slice.
        unsafe {
            Self::wrap_host(
                values.as_ptr().cast::<u8>(),
                mem::size_of::<T>(),
                values.len(),
                array.allocation(),
            )
        }
    }

    /// Wraps `len` elements of `element_byte_width` bytes each, starting at
    /// `ptr`, without copying. `owner` is retained until the buffer is dropped.
    ///
    /// # Safety
    ///
    /// `ptr` must point to `element_byte_width * len` readable bytes, aligned
    /// to the element width, that belong to `owner`. The host must not modify
    /// or free that memory while `owner` is alive.
    pub unsafe fn wrap_host(
        ptr: *const u8,
        element_byte_width: usize,
        len: usize,
        owner: Arc<dyn HostAllocation>,
    ) -> Self {
        debug_assert!(is_aligned(ptr, element_byte_width), "memory not aligned");
        Self::with_storage(ptr, element_byte_width * len, Storage::Host(owner))
    }

    /// Wraps `len` elements of `element_byte_width` bytes each, starting at
    /// `ptr`, without copying and without retaining anything.
    ///
    /// # Safety
    ///
    /// `ptr` must point to `element_byte_width * len` readable bytes, aligned
    /// to the element width. The memory must stay valid and unmodified for as
    /// long as this buffer, or any array built from it, is alive.
    pub unsafe fn wrap_foreign(ptr: *const u8, element_byte_width: usize, len: usize) -> Self {
        debug_assert!(is_aligned(ptr, element_byte_width), "memory not aligned");
        Self::with_storage(ptr, element_byte_width * len, Storage::Foreign)
    }

    fn with_storage(ptr: *const u8, len: usize, storage: Storage) -> Self {
        Self {
            data: Arc::new(BufferData { ptr, len, storage }),
        }
    }

    /// Returns the number of bytes in the buffer.
    pub fn len(&self) -> usize {
        self.data.len
    }

    /// Returns `true` if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns where the bytes of this buffer come from.
    pub fn origin(&self) -> Origin {
        match self.data.storage {
            Storage::Owned { .. } => Origin::Owned,
            Storage::Host(_) => Origin::Host,
            Storage::Foreign => Origin::Foreign,
        }
    }

    pub fn data(&self) -> &[u8] {
        if self.data.ptr.is_null() {
            return &[];
        }
        unsafe { slice::from_raw_parts(self.raw_data(), self.len()) }
    }

    /// Returns the raw pointer to the beginning of this buffer.
    pub fn raw_data(&self) -> *const u8 {
        self.data.ptr
    }
}

unsafe impl Send for Buffer {}
unsafe impl Sync for Buffer {}

enum Storage {
    Owned { capacity: usize },
    Host(Arc<dyn HostAllocation>),
    Foreign,
}

struct BufferData {
    ptr: *const u8,
    len: usize,
    storage: Storage,
}

/// Release the underlying memory when the current buffer goes out of scope
impl Drop for BufferData {
    fn drop(&mut self) {
        if let Storage::Owned { capacity } = self.storage {
            if !self.ptr.is_null() {
                unsafe {
                    dealloc(
                        self.ptr as *mut u8,
                        Layout::from_size_align_unchecked(capacity, ALIGNMENT),
                    );
                }
            }
        }
    }
}

impl BufferData {
    fn bytes(&self) -> &[u8] {
        if self.ptr.is_null() {
            &[]
        } else {
            unsafe { slice::from_raw_parts(self.ptr, self.len) }
        }
    }
}

impl PartialEq for BufferData {
    fn eq(&self, other: &Self) -> bool {
        self.bytes() == other.bytes()
    }
}

impl Debug for BufferData {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "BufferData {{ ptr: {:?}, len: {}, data: ",
            self.ptr, self.len
        )?;
        f.debug_list().entries(self.bytes().iter()).finish()?;
        write!(f, " }}")
    }
}

/// Allocates an empty vector able to hold `len` elements without reallocating.
pub(crate) fn try_alloc_vec<T>(len: usize) -> Result<Vec<T>, AllocationError> {
    if len.checked_mul(mem::size_of::<T>()).is_none() {
        return Err(AllocationError::TooLarge);
    }
    let mut values = Vec::new();
    values
        .try_reserve_exact(len)
        .map_err(|_| AllocationError::Other)?;
    Ok(values)
}

fn is_aligned(ptr: *const u8, alignment: usize) -> bool {
    if !alignment.is_power_of_two() {
        return true;
    }
    (ptr as usize) & (alignment - 1) == 0
}

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("cannot allocate memory larger than usize::MAX - 63 bytes")]
    TooLarge,
    #[error("allocation failed")]
    Other,
}
