use std::{mem::size_of, ptr};

use crate::sys::{Date, IntervalStruct, Time, Timestamp};

/// A plain old data type, as written into application buffers bound with a fixed size C type.
/// Must be completely stack allocated without any external references.
///
/// # Safety
///
/// A type implementing this trait, must be a fixed sized type, with a layout matching the one ODBC
/// defines for the associated C type. Any bit pattern we write must be valid to read back.
pub unsafe trait Pod: Copy + 'static {}

macro_rules! impl_pod {
    ($t:ident) => {
        unsafe impl Pod for $t {}
    };
}

impl_pod!(f64);
impl_pod!(f32);
impl_pod!(i8);
impl_pod!(u8);
impl_pod!(i16);
impl_pod!(u16);
impl_pod!(i32);
impl_pod!(u32);
impl_pod!(i64);
impl_pod!(u64);
impl_pod!(Date);
impl_pod!(Time);
impl_pod!(Timestamp);
impl_pod!(IntervalStruct);

/// Writes `value` to the start of `buffer`. Application buffers carry no alignment guarantees
/// beyond what the application chose, so the write is unaligned.
///
/// # Return
///
/// Number of bytes written, or `None` if the buffer is too small to hold the value. Nothing is
/// written in that case.
pub fn write_pod<T: Pod>(value: T, buffer: &mut [u8]) -> Option<usize> {
    let size = size_of::<T>();
    if buffer.len() < size {
        return None;
    }
    // Safety: We checked the buffer to be large enough. `write_unaligned` has no alignment
    // requirements and `T` is `Copy`, so there is no destructor we could skip.
    unsafe { ptr::write_unaligned(buffer.as_mut_ptr() as *mut T, value) };
    Some(size)
}

/// Reads a value from the start of `buffer`, `None` if the buffer is too small.
///
/// # Safety
///
/// The first `size_of::<T>()` bytes must hold a valid bit pattern for `T`, e.g. because they
/// have been written by [`write_pod`] using the same type.
pub unsafe fn read_pod<T: Pod>(buffer: &[u8]) -> Option<T> {
    if buffer.len() < size_of::<T>() {
        return None;
    }
    Some(unsafe { ptr::read_unaligned(buffer.as_ptr() as *const T) })
}
