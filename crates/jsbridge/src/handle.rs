//! Opaque engine handles and their ownership markers

use jsbridge_sys::*;
use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;

use crate::value::Value;

/// A context handle supplied by code outside the bridge
///
/// Typically the `ctx` argument of a native callback, or a context created
/// by another library. Turning it into a [`Context`](crate::Context) goes
/// through the `unsafe` [`Context::adopt`](crate::Context::adopt).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawContext(NonNull<std::ffi::c_void>);

impl RawContext {
    /// Wrap a raw handle, `None` if it is null
    ///
    /// # Safety
    /// A non-null `ptr` must be a live JSContextRef.
    pub unsafe fn from_ptr(ptr: JSContextRef) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> JSContextRef {
        self.0.as_ptr()
    }
}

impl fmt::Debug for RawContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawContext({:p})", self.0)
    }
}

/// Whether a [`Context`](crate::Context) holds a retain on its handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Created or retained by the bridge; released on drop
    Owned,
    /// Borrowed from the embedder; never released by the bridge
    Adopted,
}

/// A value pinned against garbage collection
///
/// Values on the native stack are found by the collector's conservative
/// scan. A value stashed anywhere else (a heap allocation, a host-side map)
/// needs to be protected while it is stored there. Dropping the guard
/// removes the protection; protections nest.
pub struct Protected<'ctx> {
    value: Value<'ctx>,
}

impl<'ctx> Protected<'ctx> {
    pub(crate) fn new(value: Value<'ctx>) -> Self {
        // SAFETY: value is live in its context
        unsafe { JSValueProtect(value.context().raw(), value.raw()) };
        Self { value }
    }

    pub fn value(&self) -> Value<'ctx> {
        self.value
    }
}

impl<'ctx> Deref for Protected<'ctx> {
    type Target = Value<'ctx>;

    fn deref(&self) -> &Value<'ctx> {
        &self.value
    }
}

impl Drop for Protected<'_> {
    fn drop(&mut self) {
        // SAFETY: balanced with the JSValueProtect in new()
        unsafe { JSValueUnprotect(self.value.context().raw(), self.value.raw()) };
    }
}

impl fmt::Debug for Protected<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Protected").field(&self.value).finish()
    }
}
