//! Exception slot handling shared by every fallible engine call

use jsbridge_sys::JSValueRef;
use std::ptr;

use crate::context::Context;
use crate::error::{ErrorValue, JsResult};

/// Exception out-parameter for one engine primitive
///
/// Starts empty; the primitive writes the thrown value into it. Whatever the
/// primitive returned is discarded when the slot is filled.
pub(crate) struct ErrorChannel {
    slot: JSValueRef,
}

impl ErrorChannel {
    pub(crate) fn new() -> Self {
        Self {
            slot: ptr::null_mut(),
        }
    }

    pub(crate) fn slot(&mut self) -> *mut JSValueRef {
        &mut self.slot
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slot.is_null()
    }

    /// Resolve the call: the nominal result if nothing was thrown, the thrown value otherwise
    pub(crate) fn finish<'ctx, T>(self, ctx: &'ctx Context, result: T) -> JsResult<'ctx, T> {
        if self.is_empty() {
            Ok(result)
        } else {
            // SAFETY: the engine only writes live values into the slot
            Err(unsafe { ErrorValue::from_raw(ctx, self.slot) })
        }
    }
}

impl Context {
    /// Run one engine primitive with a fresh exception slot
    ///
    /// Every operation that can run script goes through here.
    pub(crate) fn catch<'ctx, T>(
        &'ctx self,
        call: impl FnOnce(*mut JSValueRef) -> T,
    ) -> JsResult<'ctx, T> {
        let mut channel = ErrorChannel::new();
        let result = call(channel.slot());
        channel.finish(self, result)
    }
}
