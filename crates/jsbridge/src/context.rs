//! JavaScript execution contexts

use jsbridge_sys::*;
use parking_lot::Mutex;
use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::time::Duration;
use tracing::debug;

use crate::config::ContextBuilder;
use crate::error::{ErrorValue, JsError, JsResult};
use crate::group::{self, ContextGroup};
use crate::handle::{Ownership, RawContext};
use crate::object::Object;
use crate::stats::handle_stats;
use crate::string::{JsString, raw_or_null};
use crate::value::Value;

/// Global lock for JSC context creation.
/// JSC's initialization is not fully thread-safe, so we serialize context creation.
static CONTEXT_CREATION_LOCK: Mutex<()> = Mutex::new(());

/// A JavaScript execution context
///
/// Owns one retain of a JSGlobalContext, released exactly once on drop.
/// [`Object`] and [`Value`] handles borrow the context and cannot outlive it.
///
/// # Thread Safety
///
/// This type is `!Send` and `!Sync` because JavaScriptCore contexts are not
/// thread-safe. Accessing a context from multiple threads causes undefined behavior.
pub struct Context {
    raw: JSGlobalContextRef,
    ownership: Ownership,
    /// Marker to make this type !Send + !Sync
    _not_send: PhantomData<*mut ()>,
}

impl Context {
    /// Create a context in a fresh group
    ///
    /// The creation retain is the one released on drop.
    pub fn new() -> Result<Self, JsError> {
        let raw = {
            let _guard = CONTEXT_CREATION_LOCK.lock();
            // SAFETY: a null class creates a default global object
            unsafe { JSGlobalContextCreate(ptr::null_mut()) }
        };
        if raw.is_null() {
            return Err(JsError::ContextCreation {
                message: "JSGlobalContextCreate returned null".to_string(),
            });
        }
        debug!(ctx = ?raw, "context created");
        Ok(Self::owned(raw))
    }

    /// Create a context sharing `group`'s heap and time limit
    pub fn new_in_group(group: &ContextGroup) -> Result<Self, JsError> {
        let raw = {
            let _guard = CONTEXT_CREATION_LOCK.lock();
            // SAFETY: group is retained by the caller's handle
            unsafe { JSGlobalContextCreateInGroup(group.raw(), ptr::null_mut()) }
        };
        if raw.is_null() {
            return Err(JsError::ContextCreation {
                message: "JSGlobalContextCreateInGroup returned null".to_string(),
            });
        }
        debug!(ctx = ?raw, group = ?group.raw(), "context created in group");
        Ok(Self::owned(raw))
    }

    /// Start configuring a context
    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    /// Wrap a context the bridge did not create, without retaining it
    ///
    /// The returned context never releases the handle; use
    /// [`retain`](Self::retain) to get one that does.
    ///
    /// # Safety
    /// `raw` must stay alive for as long as the returned context and
    /// everything derived from it, and must only be used on this thread.
    pub unsafe fn adopt(raw: RawContext) -> Self {
        // SAFETY: raw is live per caller contract
        let global = unsafe { JSContextGetGlobalContext(raw.as_ptr()) };
        // SAFETY: as above
        group::attach(unsafe { JSContextGetGroup(global) });
        debug!(ctx = ?global, "context adopted");
        Self {
            raw: global,
            ownership: Ownership::Adopted,
            _not_send: PhantomData,
        }
    }

    fn owned(raw: JSGlobalContextRef) -> Self {
        // SAFETY: raw was just created or retained
        group::attach(unsafe { JSContextGetGroup(raw) });
        handle_stats().record_context_retained();
        Self {
            raw,
            ownership: Ownership::Owned,
            _not_send: PhantomData,
        }
    }

    /// Get the raw context pointer
    pub fn raw(&self) -> JSContextRef {
        self.raw as JSContextRef
    }

    /// Get the raw global context pointer
    pub fn raw_global(&self) -> JSGlobalContextRef {
        self.raw
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Take another retain on the same context
    ///
    /// The result is always owned, even when `self` is adopted.
    pub fn retain(&self) -> Context {
        // SAFETY: self.raw is live for the lifetime of self
        let raw = unsafe { JSGlobalContextRetain(self.raw) };
        Self::owned(raw)
    }

    /// Give back this handle's retain
    ///
    /// Same as dropping; consuming `self` makes a second release impossible.
    pub fn release(self) {
        drop(self);
    }

    /// The context's global object
    pub fn global_object(&self) -> Object<'_> {
        // SAFETY: every context has a global object
        unsafe { Object::from_raw(self, JSContextGetGlobalObject(self.raw())) }
    }

    /// The group this context belongs to
    pub fn group(&self) -> ContextGroup {
        // SAFETY: the group is kept alive by the context
        unsafe { ContextGroup::retain_raw(JSContextGetGroup(self.raw())) }
    }

    /// Limit how long any script in this context's group may run
    ///
    /// Group-scoped: every context sharing the group is affected.
    pub fn set_time_limit(&self, limit: Duration) {
        self.group().set_execution_time_limit(limit);
    }

    /// Remove the group's time limit
    pub fn clear_time_limit(&self) {
        self.group().clear_execution_time_limit();
    }

    /// Evaluate a script and return its completion value
    pub fn eval(&self, script: &str) -> JsResult<'_, Value<'_>> {
        self.evaluate_script(script, None, Some("<eval>"), 1)
    }

    /// Evaluate a script with an explicit `this` and source location
    pub fn evaluate_script(
        &self,
        script: &str,
        this: Option<&Object<'_>>,
        source_url: Option<&str>,
        starting_line: i32,
    ) -> JsResult<'_, Value<'_>> {
        let script = JsString::new(script);
        let source_url = source_url.map(JsString::new);
        let this = this.map_or(ptr::null_mut(), |o| {
            self.assert_same_group(o.context());
            o.raw()
        });

        let result = self.catch(|exception| unsafe {
            JSEvaluateScript(
                self.raw(),
                script.raw(),
                this,
                raw_or_null(source_url.as_ref()),
                starting_line,
                exception,
            )
        });
        if result.as_ref().is_err_and(ErrorValue::is_termination) {
            debug!(ctx = ?self.raw, "script terminated by time limit");
        }
        // SAFETY: a successful evaluation always yields a value
        result.map(|raw| unsafe { Value::from_raw(self, raw) })
    }

    /// Parse a script without running it
    pub fn check_script_syntax(
        &self,
        script: &str,
        source_url: Option<&str>,
        starting_line: i32,
    ) -> JsResult<'_, ()> {
        let script = JsString::new(script);
        let source_url = source_url.map(JsString::new);

        let valid = self.catch(|exception| unsafe {
            JSCheckScriptSyntax(
                self.raw(),
                script.raw(),
                raw_or_null(source_url.as_ref()),
                starting_line,
                exception,
            )
        })?;
        if valid {
            Ok(())
        } else {
            Err(self.make_error("SyntaxError", "invalid script"))
        }
    }

    /// Ask the collector to run soon
    pub fn garbage_collect(&self) {
        // SAFETY: self.raw is live
        unsafe { JSGarbageCollect(self.raw()) };
    }

    /// # Panics
    /// If `other` is in a different context group. Handles from another
    /// group point into a different heap.
    pub(crate) fn assert_same_group(&self, other: &Context) {
        if ptr::eq(self, other) {
            return;
        }
        // SAFETY: both contexts are live for the borrow
        let (mine, theirs) = unsafe { (JSContextGetGroup(self.raw()), JSContextGetGroup(other.raw())) };
        assert_eq!(mine, theirs, "value belongs to a different context group");
    }

    /// Build an error of the given built-in type as if the engine had thrown it
    pub(crate) fn make_error(&self, constructor: &str, message: &str) -> ErrorValue<'_> {
        let message = self.string(message);
        let native = self
            .global_object()
            .get_property(constructor)
            .ok()
            .and_then(|ctor| ctor.to_object())
            .filter(Object::is_constructor)
            .and_then(|ctor| ctor.call_as_constructor(&[message]).ok());
        let error = match native {
            Some(error) => error,
            None => match self.new_error(&[message]) {
                Ok(error) => error.to_value(),
                Err(err) => return err,
            },
        };
        ErrorValue::from_value(error)
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        // SAFETY: the group outlives the context handle we still hold
        group::detach(unsafe { JSContextGetGroup(self.raw()) });
        if self.ownership == Ownership::Owned {
            // SAFETY: balanced with the create/retain taken by this wrapper
            unsafe { JSGlobalContextRelease(self.raw) };
            handle_stats().record_context_released();
            debug!(ctx = ?self.raw, "context released");
        }
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Context {}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("raw", &self.raw)
            .field("ownership", &self.ownership)
            .finish()
    }
}
