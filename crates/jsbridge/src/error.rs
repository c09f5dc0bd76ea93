//! Error types for bridge operations
//!
//! Engine exceptions come back as [`ErrorValue`], which keeps the thrown
//! value usable while its context is borrowed. [`JsError`] is the owned
//! form for propagating failures past the context's lifetime and for
//! failures that never reached the engine.

use jsbridge_sys::*;
use serde::Serialize;
use std::fmt;
use std::ptr;
use thiserror::Error;

use crate::context::Context;
use crate::string::JsString;
use crate::value::Value;

/// Result of an engine operation that can throw
pub type JsResult<'ctx, T> = Result<T, ErrorValue<'ctx>>;

/// String form of the object JSC throws when the watchdog fires
const TERMINATION_TEXT: &str = "JavaScript execution terminated.";

/// Details of a thrown exception, extracted while the context was alive
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExceptionInfo {
    /// Constructor name (`TypeError`, `SyntaxError`, ...); `Error` for primitive throws
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
    pub source_url: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    /// Set when the thrown value is the engine's own termination object
    pub terminated: bool,
}

impl ExceptionInfo {
    /// Whether the engine raised this because an execution time limit expired
    pub fn is_termination(&self) -> bool {
        self.terminated
    }

    /// Read the exception details off a thrown value
    ///
    /// Property reads that throw again are treated as missing.
    ///
    /// # Safety
    /// `ctx` and `exception` must be valid and non-null.
    unsafe fn extract(ctx: JSContextRef, exception: JSValueRef) -> Self {
        // SAFETY: ctx and exception are valid per caller contract
        unsafe {
            if !JSValueIsObject(ctx, exception) {
                // throw "string" or throw 42
                return Self {
                    name: "Error".to_string(),
                    message: value_to_string(ctx, exception)
                        .unwrap_or_else(|| "Unknown error".to_string()),
                    ..Self::default()
                };
            }

            let obj = exception as JSObjectRef;
            let name = string_property(ctx, obj, "name").unwrap_or_else(|| "Error".to_string());
            let own_message = string_property(ctx, obj, "message");
            let terminated = own_message.is_none() && is_termination_object(ctx, obj);
            let message = own_message.unwrap_or_else(|| {
                value_to_string(ctx, exception).unwrap_or_else(|| "Unknown error".to_string())
            });
            // JSC and the other engines disagree on location property names
            let source_url =
                string_property(ctx, obj, "sourceURL").or_else(|| string_property(ctx, obj, "fileName"));
            let line = number_property(ctx, obj, "line")
                .or_else(|| number_property(ctx, obj, "lineNumber"))
                .map(|n| n as u32);
            let column = number_property(ctx, obj, "column")
                .or_else(|| number_property(ctx, obj, "columnNumber"))
                .map(|n| n as u32);

            Self {
                name,
                message,
                stack: string_property(ctx, obj, "stack").filter(|s| !s.is_empty()),
                source_url,
                line,
                column,
                terminated,
            }
        }
    }
}

impl fmt::Display for ExceptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}{}",
            self.name,
            self.message,
            format_location(&self.source_url, &self.line, &self.column)
        )
    }
}

/// Format location for error display
fn format_location(file: &Option<String>, line: &Option<u32>, column: &Option<u32>) -> String {
    match (file, line, column) {
        (Some(f), Some(l), Some(c)) => format!(" at {}:{}:{}", f, l, c),
        (Some(f), Some(l), None) => format!(" at {}:{}", f, l),
        (Some(f), None, _) => format!(" at {}", f),
        (None, Some(l), Some(c)) => format!(" at line {}:{}", l, c),
        (None, Some(l), None) => format!(" at line {}", l),
        _ => String::new(),
    }
}

/// The value a failed engine operation threw
///
/// Carries the same handle as any other object-or-primitive [`Value`], so it
/// can be inspected, rethrown or passed back into script.
#[derive(Clone)]
pub struct ErrorValue<'ctx> {
    value: Value<'ctx>,
    info: ExceptionInfo,
}

impl<'ctx> ErrorValue<'ctx> {
    /// Wrap an exception handle the engine wrote into an exception slot
    ///
    /// # Safety
    /// `raw` must be a live, non-null value in `ctx`.
    pub(crate) unsafe fn from_raw(ctx: &'ctx Context, raw: JSValueRef) -> Self {
        // SAFETY: raw is valid per caller contract
        let (value, info) = unsafe { (Value::from_raw(ctx, raw), ExceptionInfo::extract(ctx.raw(), raw)) };
        Self { value, info }
    }

    /// Treat an arbitrary value as thrown
    pub fn from_value(value: Value<'ctx>) -> Self {
        // SAFETY: value is a live handle in its context
        unsafe { Self::from_raw(value.context(), value.raw()) }
    }

    /// The thrown value
    pub fn value(&self) -> Value<'ctx> {
        self.value
    }

    pub fn info(&self) -> &ExceptionInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn message(&self) -> &str {
        &self.info.message
    }

    pub fn stack(&self) -> Option<&str> {
        self.info.stack.as_deref()
    }

    /// Whether the engine aborted the script because a time limit expired
    pub fn is_termination(&self) -> bool {
        self.info.is_termination()
    }

    /// Detach from the context, keeping only the extracted details
    pub fn into_error(self) -> JsError {
        JsError::from(self)
    }
}

impl fmt::Debug for ErrorValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorValue")
            .field("value", &self.value)
            .field("info", &self.info)
            .finish()
    }
}

impl fmt::Display for ErrorValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.info.fmt(f)
    }
}

impl std::error::Error for ErrorValue<'_> {}

/// Owned error for everything the bridge can fail with
#[derive(Debug, Error)]
pub enum JsError {
    /// Failed to create a JSC context or context group
    #[error("Context creation failed: {message}")]
    ContextCreation { message: String },

    /// Script threw
    #[error("{0}")]
    Exception(ExceptionInfo),

    /// Script was aborted by an execution time limit
    #[error("Execution terminated: {0}")]
    Terminated(ExceptionInfo),

    /// Text handed to the engine's JSON parser was rejected
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// serde conversion failed on the host side
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl JsError {
    /// Exception details, when the engine threw
    pub fn exception(&self) -> Option<&ExceptionInfo> {
        match self {
            Self::Exception(info) | Self::Terminated(info) => Some(info),
            _ => None,
        }
    }

    pub fn is_termination(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }
}

impl From<ErrorValue<'_>> for JsError {
    fn from(err: ErrorValue<'_>) -> Self {
        if err.is_termination() {
            Self::Terminated(err.info)
        } else {
            Self::Exception(err.info)
        }
    }
}

/// Stringify a value the way `String(value)` would, or `None` if that throws
///
/// # Safety
/// `ctx` and `value` must be valid.
unsafe fn value_to_string(ctx: JSContextRef, value: JSValueRef) -> Option<String> {
    let mut exception: JSValueRef = ptr::null_mut();
    // SAFETY: ctx and value are valid per caller contract
    let raw = unsafe { JSValueToStringCopy(ctx, value, &mut exception) };
    if !exception.is_null() || raw.is_null() {
        return None;
    }
    // SAFETY: JSValueToStringCopy returns an owned string
    Some(unsafe { JsString::from_owned(raw) }.to_string_lossy())
}

/// Whether `obj` is the watchdog's termination object
///
/// That object has a null prototype and converts to [`TERMINATION_TEXT`]
/// natively. Script-built look-alikes need a prototype or a conversion hook
/// to produce the same text.
///
/// # Safety
/// `ctx` and `obj` must be valid.
unsafe fn is_termination_object(ctx: JSContextRef, obj: JSObjectRef) -> bool {
    // SAFETY: ctx and obj are valid per caller contract
    unsafe {
        if !JSValueIsNull(ctx, JSObjectGetPrototype(ctx, obj)) {
            return false;
        }
        for hook in ["message", "toString", "valueOf"] {
            let name = JsString::new(hook);
            if JSObjectHasProperty(ctx, obj, name.raw()) {
                return false;
            }
        }
        if has_to_primitive(ctx, obj) {
            return false;
        }
        value_to_string(ctx, obj as JSValueRef).as_deref() == Some(TERMINATION_TEXT)
    }
}

/// Whether `obj` has a `Symbol.toPrimitive` property; unknown counts as present
unsafe fn has_to_primitive(ctx: JSContextRef, obj: JSObjectRef) -> bool {
    // SAFETY: forwarded caller contract
    unsafe {
        let global = JSContextGetGlobalObject(ctx);
        let key = raw_property(ctx, global, "Symbol")
            .filter(|symbol| JSValueIsObject(ctx, *symbol))
            .and_then(|symbol| raw_property(ctx, symbol as JSObjectRef, "toPrimitive"));
        let Some(key) = key else {
            return true;
        };
        let mut exception: JSValueRef = ptr::null_mut();
        let present = JSObjectHasPropertyForKey(ctx, obj, key, &mut exception);
        present || !exception.is_null()
    }
}

/// Read a property without going through the error channel
///
/// # Safety
/// `ctx` and `obj` must be valid.
unsafe fn raw_property(ctx: JSContextRef, obj: JSObjectRef, name: &str) -> Option<JSValueRef> {
    let name = JsString::new(name);
    let mut exception: JSValueRef = ptr::null_mut();
    // SAFETY: ctx and obj are valid per caller contract
    let value = unsafe { JSObjectGetProperty(ctx, obj, name.raw(), &mut exception) };
    if !exception.is_null() || value.is_null() {
        return None;
    }
    // SAFETY: value was just returned by the engine
    if unsafe { JSValueIsUndefined(ctx, value) } {
        return None;
    }
    Some(value)
}

unsafe fn string_property(ctx: JSContextRef, obj: JSObjectRef, name: &str) -> Option<String> {
    // SAFETY: forwarded caller contract
    unsafe { raw_property(ctx, obj, name).and_then(|value| value_to_string(ctx, value)) }
}

unsafe fn number_property(ctx: JSContextRef, obj: JSObjectRef, name: &str) -> Option<f64> {
    // SAFETY: forwarded caller contract
    unsafe {
        let value = raw_property(ctx, obj, name)?;
        if !JSValueIsNumber(ctx, value) {
            return None;
        }
        let mut exception: JSValueRef = ptr::null_mut();
        let n = JSValueToNumber(ctx, value, &mut exception);
        exception.is_null().then_some(n)
    }
}
