//! Generic value view over engine handles

use jsbridge_sys::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::ptr;

use crate::context::Context;
use crate::error::{JsError, JsResult};
use crate::handle::Protected;
use crate::object::Object;
use crate::string::JsString;

/// Engine type tag of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValueType {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Object,
    Symbol,
    BigInt,
    /// A tag this bridge does not know, from a newer engine
    Unknown(JSType),
}

impl ValueType {
    fn from_raw(tag: JSType) -> Self {
        match tag {
            K_JS_TYPE_UNDEFINED => Self::Undefined,
            K_JS_TYPE_NULL => Self::Null,
            K_JS_TYPE_BOOLEAN => Self::Boolean,
            K_JS_TYPE_NUMBER => Self::Number,
            K_JS_TYPE_STRING => Self::String,
            K_JS_TYPE_OBJECT => Self::Object,
            K_JS_TYPE_SYMBOL => Self::Symbol,
            K_JS_TYPE_BIGINT => Self::BigInt,
            other => Self::Unknown(other),
        }
    }

    /// Name as reported by `typeof`, except `null`
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Object => "object",
            Self::Symbol => "symbol",
            Self::BigInt => "bigint",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A JavaScript value borrowed from its context
///
/// Values are not retained: they stay valid while reachable from the native
/// stack or from script. Use [`protect`](Self::protect) to keep one alive
/// while it is stored elsewhere.
#[derive(Clone, Copy)]
pub struct Value<'ctx> {
    raw: JSValueRef,
    ctx: &'ctx Context,
}

impl<'ctx> Value<'ctx> {
    /// Wrap a raw value handle
    ///
    /// # Safety
    /// `raw` must be a live value in `ctx`.
    ///
    /// # Panics
    /// If `raw` is null.
    pub unsafe fn from_raw(ctx: &'ctx Context, raw: JSValueRef) -> Self {
        assert!(!raw.is_null(), "null value handle");
        Self { raw, ctx }
    }

    /// Get the raw value reference
    pub fn raw(&self) -> JSValueRef {
        self.raw
    }

    /// The owning context
    pub fn context(&self) -> &'ctx Context {
        self.ctx
    }

    pub fn value_type(&self) -> ValueType {
        // SAFETY: self.raw is live in self.ctx
        ValueType::from_raw(unsafe { JSValueGetType(self.ctx.raw(), self.raw) })
    }

    pub fn is_undefined(&self) -> bool {
        // SAFETY: self.raw is live in self.ctx
        unsafe { JSValueIsUndefined(self.ctx.raw(), self.raw) }
    }

    pub fn is_null(&self) -> bool {
        // SAFETY: self.raw is live in self.ctx
        unsafe { JSValueIsNull(self.ctx.raw(), self.raw) }
    }

    pub fn is_boolean(&self) -> bool {
        // SAFETY: self.raw is live in self.ctx
        unsafe { JSValueIsBoolean(self.ctx.raw(), self.raw) }
    }

    pub fn is_number(&self) -> bool {
        // SAFETY: self.raw is live in self.ctx
        unsafe { JSValueIsNumber(self.ctx.raw(), self.raw) }
    }

    pub fn is_string(&self) -> bool {
        // SAFETY: self.raw is live in self.ctx
        unsafe { JSValueIsString(self.ctx.raw(), self.raw) }
    }

    pub fn is_object(&self) -> bool {
        // SAFETY: self.raw is live in self.ctx
        unsafe { JSValueIsObject(self.ctx.raw(), self.raw) }
    }

    pub fn is_array(&self) -> bool {
        // SAFETY: self.raw is live in self.ctx
        unsafe { JSValueIsArray(self.ctx.raw(), self.raw) }
    }

    pub fn is_date(&self) -> bool {
        // SAFETY: self.raw is live in self.ctx
        unsafe { JSValueIsDate(self.ctx.raw(), self.raw) }
    }

    /// Narrow to an object view
    ///
    /// `None` unless the value is tagged Object; primitives are not boxed.
    pub fn to_object(&self) -> Option<Object<'ctx>> {
        if !self.is_object() {
            return None;
        }
        // SAFETY: object-tagged value handles are object handles
        Some(unsafe { Object::from_raw(self.ctx, self.raw as JSObjectRef) })
    }

    /// ToBoolean, never throws
    pub fn to_boolean(&self) -> bool {
        // SAFETY: self.raw is live in self.ctx
        unsafe { JSValueToBoolean(self.ctx.raw(), self.raw) }
    }

    /// ToNumber; objects may run `valueOf` and throw
    pub fn to_number(&self) -> JsResult<'ctx, f64> {
        self.ctx
            .catch(|exception| unsafe { JSValueToNumber(self.ctx.raw(), self.raw, exception) })
    }

    /// ToString; objects may run `toString` and throw
    pub fn to_js_string(&self) -> JsResult<'ctx, String> {
        let raw = self.ctx.catch(|exception| unsafe {
            JSValueToStringCopy(self.ctx.raw(), self.raw, exception)
        })?;
        // SAFETY: JSValueToStringCopy hands over one retain
        Ok(unsafe { JsString::from_owned(raw) }.to_string_lossy())
    }

    /// `JSON.stringify(value, null, indent)`
    ///
    /// `None` when the value has no JSON form (`undefined`, functions, symbols).
    pub fn to_json(&self, indent: u32) -> JsResult<'ctx, Option<String>> {
        let raw = self.ctx.catch(|exception| unsafe {
            JSValueCreateJSONString(self.ctx.raw(), self.raw, indent, exception)
        })?;
        if raw.is_null() {
            return Ok(None);
        }
        // SAFETY: JSValueCreateJSONString hands over one retain
        Ok(Some(unsafe { JsString::from_owned(raw) }.to_string_lossy()))
    }

    /// Convert to a Rust type through JSON
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, JsError> {
        let json = self.to_json(0)?.unwrap_or_else(|| "null".to_string());
        Ok(serde_json::from_str(&json)?)
    }

    /// Loose equality (`==`), which may call `valueOf` on objects
    pub fn is_equal(&self, other: &Value<'_>) -> JsResult<'ctx, bool> {
        self.ctx.assert_same_group(other.ctx);
        self.ctx.catch(|exception| unsafe {
            JSValueIsEqual(self.ctx.raw(), self.raw, other.raw, exception)
        })
    }

    /// Strict equality (`===`)
    pub fn is_strict_equal(&self, other: &Value<'_>) -> bool {
        self.ctx.assert_same_group(other.ctx);
        // SAFETY: both values are live
        unsafe { JSValueIsStrictEqual(self.ctx.raw(), self.raw, other.raw) }
    }

    /// `value instanceof constructor`
    pub fn is_instance_of(&self, constructor: &Object<'_>) -> JsResult<'ctx, bool> {
        self.ctx.assert_same_group(constructor.context());
        self.ctx.catch(|exception| unsafe {
            JSValueIsInstanceOfConstructor(self.ctx.raw(), self.raw, constructor.raw(), exception)
        })
    }

    /// Pin the value against garbage collection while the guard lives
    pub fn protect(&self) -> Protected<'ctx> {
        Protected::new(*self)
    }

    /// Whether both views refer to the same engine handle
    pub fn same_handle(&self, other: &Value<'_>) -> bool {
        self.raw == other.raw
    }
}

impl<'ctx> From<Object<'ctx>> for Value<'ctx> {
    fn from(object: Object<'ctx>) -> Self {
        object.to_value()
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value_type() {
            // stringifying objects could run script
            ValueType::Object => write!(f, "Value(object @ {:p})", self.raw),
            ValueType::Symbol => write!(f, "Value(symbol)"),
            ValueType::Unknown(tag) => write!(f, "Value(<type {}>)", tag),
            ValueType::String => match self.to_js_string() {
                Ok(s) => write!(f, "Value({:?})", s),
                Err(_) => write!(f, "Value(<string>)"),
            },
            other => match self.to_js_string() {
                Ok(s) => write!(f, "Value({})", s),
                Err(_) => write!(f, "Value(<{}>)", other),
            },
        }
    }
}

/// Raw handles for an argument list, `(0, null)` when empty
pub(crate) struct Arguments {
    raw: Vec<JSValueRef>,
}

impl Arguments {
    /// # Panics
    /// If an argument belongs to a different context group than `ctx`.
    pub(crate) fn new(ctx: &Context, values: &[Value<'_>]) -> Self {
        for value in values {
            ctx.assert_same_group(value.ctx);
        }
        Self {
            raw: values.iter().map(Value::raw).collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.raw.len()
    }

    pub(crate) fn as_ptr(&self) -> *const JSValueRef {
        if self.raw.is_empty() {
            ptr::null()
        } else {
            self.raw.as_ptr()
        }
    }
}

impl Context {
    pub fn undefined(&self) -> Value<'_> {
        // SAFETY: always returns a valid value
        unsafe { Value::from_raw(self, JSValueMakeUndefined(self.raw())) }
    }

    pub fn null(&self) -> Value<'_> {
        // SAFETY: always returns a valid value
        unsafe { Value::from_raw(self, JSValueMakeNull(self.raw())) }
    }

    pub fn boolean(&self, b: bool) -> Value<'_> {
        // SAFETY: always returns a valid value
        unsafe { Value::from_raw(self, JSValueMakeBoolean(self.raw(), b)) }
    }

    pub fn number(&self, n: f64) -> Value<'_> {
        // SAFETY: always returns a valid value
        unsafe { Value::from_raw(self, JSValueMakeNumber(self.raw(), n)) }
    }

    pub fn string(&self, s: &str) -> Value<'_> {
        let s = JsString::new(s);
        // SAFETY: the engine copies the string into the value
        unsafe { Value::from_raw(self, JSValueMakeString(self.raw(), s.raw())) }
    }

    /// Parse JSON with the engine's parser
    pub fn value_from_json(&self, json: &str) -> Result<Value<'_>, JsError> {
        let text = JsString::new(json);
        // SAFETY: text is a live string
        let raw = unsafe { JSValueMakeFromJSONString(self.raw(), text.raw()) };
        if raw.is_null() {
            let preview: String = json.chars().take(64).collect();
            return Err(JsError::InvalidJson(preview));
        }
        // SAFETY: non-null result of the parser
        Ok(unsafe { Value::from_raw(self, raw) })
    }

    /// Convert a Rust value through JSON
    pub fn value_from_serde<T: Serialize + ?Sized>(&self, value: &T) -> Result<Value<'_>, JsError> {
        let json = serde_json::to_string(value)?;
        self.value_from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_primitive_constructors() {
        let ctx = Context::new().unwrap();
        assert_eq!(ctx.undefined().value_type(), ValueType::Undefined);
        assert_eq!(ctx.null().value_type(), ValueType::Null);
        assert!(ctx.boolean(true).to_boolean());
        assert_eq!(ctx.number(1.5).to_number().unwrap(), 1.5);
        assert_eq!(ctx.string("hi").to_js_string().unwrap(), "hi");
        assert!(ctx.string("hi").is_string());
    }

    #[test]
    fn test_value_types_from_script() {
        let ctx = Context::new().unwrap();
        let cases = [
            ("undefined", ValueType::Undefined),
            ("null", ValueType::Null),
            ("false", ValueType::Boolean),
            ("1", ValueType::Number),
            ("'s'", ValueType::String),
            ("({})", ValueType::Object),
            ("[]", ValueType::Object),
            ("Symbol('x')", ValueType::Symbol),
        ];
        for (script, expected) in cases {
            assert_eq!(ctx.eval(script).unwrap().value_type(), expected, "{}", script);
        }
    }

    #[test]
    fn test_narrowing() {
        let ctx = Context::new().unwrap();
        assert!(ctx.number(1.0).to_object().is_none());
        assert!(ctx.null().to_object().is_none());

        let value = ctx.eval("({ a: 1 })").unwrap();
        let object = value.to_object().unwrap();
        assert!(object.to_value().same_handle(&value));
    }

    #[test]
    fn test_array_and_date_checks() {
        let ctx = Context::new().unwrap();
        assert!(ctx.eval("[1, 2]").unwrap().is_array());
        assert!(!ctx.eval("({})").unwrap().is_array());
        assert!(ctx.eval("new Date(0)").unwrap().is_date());
    }

    #[test]
    fn test_to_number_can_throw() {
        let ctx = Context::new().unwrap();
        let value = ctx
            .eval("({ valueOf() { throw new Error('no number') } })")
            .unwrap();
        let err = value.to_number().unwrap_err();
        assert_eq!(err.message(), "no number");
    }

    #[test]
    fn test_symbol_to_string_throws() {
        let ctx = Context::new().unwrap();
        let err = ctx.eval("Symbol('s')").unwrap().to_js_string().unwrap_err();
        assert_eq!(err.name(), "TypeError");
    }

    #[test]
    fn test_json_roundtrip() {
        let ctx = Context::new().unwrap();
        let value = ctx.value_from_json(r#"{"a":[1,2],"b":"x"}"#).unwrap();
        assert_eq!(value.to_json(0).unwrap().unwrap(), r#"{"a":[1,2],"b":"x"}"#);
        assert_eq!(ctx.undefined().to_json(0).unwrap(), None);
        assert!(value.to_json(2).unwrap().unwrap().contains("\n  \"a\""));
    }

    #[test]
    fn test_invalid_json() {
        let ctx = Context::new().unwrap();
        let err = ctx.value_from_json("{not json").unwrap_err();
        assert!(matches!(err, JsError::InvalidJson(_)));
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_serde_conversion() {
        let ctx = Context::new().unwrap();
        let value = ctx.value_from_serde(&Point { x: 1, y: 2 }).unwrap();
        let x = value.to_object().unwrap().get_property("x").unwrap();
        assert_eq!(x.to_number().unwrap(), 1.0);

        let back: Point = ctx.eval("({ x: 3, y: 4 })").unwrap().deserialize().unwrap();
        assert_eq!(back, Point { x: 3, y: 4 });

        let any: serde_json::Value = ctx.eval("[1, 'two', null]").unwrap().deserialize().unwrap();
        assert_eq!(any, json!([1, "two", null]));
    }

    #[test]
    fn test_equality() {
        let ctx = Context::new().unwrap();
        let one = ctx.number(1.0);
        let text = ctx.string("1");
        assert!(one.is_equal(&text).unwrap());
        assert!(!one.is_strict_equal(&text));
        assert!(one.is_strict_equal(&ctx.number(1.0)));
    }

    #[test]
    fn test_loose_equality_can_throw() {
        let ctx = Context::new().unwrap();
        let hostile = ctx
            .eval("({ valueOf() { throw new Error('compare') } })")
            .unwrap();
        let err = hostile.is_equal(&ctx.number(1.0)).unwrap_err();
        assert_eq!(err.message(), "compare");
    }

    #[test]
    fn test_instance_of() {
        let ctx = Context::new().unwrap();
        let array_ctor = ctx.eval("Array").unwrap().to_object().unwrap();
        assert!(ctx.eval("[]").unwrap().is_instance_of(&array_ctor).unwrap());
        assert!(!ctx.eval("({})").unwrap().is_instance_of(&array_ctor).unwrap());
    }

    #[test]
    fn test_debug_does_not_run_script() {
        let ctx = Context::new().unwrap();
        let value = ctx
            .eval("({ toString() { globalThis.touched = true; return 'x' } })")
            .unwrap();
        let _ = format!("{:?}", value);
        assert!(!ctx.global_object().has_property("touched"));
        assert_eq!(format!("{:?}", ctx.string("a")), "Value(\"a\")");
        assert_eq!(format!("{:?}", ctx.number(2.0)), "Value(2)");
    }

    #[test]
    fn test_empty_arguments_are_null() {
        let ctx = Context::new().unwrap();
        let args = Arguments::new(&ctx, &[]);
        assert_eq!(args.len(), 0);
        assert!(args.as_ptr().is_null());
    }

    #[test]
    #[should_panic(expected = "different context group")]
    fn test_foreign_argument_panics() {
        let a = Context::new().unwrap();
        let b = Context::new().unwrap();
        let _ = Arguments::new(&a, &[b.number(1.0)]);
    }

    #[test]
    #[should_panic(expected = "different context group")]
    fn test_foreign_strict_equality_panics() {
        let a = Context::new().unwrap();
        let b = Context::new().unwrap();
        a.number(1.0).is_strict_equal(&b.number(1.0));
    }

    #[test]
    #[should_panic(expected = "different context group")]
    fn test_foreign_constructor_panics() {
        let a = Context::new().unwrap();
        let b = Context::new().unwrap();
        let array_ctor = b.eval("Array").unwrap().to_object().unwrap();
        let _ = a.eval("[]").unwrap().is_instance_of(&array_ctor);
    }

    #[test]
    fn test_same_group_values_compare() {
        let group = crate::ContextGroup::new().unwrap();
        let a = Context::new_in_group(&group).unwrap();
        let b = Context::new_in_group(&group).unwrap();
        assert!(a.number(1.0).is_strict_equal(&b.number(1.0)));
        assert!(a.string("1").is_equal(&b.number(1.0)).unwrap());
    }

    #[test]
    fn test_value_type_display() {
        assert_eq!(ValueType::BigInt.to_string(), "bigint");
        assert_eq!(ValueType::Null.as_str(), "null");
    }

    #[test]
    fn test_unrecognized_tag() {
        assert_eq!(ValueType::from_raw(K_JS_TYPE_BIGINT), ValueType::BigInt);
        let future = ValueType::from_raw(K_JS_TYPE_BIGINT + 1);
        assert_eq!(future, ValueType::Unknown(K_JS_TYPE_BIGINT + 1));
        assert_eq!(future.to_string(), "unknown");
    }
}
