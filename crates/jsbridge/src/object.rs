//! Object view: property access, calls and the object constructors

use jsbridge_sys::*;
use std::fmt;
use std::os::raw::c_uint;
use std::ptr;

use crate::attributes::PropertyAttributes;
use crate::context::Context;
use crate::error::JsResult;
use crate::names::PropertyNameArray;
use crate::string::{JsString, raw_or_null};
use crate::value::{Arguments, Value};

/// A JavaScript object borrowed from its context
///
/// Objects are never retained or released by the bridge; the borrow of the
/// context keeps the view from outliving it. Equality is handle identity.
#[derive(Clone, Copy)]
pub struct Object<'ctx> {
    raw: JSObjectRef,
    ctx: &'ctx Context,
}

impl<'ctx> Object<'ctx> {
    /// Wrap a raw object handle
    ///
    /// # Safety
    /// `raw` must be a live object in `ctx`.
    ///
    /// # Panics
    /// If `raw` is null.
    pub unsafe fn from_raw(ctx: &'ctx Context, raw: JSObjectRef) -> Self {
        assert!(!raw.is_null(), "null object handle");
        Self { raw, ctx }
    }

    /// Get the raw object reference
    pub fn raw(&self) -> JSObjectRef {
        self.raw
    }

    /// The owning context
    pub fn context(&self) -> &'ctx Context {
        self.ctx
    }

    /// Widen to a value view of the same handle
    pub fn to_value(&self) -> Value<'ctx> {
        // SAFETY: object handles are valid value handles
        unsafe { Value::from_raw(self.ctx, self.raw as JSValueRef) }
    }

    pub fn is_function(&self) -> bool {
        // SAFETY: self.raw is live in self.ctx
        unsafe { JSObjectIsFunction(self.ctx.raw(), self.raw) }
    }

    pub fn is_constructor(&self) -> bool {
        // SAFETY: self.raw is live in self.ctx
        unsafe { JSObjectIsConstructor(self.ctx.raw(), self.raw) }
    }

    /// Get a property by name; getters may throw
    pub fn get_property(&self, name: &str) -> JsResult<'ctx, Value<'ctx>> {
        let name = JsString::new(name);
        let raw = self.ctx.catch(|exception| unsafe {
            JSObjectGetProperty(self.ctx.raw(), self.raw, name.raw(), exception)
        })?;
        // SAFETY: a successful get yields a value, undefined when absent
        Ok(unsafe { Value::from_raw(self.ctx, raw) })
    }

    /// Get an indexed property
    pub fn get_property_at_index(&self, index: u32) -> JsResult<'ctx, Value<'ctx>> {
        let raw = self.ctx.catch(|exception| unsafe {
            JSObjectGetPropertyAtIndex(self.ctx.raw(), self.raw, index as c_uint, exception)
        })?;
        // SAFETY: a successful get yields a value
        Ok(unsafe { Value::from_raw(self.ctx, raw) })
    }

    /// Set a property by name; setters may throw
    pub fn set_property(
        &self,
        name: &str,
        value: &Value<'_>,
        attributes: PropertyAttributes,
    ) -> JsResult<'ctx, ()> {
        self.ctx.assert_same_group(value.context());
        let name = JsString::new(name);
        self.ctx.catch(|exception| unsafe {
            JSObjectSetProperty(
                self.ctx.raw(),
                self.raw,
                name.raw(),
                value.raw(),
                attributes.bits(),
                exception,
            )
        })
    }

    /// Set an indexed property
    pub fn set_property_at_index(&self, index: u32, value: &Value<'_>) -> JsResult<'ctx, ()> {
        self.ctx.assert_same_group(value.context());
        self.ctx.catch(|exception| unsafe {
            JSObjectSetPropertyAtIndex(
                self.ctx.raw(),
                self.raw,
                index as c_uint,
                value.raw(),
                exception,
            )
        })
    }

    /// Delete a property; `false` when it is not configurable
    pub fn delete_property(&self, name: &str) -> JsResult<'ctx, bool> {
        let name = JsString::new(name);
        self.ctx.catch(|exception| unsafe {
            JSObjectDeleteProperty(self.ctx.raw(), self.raw, name.raw(), exception)
        })
    }

    /// Whether the property exists on the object or its prototype chain
    pub fn has_property(&self, name: &str) -> bool {
        let name = JsString::new(name);
        // SAFETY: self.raw is live and name is released on return
        unsafe { JSObjectHasProperty(self.ctx.raw(), self.raw, name.raw()) }
    }

    pub fn prototype(&self) -> Value<'ctx> {
        // SAFETY: every object has a prototype value, possibly null
        unsafe { Value::from_raw(self.ctx, JSObjectGetPrototype(self.ctx.raw(), self.raw)) }
    }

    /// Replace the prototype; non-object, non-null values are ignored by the engine
    pub fn set_prototype(&self, prototype: &Value<'_>) {
        self.ctx.assert_same_group(prototype.context());
        // SAFETY: both handles are live
        unsafe { JSObjectSetPrototype(self.ctx.raw(), self.raw, prototype.raw()) };
    }

    /// Call the object as a function
    ///
    /// `this` defaults to the global object, as for a plain call.
    pub fn call_as_function(
        &self,
        this: Option<&Object<'_>>,
        args: &[Value<'_>],
    ) -> JsResult<'ctx, Value<'ctx>> {
        if !self.is_function() {
            return Err(self.ctx.make_error("TypeError", "object is not a function"));
        }
        let args = Arguments::new(self.ctx, args);
        let this = this.map_or(ptr::null_mut(), |this| {
            self.ctx.assert_same_group(this.ctx);
            this.raw
        });
        let raw = self.ctx.catch(|exception| unsafe {
            JSObjectCallAsFunction(
                self.ctx.raw(),
                self.raw,
                this,
                args.len(),
                args.as_ptr(),
                exception,
            )
        })?;
        // SAFETY: a successful call yields a value
        Ok(unsafe { Value::from_raw(self.ctx, raw) })
    }

    /// `new object(...args)`
    pub fn call_as_constructor(&self, args: &[Value<'_>]) -> JsResult<'ctx, Value<'ctx>> {
        if !self.is_constructor() {
            return Err(self.ctx.make_error("TypeError", "object is not a constructor"));
        }
        let args = Arguments::new(self.ctx, args);
        let raw = self.ctx.catch(|exception| unsafe {
            JSObjectCallAsConstructor(self.ctx.raw(), self.raw, args.len(), args.as_ptr(), exception)
        })?;
        // SAFETY: a successful construction yields an object
        Ok(unsafe { Object::from_raw(self.ctx, raw) }.to_value())
    }

    /// Call the method stored under `name` with this object as receiver
    pub fn call_method(&self, name: &str, args: &[Value<'_>]) -> JsResult<'ctx, Value<'ctx>> {
        let callee = self.get_property(name)?;
        match callee.to_object().filter(Object::is_function) {
            Some(function) => function.call_as_function(Some(self), args),
            None => Err(self
                .ctx
                .make_error("TypeError", &format!("{} is not a function", name))),
        }
    }

    /// Snapshot of the enumerable property names, in `for...in` order
    pub fn copy_property_names(&self) -> PropertyNameArray {
        // SAFETY: the returned array carries one retain
        unsafe {
            PropertyNameArray::from_owned(
                self.ctx,
                JSObjectCopyPropertyNames(self.ctx.raw(), self.raw),
            )
        }
    }
}

impl PartialEq for Object<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Object<'_> {}

impl fmt::Debug for Object<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({:p})", self.raw)
    }
}

impl Context {
    /// A plain `{}`
    pub fn new_empty_object(&self) -> Object<'_> {
        // SAFETY: a null class creates a plain object
        unsafe { Object::from_raw(self, JSObjectMake(self.raw(), ptr::null_mut(), ptr::null_mut())) }
    }

    /// An object with the given properties set in order
    ///
    /// Stops at the first property whose assignment throws and returns that
    /// error. Properties set before it stay on the discarded object.
    pub fn new_object_with_properties<'a, I>(&self, properties: I) -> JsResult<'_, Object<'_>>
    where
        I: IntoIterator<Item = (&'a str, Value<'a>)>,
    {
        let object = self.new_empty_object();
        for (name, value) in properties {
            object.set_property(name, &value, PropertyAttributes::NONE)?;
        }
        Ok(object)
    }

    /// An array holding `items`
    pub fn new_array(&self, items: &[Value<'_>]) -> JsResult<'_, Object<'_>> {
        let args = Arguments::new(self, items);
        self.make_object(|exception| unsafe {
            JSObjectMakeArray(self.raw(), args.len(), args.as_ptr(), exception)
        })
    }

    /// The current time
    pub fn new_date(&self) -> JsResult<'_, Object<'_>> {
        self.new_date_from_values(&[])
    }

    /// A date at milliseconds since the epoch
    pub fn new_date_with_milliseconds(&self, milliseconds: f64) -> JsResult<'_, Object<'_>> {
        self.new_date_from_values(&[self.number(milliseconds)])
    }

    /// A date parsed from a string, invalid if unparsable
    pub fn new_date_with_string(&self, date: &str) -> JsResult<'_, Object<'_>> {
        self.new_date_from_values(&[self.string(date)])
    }

    fn new_date_from_values(&self, params: &[Value<'_>]) -> JsResult<'_, Object<'_>> {
        let args = Arguments::new(self, params);
        self.make_object(|exception| unsafe {
            JSObjectMakeDate(self.raw(), args.len(), args.as_ptr(), exception)
        })
    }

    /// A regular expression with no flags
    pub fn new_regexp(&self, pattern: &str) -> JsResult<'_, Object<'_>> {
        self.new_regexp_from_values(&[self.string(pattern)])
    }

    /// `new RegExp(...params)`, for example pattern and flags
    pub fn new_regexp_from_values(&self, params: &[Value<'_>]) -> JsResult<'_, Object<'_>> {
        let args = Arguments::new(self, params);
        self.make_object(|exception| unsafe {
            JSObjectMakeRegExp(self.raw(), args.len(), args.as_ptr(), exception)
        })
    }

    /// `new Error(...params)`
    pub fn new_error(&self, params: &[Value<'_>]) -> JsResult<'_, Object<'_>> {
        let args = Arguments::new(self, params);
        self.make_object(|exception| unsafe {
            JSObjectMakeError(self.raw(), args.len(), args.as_ptr(), exception)
        })
    }

    /// Compile a function from its parameter names and body
    ///
    /// `source_url` and `starting_line` only affect error locations and stack traces.
    pub fn new_function(
        &self,
        name: &str,
        param_names: &[&str],
        body: &str,
        source_url: Option<&str>,
        starting_line: i32,
    ) -> JsResult<'_, Object<'_>> {
        let name = JsString::new(name);
        let params: Vec<JsString> = param_names.iter().map(|p| JsString::new(p)).collect();
        let raw_params: Vec<JSStringRef> = params.iter().map(JsString::raw).collect();
        let body = JsString::new(body);
        let source_url = source_url.map(JsString::new);

        self.make_object(|exception| unsafe {
            JSObjectMakeFunction(
                self.raw(),
                name.raw(),
                raw_params.len() as c_uint,
                if raw_params.is_empty() {
                    ptr::null()
                } else {
                    raw_params.as_ptr()
                },
                body.raw(),
                raw_or_null(source_url.as_ref()),
                starting_line,
                exception,
            )
        })
    }

    fn make_object(
        &self,
        make: impl FnOnce(*mut JSValueRef) -> JSObjectRef,
    ) -> JsResult<'_, Object<'_>> {
        let raw = self.catch(make)?;
        // SAFETY: the maker succeeded, so the handle is a live object
        Ok(unsafe { Object::from_raw(self, raw) })
    }
}
