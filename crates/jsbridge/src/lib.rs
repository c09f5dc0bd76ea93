// Allow raw pointer dereference in public functions - this is an FFI wrapper
// where the caller is responsible for providing valid engine handles.
#![allow(clippy::not_unsafe_ptr_arg_deref)]

//! Ownership-tracked handles for the JavaScriptCore object model.
//!
//! Contexts and context groups are retained and released by ownership:
//! cloning or [`Context::retain`] takes a retain, dropping gives it back.
//! Objects and values are borrowed views that cannot outlive their context.
//! Every engine call that can run script returns a [`JsResult`], carrying
//! the thrown value as an [`ErrorValue`] on failure.
//!
//! # Example
//!
//! ```
//! use jsbridge::Context;
//!
//! let ctx = Context::new().unwrap();
//! let add = ctx.new_function("add", &["a", "b"], "return a + b;", None, 1).unwrap();
//! let sum = add.call_as_function(None, &[ctx.number(2.0), ctx.number(3.0)]).unwrap();
//! assert_eq!(sum.to_number().unwrap(), 5.0);
//! ```
//!
//! # Thread Safety
//!
//! All types in this crate that hold engine handles are `!Send` and `!Sync`
//! because JavaScriptCore contexts are not thread-safe.
//!
//! ```compile_fail
//! use jsbridge::Context;
//! use std::thread;
//!
//! let ctx = Context::new().unwrap();
//! thread::spawn(move || {
//!     ctx.eval("1 + 1"); // Error: Context is !Send
//! });
//! ```
//!
//! ```compile_fail
//! use jsbridge::ContextGroup;
//! use std::thread;
//!
//! let group = ContextGroup::new().unwrap();
//! thread::spawn(move || drop(group)); // Error: ContextGroup is !Send
//! ```
//!
//! ```compile_fail
//! use jsbridge::Context;
//!
//! fn assert_sync<T: Sync>(_: &T) {}
//! let ctx = Context::new().unwrap();
//! let value = ctx.number(1.0);
//! assert_sync(&value); // Error: Value borrows a !Sync context
//! ```
//!
//! ```compile_fail
//! use jsbridge::{Context, PropertyNameArray};
//!
//! fn assert_send<T: Send>(_: T) {}
//! let ctx = Context::new().unwrap();
//! let names = ctx.new_empty_object().copy_property_names();
//! assert_send(names); // Error: PropertyNameArray is !Send
//! ```
//!
//! Views also cannot escape their context:
//!
//! ```compile_fail
//! use jsbridge::{Context, Object};
//!
//! let escaped: Object<'_>;
//! {
//!     let ctx = Context::new().unwrap();
//!     escaped = ctx.global_object();
//! }
//! escaped.is_function();
//! ```

mod attributes;
mod channel;
mod config;
mod context;
mod error;
mod group;
mod handle;
mod names;
mod object;
mod stats;
pub mod string;
mod value;

pub use attributes::{ClassAttributes, PropertyAttributes};
pub use config::{ContextBuilder, TIME_LIMIT_ENV};
pub use context::Context;
pub use error::{ErrorValue, ExceptionInfo, JsError, JsResult};
pub use group::ContextGroup;
pub use handle::{Ownership, Protected, RawContext};
pub use names::{Names, PropertyNameArray};
pub use object::Object;
pub use stats::{HandleStats, HandleStatsSnapshot, handle_stats};
pub use string::JsString;
pub use value::{Value, ValueType};

// Re-export the raw bindings for direct FFI access when needed
pub use jsbridge_sys;
