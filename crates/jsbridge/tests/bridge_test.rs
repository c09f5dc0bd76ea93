//! Integration tests for the object/value bridge

use jsbridge::{Context, PropertyAttributes, Value, ValueType};
use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};

fn assert_engine_equal(a: &Value<'_>, b: &Value<'_>) {
    assert!(
        a.is_equal(b).unwrap(),
        "expected {:?} == {:?}",
        a,
        b
    );
}

#[test]
fn test_widen_narrow_roundtrip() {
    let ctx = Context::new().unwrap();
    let objects = [
        ctx.new_empty_object(),
        ctx.global_object(),
        ctx.new_array(&[ctx.number(1.0)]).unwrap(),
        ctx.new_function("f", &[], "return 1;", None, 1).unwrap(),
        ctx.new_date_with_milliseconds(0.0).unwrap(),
    ];
    for object in objects {
        let value = object.to_value();
        assert_eq!(value.value_type(), ValueType::Object);
        let back = value.to_object().unwrap();
        assert_eq!(back, object);
        assert_eq!(back.raw(), object.raw());
    }
}

#[test]
fn test_array_readback() {
    let ctx = Context::new().unwrap();
    let inputs: [Vec<Value<'_>>; 3] = [
        vec![],
        vec![ctx.string("only")],
        vec![
            ctx.number(1.0),
            ctx.string("two"),
            ctx.boolean(true),
            ctx.null(),
            ctx.undefined(),
        ],
    ];

    for items in &inputs {
        let array = ctx.new_array(items).unwrap();
        assert!(array.to_value().is_array());
        let length = array.get_property("length").unwrap().to_number().unwrap();
        assert_eq!(length as usize, items.len());
        for (i, item) in items.iter().enumerate() {
            let read = array.get_property_at_index(i as u32).unwrap();
            assert_engine_equal(&read, item);
        }
    }
}

#[test]
fn test_array_keeps_object_identity() {
    let ctx = Context::new().unwrap();
    let inner = ctx.new_empty_object();
    let array = ctx.new_array(&[inner.to_value()]).unwrap();
    let read = array.get_property_at_index(0).unwrap();
    assert!(read.is_strict_equal(&inner.to_value()));
}

#[test]
fn test_object_with_properties() {
    let ctx = Context::new().unwrap();
    let a = ctx.number(1.0);
    let b = ctx.string("x");
    let obj = ctx
        .new_object_with_properties([("a", a), ("b", b)])
        .unwrap();

    assert_engine_equal(&obj.get_property("a").unwrap(), &a);
    assert_engine_equal(&obj.get_property("b").unwrap(), &b);
    assert!(!obj.has_property("c"));
}

#[test]
fn test_function_increment() {
    let ctx = Context::new().unwrap();
    let f = ctx
        .new_function("f", &["x"], "return x+1;", Some(""), 0)
        .unwrap();
    assert!(f.is_function());

    let six = f.call_as_function(None, &[ctx.number(5.0)]).unwrap();
    assert_eq!(six.to_number().unwrap(), 6.0);

    // x is undefined, undefined + 1 is NaN
    let nan = f.call_as_function(None, &[]).unwrap();
    assert!(nan.is_number());
    assert!(nan.to_number().unwrap().is_nan());
}

#[test]
fn test_function_name_and_arity() {
    let ctx = Context::new().unwrap();
    let f = ctx
        .new_function("combine", &["a", "b", "c"], "return [a, b, c].join('-');", None, 1)
        .unwrap();
    assert_eq!(f.get_property("name").unwrap().to_js_string().unwrap(), "combine");
    assert_eq!(f.get_property("length").unwrap().to_number().unwrap(), 3.0);

    let joined = f
        .call_as_function(None, &[ctx.string("x"), ctx.number(2.0), ctx.boolean(false)])
        .unwrap();
    assert_eq!(joined.to_js_string().unwrap(), "x-2-false");
}

#[test]
fn test_function_syntax_error() {
    let ctx = Context::new().unwrap();
    let err = ctx
        .new_function("broken", &[], "return +;", None, 1)
        .unwrap_err();
    assert_eq!(err.name(), "SyntaxError");
    assert!(!err.message().is_empty());
    // the thrown value is a usable engine value
    assert!(err.value().is_object());
}

#[test]
fn test_function_throw_propagates() {
    let ctx = Context::new().unwrap();
    let f = ctx
        .new_function("thrower", &["m"], "throw new TypeError(m);", None, 1)
        .unwrap();
    let err = f.call_as_function(None, &[ctx.string("bad input")]).unwrap_err();
    assert_eq!(err.name(), "TypeError");
    assert_eq!(err.message(), "bad input");
    assert!(err.stack().is_some());
}

#[test]
fn test_property_names_of_pair() {
    let ctx = Context::new().unwrap();
    let obj = ctx
        .new_object_with_properties([("a", ctx.number(1.0)), ("b", ctx.number(2.0))])
        .unwrap();
    let names = obj.copy_property_names();
    assert_eq!(names.count(), 2);

    let got: HashSet<String> = [names.name_at_index(0), names.name_at_index(1)]
        .into_iter()
        .collect();
    let expected: HashSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
    assert_eq!(got, expected);
    assert_eq!(names.get(names.count()), None);
}

#[test]
#[should_panic(expected = "out of range")]
fn test_property_names_out_of_bounds() {
    let ctx = Context::new().unwrap();
    let obj = ctx
        .new_object_with_properties([("a", ctx.number(1.0)), ("b", ctx.number(2.0))])
        .unwrap();
    let names = obj.copy_property_names();
    let _ = names.name_at_index(names.count());
}

#[test]
fn test_global_bindings_through_properties() {
    let ctx = Context::new().unwrap();
    let global = ctx.global_object();
    global
        .set_property("config", &ctx.value_from_json(r#"{"depth": 3}"#).unwrap(), PropertyAttributes::NONE)
        .unwrap();
    let depth = ctx.eval("config.depth * 2").unwrap();
    assert_eq!(depth.to_number().unwrap(), 6.0);

    ctx.eval("globalThis.fromScript = [1, 2, 3]").unwrap();
    let from_script = global.get_property("fromScript").unwrap();
    let values: Vec<i32> = from_script.deserialize().unwrap();
    assert_eq!(values, vec![1, 2, 3]);
}

#[test]
fn test_error_value_converts_to_owned_error() {
    fn run(script: &str) -> Result<f64, jsbridge::JsError> {
        let ctx = Context::new()?;
        let value = ctx.eval(script)?;
        Ok(value.to_number()?)
    }

    assert_eq!(run("40 + 2").unwrap(), 42.0);
    let err = run("undefinedFunction()").unwrap_err();
    let info = err.exception().unwrap();
    assert_eq!(info.name, "ReferenceError");
    assert!(err.to_string().contains("ReferenceError"));
}

#[test]
fn test_foreign_value_rejected_before_store() {
    let a = Context::new().unwrap();
    {
        let b = Context::new().unwrap();
        let v = b.eval("({ x: 1 })").unwrap();
        let stored = catch_unwind(AssertUnwindSafe(|| {
            a.global_object()
                .set_property("leak", &v, PropertyAttributes::NONE)
        }));
        assert!(stored.is_err());
    }
    assert!(!a.global_object().has_property("leak"));
    assert_eq!(a.eval("typeof leak").unwrap().to_js_string().unwrap(), "undefined");
}
