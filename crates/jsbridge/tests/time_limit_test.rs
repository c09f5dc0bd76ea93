//! Execution time limit behavior

use jsbridge::{Context, ContextGroup, JsError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Generous bound on how long termination may take after the deadline
const OVERRUN: Duration = Duration::from_secs(10);

#[test]
fn test_infinite_loop_is_terminated() {
    let ctx = Context::new().unwrap();
    ctx.set_time_limit(Duration::from_millis(100));

    let start = Instant::now();
    let result = ctx.eval("while (1) {}");
    let elapsed = start.elapsed();

    let err = result.unwrap_err();
    assert!(elapsed < OVERRUN, "termination took {:?}", elapsed);
    assert!(err.is_termination(), "unexpected error: {}", err);
    assert!(err.info().terminated);
}

#[test]
fn test_clear_restores_normal_execution() {
    let ctx = Context::new().unwrap();
    ctx.set_time_limit(Duration::from_millis(100));
    assert!(ctx.eval("while (1) {}").is_err());

    ctx.clear_time_limit();
    assert_eq!(ctx.group().time_limit(), None);
    let sum = ctx
        .eval("let s = 0; for (let i = 0; i < 1000; i++) s += i; s")
        .unwrap();
    assert_eq!(sum.to_number().unwrap(), 499500.0);
}

#[test]
fn test_short_scripts_finish_under_limit() {
    let ctx = Context::new().unwrap();
    ctx.set_time_limit(Duration::from_secs(5));
    for _ in 0..20 {
        assert_eq!(ctx.eval("1 + 1").unwrap().to_number().unwrap(), 2.0);
    }
    ctx.clear_time_limit();
}

#[test]
fn test_context_usable_after_termination() {
    let ctx = Context::new().unwrap();
    ctx.eval("globalThis.before = 'kept'").unwrap();
    ctx.set_time_limit(Duration::from_millis(100));
    assert!(ctx.eval("for (;;) {}").is_err());
    assert_eq!(ctx.eval("before").unwrap().to_js_string().unwrap(), "kept");
}

#[test]
fn test_termination_inside_function_call() {
    let ctx = Context::new().unwrap();
    let spin = ctx
        .new_function("spin", &[], "while (true) {}", None, 1)
        .unwrap();
    ctx.set_time_limit(Duration::from_millis(100));
    let err = spin.call_as_function(None, &[]).unwrap_err();
    assert!(err.is_termination());
    assert!(matches!(err.into_error(), JsError::Terminated(_)));
}

#[test]
fn test_ordinary_throw_is_not_termination() {
    let ctx = Context::new().unwrap();
    ctx.set_time_limit(Duration::from_secs(5));
    let err = ctx.eval("throw new Error('plain')").unwrap_err();
    assert!(!err.is_termination());
    assert!(matches!(err.into_error(), JsError::Exception(_)));
}

#[test]
fn test_predicate_declining_then_accepting() {
    let group = ContextGroup::new().unwrap();
    let ctx = Context::new_in_group(&group).unwrap();
    let allow_stop = Arc::new(AtomicBool::new(false));
    let flag = allow_stop.clone();
    group.set_execution_time_limit_with(Duration::from_millis(50), move || {
        // decline the first poll, accept the next
        flag.swap(true, Ordering::SeqCst)
    });

    let err = ctx.eval("while (true) {}").unwrap_err();
    assert!(err.is_termination());
    assert!(allow_stop.load(Ordering::SeqCst));
    group.clear_execution_time_limit();
    assert_eq!(ctx.eval("'done'").unwrap().to_js_string().unwrap(), "done");
}
