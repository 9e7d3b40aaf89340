//! Log-and-refuse contract checks.
//!
//! Behavior authoring bugs (delegating to an undeclared behavior, delegating
//! while not in control, re-initializing a live stack, …) are not fatal at
//! runtime.  The call site checks the condition with [`verify!`], which logs
//! an error naming the event and hands the boolean back so the caller can
//! refuse the operation and leave state unchanged.
//!
//! With the `strict-verify` feature a failed check also panics, which is how
//! development builds surface these bugs loudly.

/// Evaluate `cond`; on failure log `event` at error level and return `false`.
///
/// ```ignore
/// if !verify!(stack.is_empty(), "BehaviorStack.Init.StackNotEmptyOnInit", "size={}", stack.len()) {
///     return false;
/// }
/// ```
#[macro_export]
macro_rules! verify {
    ($cond:expr, $event:expr $(,)?) => {
        $crate::verify!($cond, $event, "")
    };
    ($cond:expr, $event:expr, $($fmt:tt)+) => {{
        let ok: bool = $cond;
        if !ok {
            $crate::__tracing::error!(event = $event, "verify failed: {}", format_args!($($fmt)+));
            $crate::verify::on_verify_failed($event);
        }
        ok
    }};
}

/// Hook run after a failed `verify!` has been logged.
#[inline]
#[track_caller]
pub fn on_verify_failed(event: &str) {
    #[cfg(feature = "strict-verify")]
    panic!("verify failed: {event}");
    #[cfg(not(feature = "strict-verify"))]
    let _ = event;
}
