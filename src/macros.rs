/// Evaluates an expression and emits how long it took at debug level under the
/// `clonefile::timing` target.
#[macro_export]
macro_rules! log_time {
    ($fmt:literal, $expr:expr) => {{
        let start = std::time::Instant::now();
        let ret = $expr;
        let duration = start.elapsed();
        tracing::debug!(target: "clonefile::timing", duration = ?duration, $fmt);
        ret
    }};
    ({ $($fields:tt)* }, $fmt:literal, $expr:expr) => {{
        let start = std::time::Instant::now();
        let ret = $expr;
        let duration = start.elapsed();
        tracing::debug!(target: "clonefile::timing", duration = ?duration, $($fields)*, $fmt);
        ret
    }};
}
