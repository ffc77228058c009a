/// Reports one execution step of the target to the active coverage hook.
///
/// - `step!()` uses the current module path as context and the current line as position
/// - `step!("ctx")` uses an explicit context with the current line
/// - `step!("ctx", pos)` reports an explicit location
///
/// Outside of an instrumented run this does nothing.
#[macro_export]
macro_rules! step {
    () => {
        $crate::coverage::tracer::on_step(::core::module_path!(), ::core::line!())
    };
    ($context:expr) => {
        $crate::coverage::tracer::on_step($context, ::core::line!())
    };
    ($context:expr, $position:expr) => {
        $crate::coverage::tracer::on_step($context, $position)
    };
}
