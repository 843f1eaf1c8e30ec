/// Hot-path trace event for queue internals. Compiles to nothing unless the
/// `trace` feature is enabled.
#[cfg(feature = "trace")]
#[macro_export]
macro_rules! flowbuf_trace {
    ($($arg:tt)*) => {
        ::tracing::trace!(target: "flowbuf::queue", $($arg)*)
    };
}

#[cfg(not(feature = "trace"))]
#[macro_export]
macro_rules! flowbuf_trace {
    ($($arg:tt)*) => {};
}
