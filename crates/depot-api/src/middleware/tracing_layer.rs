//! # Request/Response Tracing
//!
//! `tower_http::trace::TraceLayer` for structured request logging.

/// Build the `TraceLayer` for the repository router.
///
/// Each request gets a span with method and URI; 5xx responses are
/// logged as failures.
pub fn layer() -> tower_http::trace::TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
> {
    tower_http::trace::TraceLayer::new_for_http()
}
