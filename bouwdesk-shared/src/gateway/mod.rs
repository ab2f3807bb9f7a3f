/// API gateway concerns: rate limiting and usage analytics
///
/// - [`rate_limit`]: plan-based windowed counters (Redis or in-process)
/// - [`analytics`]: request logging and per-company usage metrics

pub mod analytics;
pub mod rate_limit;
