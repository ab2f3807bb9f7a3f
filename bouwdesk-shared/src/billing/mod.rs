/// Billing: plan catalog and payment processor integration
///
/// - [`catalog`]: the four plans with pricing, features and limits
/// - [`processor`]: the [`processor::PaymentProcessor`] trait plus HTTP
///   and noop implementations

pub mod catalog;
pub mod processor;
