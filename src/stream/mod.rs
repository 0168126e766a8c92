//! Stream combinators for metric subscriptions

mod throttle;

pub use throttle::{Throttle, ThrottleExt};
