//! XAPI transport: one TCP connection per request, cancellation aware waits.

pub mod session;
pub mod stats;

pub use session::{
    CancelSignal, IpFamily, NeverCancelled, SessionError, SessionOptions, SessionState, Timeouts,
    XapiSession,
};
pub use stats::{SessionStats, SessionStatsSnapshot};
