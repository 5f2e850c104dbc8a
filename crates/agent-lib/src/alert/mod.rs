//! Alert formatting and hand-off
//!
//! Handles:
//! - Normalizing arbitrary event records into a standard `Alert`
//! - Handing alerts to the configured alert channel

mod formatter;

pub use formatter::{
    format_event, AlertFormatter, SendReceipt, ALERT_MESSAGE_PREFIX, DEFAULT_ALERT_ACTION,
    UNSPECIFIED_EVENT,
};
