pub use crate::error::{Error, SvResult};
pub use crate::types::{PId, SnId, Timestamp};

pub use tracing::{debug, debug_span, error, error_span, info, info_span, warn, warn_span};

// vim: ts=4
