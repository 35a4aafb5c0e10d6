pub use splitvote_core::app::App;
pub use splitvote_types::error::{Error, SvResult};
pub use splitvote_types::types::{PId, SnId, Timestamp};

pub use tracing::{debug, debug_span, error, error_span, info, info_span, warn, warn_span};

// vim: ts=4
