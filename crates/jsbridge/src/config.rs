//! Context configuration.
//!
//! [`ContextBuilder`] collects the group and the execution time limit a new
//! context starts with, either set in code or read from the environment.

use std::time::Duration;
use tracing::warn;

use crate::context::Context;
use crate::error::JsError;
use crate::group::ContextGroup;

/// Environment variable holding a default time limit in milliseconds.
/// `0` or unset means no limit.
pub const TIME_LIMIT_ENV: &str = "JSBRIDGE_TIME_LIMIT_MS";

/// Builder for [`Context`].
///
/// # Example
///
/// ```no_run
/// use jsbridge::Context;
/// use std::time::Duration;
///
/// let ctx = Context::builder()
///     .time_limit(Duration::from_secs(2))
///     .build()
///     .unwrap();
/// assert!(ctx.eval("while (true) {}").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    /// Group to create the context in. Default: a fresh group.
    pub group: Option<ContextGroup>,

    /// Execution time limit installed on the group.
    /// Default: none
    pub time_limit: Option<Duration>,
}

impl ContextBuilder {
    /// Create a builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with the time limit from [`TIME_LIMIT_ENV`].
    ///
    /// Unparsable values are logged and ignored.
    pub fn from_env() -> Self {
        let raw = std::env::var(TIME_LIMIT_ENV).ok();
        Self {
            time_limit: parse_time_limit(raw.as_deref()),
            ..Default::default()
        }
    }

    /// Create the context in an existing group.
    ///
    /// A time limit set on this builder then applies to the whole group.
    pub fn group(mut self, group: ContextGroup) -> Self {
        self.group = Some(group);
        self
    }

    /// Set the execution time limit.
    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Remove any configured time limit.
    pub fn no_time_limit(mut self) -> Self {
        self.time_limit = None;
        self
    }

    /// Create the context.
    pub fn build(self) -> Result<Context, JsError> {
        let ctx = match &self.group {
            Some(group) => Context::new_in_group(group)?,
            None => Context::new()?,
        };
        if let Some(limit) = self.time_limit {
            ctx.set_time_limit(limit);
        }
        Ok(ctx)
    }
}

fn parse_time_limit(raw: Option<&str>) -> Option<Duration> {
    let raw = raw?.trim();
    match raw.parse::<u64>() {
        Ok(0) => None,
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(e) => {
            warn!(
                var = TIME_LIMIT_ENV,
                value = raw,
                error = %e,
                "ignoring invalid time limit"
            );
            None
        }
    }
}
