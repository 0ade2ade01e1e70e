use std::time::Duration;

/// Execution settings shared by every statement run through a resolver.
///
/// Controls what the `sqlweave.sql` tracing target reports. Nothing here
/// changes the SQL that is sent.
#[derive(Debug, Clone)]
pub struct ExecConfig {
    /// Executions slower than this are reported with `warn!`. `None` disables the check.
    pub slow_query_threshold: Option<Duration>,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
    /// Include binding values in execution events.
    pub log_bindings: bool,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold: None,
            max_sql_length: Some(200),
            log_bindings: false,
        }
    }
}

impl ExecConfig {
    /// Create a new configuration with defaults (no slow-query check, 200 byte SQL in logs).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the slow query threshold.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    /// Set maximum SQL length to log.
    pub fn with_max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Log binding values alongside the SQL.
    ///
    /// Off by default.
    pub fn with_log_bindings(mut self, enabled: bool) -> Self {
        self.log_bindings = enabled;
        self
    }

    /// `sql` truncated to `max_sql_length` on a char boundary.
    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => {
                let mut end = max;
                while end > 0 && !sql.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}...", &sql[..end])
            }
            _ => sql.to_string(),
        }
    }

    pub(crate) fn is_slow(&self, elapsed: Duration) -> bool {
        self.slow_query_threshold.is_some_and(|t| elapsed >= t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_sql_respects_char_boundary() {
        let config = ExecConfig::new().with_max_sql_length(4);
        assert_eq!(config.truncate_sql("SELECT 1"), "SELE...");
        assert_eq!(config.truncate_sql("abcé"), "abc...");
        assert_eq!(config.truncate_sql("abc"), "abc");
        assert_eq!(ExecConfig::new().no_truncate().truncate_sql("SELECT 1"), "SELECT 1");
    }

    #[test]
    fn test_slow_threshold() {
        let config = ExecConfig::new().with_slow_query_threshold(Duration::from_millis(50));
        assert!(config.is_slow(Duration::from_millis(80)));
        assert!(!config.is_slow(Duration::from_millis(10)));
        assert!(!ExecConfig::new().is_slow(Duration::from_secs(60)));
    }
}
