use serde::{Deserialize, Serialize};

/// Policy switches fixed when a transaction is constructed.
///
/// Deserializes from kebab-case keys so it can sit inside a caller's own
/// configuration file:
///
/// ```toml
/// fail-fast = true
/// verbose = false
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct TxnPolicy {
    fail_fast: bool,
    verbose: bool,
}

impl TxnPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the rollback scan at the first rollback failure.
    ///
    /// Steps that were not compensated yet are left as they are.
    #[must_use]
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Narrate each phase of a run at `info` level.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn is_fail_fast(&self) -> bool {
        self.fail_fast
    }

    #[must_use]
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}
