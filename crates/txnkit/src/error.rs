use std::error::Error;
use std::fmt::{self, Debug, Display};

/// Which phase of a run produced a [`Failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    StepFailure,
    RollbackFailure,
}

/// A single captured failure, tagged with the 1-based position of its step.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Failure<E> {
    /// A handler failed and triggered the rollback.
    #[error("step failed at step {step}: {source}")]
    Step {
        /// 1-based position of the failed step.
        step: usize,
        /// Label of the step, when it has one.
        name: Option<String>,
        #[source]
        source: E,
    },

    /// A rollback function failed.
    #[error("rollback failed at step {step}: {source}")]
    Rollback {
        /// 1-based position of the step whose rollback failed.
        step: usize,
        /// Label of the step, when it has one.
        name: Option<String>,
        #[source]
        source: E,
    },
}

impl<E> Failure<E> {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Step { .. } => FailureKind::StepFailure,
            Self::Rollback { .. } => FailureKind::RollbackFailure,
        }
    }

    /// 1-based position of the step this failure belongs to.
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            Self::Step { step, .. } | Self::Rollback { step, .. } => *step,
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Step { name, .. } | Self::Rollback { name, .. } => name.as_deref(),
        }
    }

    /// The error reported by the step function.
    #[must_use]
    pub fn cause(&self) -> &E {
        match self {
            Self::Step { source, .. } | Self::Rollback { source, .. } => source,
        }
    }

    #[must_use]
    pub fn into_cause(self) -> E {
        match self {
            Self::Step { source, .. } | Self::Rollback { source, .. } => source,
        }
    }
}

/// Every failure captured by one run, in encounter order.
///
/// The triggering step failure comes first, followed by rollback failures in
/// the order their steps were compensated.
#[derive(Debug)]
pub struct TxnError<E> {
    failures: Vec<Failure<E>>,
    halted: bool,
}

impl<E> TxnError<E> {
    pub(crate) fn new(failures: Vec<Failure<E>>, halted: bool) -> Self {
        debug_assert!(
            matches!(failures.first(), Some(Failure::Step { .. })),
            "a run error always starts with the step failure"
        );
        Self { failures, halted }
    }

    #[must_use]
    pub fn failures(&self) -> &[Failure<E>] {
        &self.failures
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Failure<E>> {
        self.failures.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// The forward failure that started the rollback.
    #[must_use]
    pub fn step_failure(&self) -> Option<&Failure<E>> {
        self.failures
            .iter()
            .find(|failure| failure.kind() == FailureKind::StepFailure)
    }

    pub fn rollback_failures(&self) -> impl Iterator<Item = &Failure<E>> {
        self.failures
            .iter()
            .filter(|failure| failure.kind() == FailureKind::RollbackFailure)
    }

    /// Whether a fail-fast policy stopped the rollback scan early.
    #[must_use]
    pub fn halted(&self) -> bool {
        self.halted
    }

    /// The failure that decided the outcome: the rollback failure that halted
    /// the scan under fail-fast, otherwise the step failure.
    #[must_use]
    pub fn decisive(&self) -> Option<&Failure<E>> {
        if self.halted {
            self.failures.last()
        } else {
            self.step_failure()
        }
    }

    /// Whether any captured failure was caused by `cause`.
    #[must_use]
    pub fn contains(&self, cause: &E) -> bool
    where
        E: PartialEq,
    {
        self.any_cause(|candidate| candidate == cause)
    }

    pub fn any_cause(&self, mut predicate: impl FnMut(&E) -> bool) -> bool {
        self.failures
            .iter()
            .any(|failure| predicate(failure.cause()))
    }

    #[must_use]
    pub fn into_failures(self) -> Vec<Failure<E>> {
        self.failures
    }
}

impl<E> IntoIterator for TxnError<E> {
    type Item = Failure<E>;
    type IntoIter = std::vec::IntoIter<Failure<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.failures.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a TxnError<E> {
    type Item = &'a Failure<E>;
    type IntoIter = std::slice::Iter<'a, Failure<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.failures.iter()
    }
}

impl<E: Display> Display for TxnError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, failure) in self.failures.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl<E> Error for TxnError<E>
where
    E: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.decisive().map(|failure| failure as &(dyn Error + 'static))
    }
}

/// A run that failed and was rolled back.
///
/// Carries the state left behind by the rollback together with the
/// aggregated error.
pub struct RolledBack<T, E> {
    /// State after the (possibly partial) rollback.
    pub state: T,
    pub error: TxnError<E>,
}

impl<T, E> RolledBack<T, E> {
    #[must_use]
    pub fn into_parts(self) -> (T, TxnError<E>) {
        (self.state, self.error)
    }
}

impl<T: Debug, E: Debug> Debug for RolledBack<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RolledBack")
            .field("state", &self.state)
            .field("error", &self.error)
            .finish()
    }
}

impl<T, E: Display> Display for RolledBack<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.error, f)
    }
}

impl<T, E> Error for RolledBack<T, E>
where
    T: Debug,
    E: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.error.source()
    }
}
