use tracing::{debug, info};

use crate::audit::TxnAuditLog;
use crate::error::{Failure, RolledBack, TxnError};
use crate::policy::TxnPolicy;
use crate::step::{FnStep, Outcome, TxnStep};

type BoxedStep<'a, T, E> = Box<dyn TxnStep<T, Error = E> + 'a>;

/// An ordered list of steps run against a single piece of state.
///
/// Steps run in registration order. If a handler fails, the failed step and
/// every step before it are rolled back in reverse order, and the run returns
/// the state left by the rollback together with every captured failure.
///
/// A transaction is consumed by [`run`](Self::run), so it can only run once.
///
/// ```
/// use txnkit::{Outcome, Transaction};
///
/// let result = Transaction::<i32, std::io::Error>::new(1)
///     .step(|n| Outcome::ok(n + 1), |n| Outcome::ok(n - 1))
///     .step(|n| Outcome::ok(n * 10), |n| Outcome::ok(n / 10))
///     .run();
///
/// assert_eq!(result.ok(), Some(20));
/// ```
pub struct Transaction<'a, T, E> {
    state: T,
    steps: Vec<BoxedStep<'a, T, E>>,
    policy: TxnPolicy,
}

impl<'a, T, E> Transaction<'a, T, E> {
    /// Create a transaction with the default policy.
    pub fn new(state: T) -> Self {
        Self::with_policy(state, TxnPolicy::default())
    }

    pub fn with_policy(state: T, policy: TxnPolicy) -> Self {
        Self {
            state,
            steps: Vec::new(),
            policy,
        }
    }

    /// Append a step built from a handler and its rollback.
    #[must_use]
    pub fn step<H, R>(self, handler: H, rollback: R) -> Self
    where
        H: FnMut(T) -> Outcome<T, E> + 'a,
        R: FnMut(T) -> Outcome<T, E> + 'a,
    {
        self.then(FnStep::new(handler, rollback))
    }

    /// Append a labelled step built from a handler and its rollback.
    #[must_use]
    pub fn named_step<H, R>(self, name: impl Into<String>, handler: H, rollback: R) -> Self
    where
        H: FnMut(T) -> Outcome<T, E> + 'a,
        R: FnMut(T) -> Outcome<T, E> + 'a,
    {
        self.then(FnStep::named(name, handler, rollback))
    }

    /// Append any [`TxnStep`] implementation.
    #[must_use]
    pub fn then<S>(mut self, step: S) -> Self
    where
        S: TxnStep<T, Error = E> + 'a,
    {
        self.push_step(step);
        self
    }

    pub fn push_step<S>(&mut self, step: S) -> &mut Self
    where
        S: TxnStep<T, Error = E> + 'a,
    {
        self.steps.push(Box::new(step));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn policy(&self) -> TxnPolicy {
        self.policy
    }

    /// Run every step in order.
    ///
    /// # Errors
    ///
    /// Returns [`RolledBack`] when a handler fails. It carries the state left
    /// after rolling back the failed step and all steps before it, and a
    /// [`TxnError`] listing the step failure followed by any rollback
    /// failures.
    pub fn run(self) -> Result<T, RolledBack<T, E>> {
        let (result, _audit_log) = self.run_with_audit();
        result
    }

    /// Run every step in order and return an audit log alongside the result.
    pub fn run_with_audit(self) -> (Result<T, RolledBack<T, E>>, TxnAuditLog) {
        let Self {
            state,
            mut steps,
            policy,
        } = self;

        let mut execution = Execution {
            steps: &mut steps,
            policy,
            cursor: 0,
            errors: Vec::new(),
            audit_log: TxnAuditLog::new(),
        };
        let result = execution.forward(state);
        (result, execution.audit_log)
    }
}

/// Bookkeeping for a single run.
struct Execution<'t, 'a, T, E> {
    steps: &'t mut [BoxedStep<'a, T, E>],
    policy: TxnPolicy,
    cursor: usize,
    errors: Vec<Failure<E>>,
    audit_log: TxnAuditLog,
}

impl<T, E> Execution<'_, '_, T, E> {
    fn forward(&mut self, mut state: T) -> Result<T, RolledBack<T, E>> {
        let verbose = self.policy.is_verbose();
        if verbose {
            info!(
                steps = self.steps.len(),
                fail_fast = self.policy.is_fail_fast(),
                "starting transaction"
            );
        }

        for index in 0..self.steps.len() {
            self.cursor = index;
            let position = index + 1;
            let name = self.steps[index].name().map(str::to_string);

            if verbose {
                info!(step = position, name = ?name, "executing step");
            }
            self.audit_log.record_start(position, name.as_deref());

            let (next, error) = self.steps[index].execute(state).into_parts();
            state = next;

            let Some(source) = error else {
                self.audit_log.record_success();
                if verbose {
                    info!(step = position, name = ?name, "step completed");
                }
                continue;
            };

            self.audit_log.record_failure();
            debug!(step = position, name = ?name, "step failed, rolling back");
            self.errors.push(Failure::Step {
                step: position,
                name,
                source,
            });

            let (state, halted_by) = self.rollback(state);
            let halted = halted_by.is_some();
            self.errors.extend(halted_by);

            let error = TxnError::new(std::mem::take(&mut self.errors), halted);
            return Err(RolledBack { state, error });
        }

        if verbose {
            info!(steps = self.steps.len(), "transaction completed");
        }
        Ok(state)
    }

    /// Roll back from the cursor down to the first step.
    ///
    /// Returns the state left by the scan and, under fail-fast, the rollback
    /// failure that stopped it. Without fail-fast, rollback failures go into
    /// the error log and the scan continues.
    fn rollback(&mut self, mut state: T) -> (T, Option<Failure<E>>) {
        let verbose = self.policy.is_verbose();
        if verbose {
            info!(from_step = self.cursor + 1, "starting rollback");
        }

        for index in (0..=self.cursor).rev() {
            let position = index + 1;
            let (next, error) = self.steps[index].rollback(state).into_parts();
            state = next;

            let Some(source) = error else {
                self.audit_log.record_compensated(position);
                if verbose {
                    info!(step = position, "step rolled back");
                }
                continue;
            };

            self.audit_log.record_compensation_failed(position);
            let failure = Failure::Rollback {
                step: position,
                name: self.steps[index].name().map(str::to_string),
                source,
            };

            if self.policy.is_fail_fast() {
                self.audit_log.record_skipped_through(index);
                debug!(
                    step = position,
                    skipped = index,
                    "rollback failed, halting compensation"
                );
                return (state, Some(failure));
            }

            debug!(step = position, "rollback failed, continuing compensation");
            self.errors.push(failure);
        }

        if verbose {
            info!("rollback completed");
        }
        (state, None)
    }
}
