/// Result of a handler or rollback call.
///
/// The state is always handed back, even when the call failed, so partial
/// mutations made before the failure are kept by the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Outcome<T, E> {
    /// State after the call.
    pub state: T,
    /// Failure reported by the call, if any.
    pub error: Option<E>,
}

impl<T, E> Outcome<T, E> {
    /// Successful call.
    pub fn ok(state: T) -> Self {
        Self { state, error: None }
    }

    /// Failed call that still hands back the state it produced.
    pub fn err(state: T, error: E) -> Self {
        Self {
            state,
            error: Some(error),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Split into the state and the optional failure.
    pub fn into_parts(self) -> (T, Option<E>) {
        (self.state, self.error)
    }
}

impl<T, E> From<Result<T, (T, E)>> for Outcome<T, E> {
    fn from(result: Result<T, (T, E)>) -> Self {
        match result {
            Ok(state) => Self::ok(state),
            Err((state, error)) => Self::err(state, error),
        }
    }
}

/// A step in a transaction: a forward action paired with its compensation.
///
/// Both calls receive the current state by value and return it inside an
/// [`Outcome`].
pub trait TxnStep<T> {
    /// Error type reported by `execute` and `rollback`.
    type Error;

    /// Optional label used in logs, audit records and failure entries.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Run the forward action.
    fn execute(&mut self, state: T) -> Outcome<T, Self::Error>;

    /// Compensate the forward action.
    ///
    /// Called for the failed step itself and for every step before it, in
    /// reverse order. The default leaves the state untouched, suitable for
    /// read-only steps.
    fn rollback(&mut self, state: T) -> Outcome<T, Self::Error> {
        Outcome::ok(state)
    }
}

/// A step built from a handler closure and a rollback closure.
pub struct FnStep<H, R> {
    name: Option<String>,
    handler: H,
    rollback: R,
}

impl<H, R> FnStep<H, R> {
    pub fn new(handler: H, rollback: R) -> Self {
        Self {
            name: None,
            handler,
            rollback,
        }
    }

    pub fn named(name: impl Into<String>, handler: H, rollback: R) -> Self {
        Self {
            name: Some(name.into()),
            handler,
            rollback,
        }
    }
}

impl<T, E, H, R> TxnStep<T> for FnStep<H, R>
where
    H: FnMut(T) -> Outcome<T, E>,
    R: FnMut(T) -> Outcome<T, E>,
{
    type Error = E;

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn execute(&mut self, state: T) -> Outcome<T, E> {
        (self.handler)(state)
    }

    fn rollback(&mut self, state: T) -> Outcome<T, E> {
        (self.rollback)(state)
    }
}

/// Rollback that leaves the state unchanged.
pub fn identity<T, E>(state: T) -> Outcome<T, E> {
    Outcome::ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct TestError(String);

    struct Increment;

    impl TxnStep<i32> for Increment {
        type Error = TestError;

        fn execute(&mut self, state: i32) -> Outcome<i32, TestError> {
            Outcome::ok(state + 1)
        }
    }

    #[test]
    fn default_rollback_is_identity() {
        let mut step = Increment;
        let outcome = step.rollback(41);

        assert_eq!(outcome, Outcome::ok(41));
        assert!(step.name().is_none());
    }

    #[test]
    fn fn_step_delegates_to_closures() {
        let mut step = FnStep::named(
            "double",
            |n: i32| Outcome::<i32, TestError>::ok(n * 2),
            |n: i32| Outcome::err(n / 2, TestError("undo".to_string())),
        );

        assert_eq!(step.name(), Some("double"));
        assert_eq!(step.execute(4), Outcome::ok(8));

        let (state, error) = step.rollback(8).into_parts();
        assert_eq!(state, 4);
        assert_eq!(error, Some(TestError("undo".to_string())));
    }

    #[test]
    fn outcome_from_result_keeps_state_on_error() {
        let outcome: Outcome<i32, TestError> = Err((7, TestError("boom".to_string()))).into();

        assert!(!outcome.is_ok());
        assert_eq!(outcome.state, 7);
    }

    #[test]
    fn identity_returns_state_unchanged() {
        let outcome = identity::<_, TestError>("state");
        assert_eq!(outcome, Outcome::ok("state"));
    }
}
