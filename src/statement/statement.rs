//! Reusable statement descriptions.
//!
//! A [`Statement`] is an immutable, shareable description of a parameterized
//! query: how to build the descriptor from typed arguments, how to transform
//! the raw result into a typed value, and how to classify database failures
//! into a typed domain error. All execution state lives in the
//! [`PreparedQuery`](crate::PreparedQuery) produced by `prepare`.

use crate::error::{ArgsError, DatabaseError};
use crate::query::{QueryConfig, QueryResult, QueryRunner};
use crate::statement::prepared::PreparedQuery;
use std::sync::Arc;

/// Context handed to every processing step alongside the previous step's
/// output.
pub struct ProcessContext<'a, A> {
    /// The descriptor used to run the query.
    pub config: &'a QueryConfig,
    /// The arguments used to build it.
    pub args: &'a A,
}

/// Context handed to error matchers and handlers.
pub struct ErrorContext<'a, A> {
    /// The classified database error.
    pub error: &'a DatabaseError,
    pub config: &'a QueryConfig,
    pub args: &'a A,
}

pub(crate) type BuildFn<A> = dyn Fn(&A) -> QueryConfig + Send + Sync;
pub(crate) type ValidateFn<A> = dyn Fn(&A) -> Result<(), ArgsError> + Send + Sync;
pub(crate) type ProcessFn<A, D> =
    dyn for<'a> Fn(QueryResult, &ProcessContext<'a, A>) -> D + Send + Sync;
pub(crate) type HandlerFn<A, E> =
    dyn for<'a> Fn(&ErrorContext<'a, A>) -> Option<E> + Send + Sync;

/// An immutable description of how to build, transform and classify one
/// query. Cloning is cheap (shared closures) and statements can be shared
/// freely across callers.
pub struct Statement<A, D = QueryResult, E = DatabaseError> {
    pub(crate) build: Arc<BuildFn<A>>,
    pub(crate) validate: Option<Arc<ValidateFn<A>>>,
    pub(crate) process: Arc<ProcessFn<A, D>>,
    pub(crate) handlers: Vec<Arc<HandlerFn<A, E>>>,
}

impl<A, D, E> Clone for Statement<A, D, E> {
    fn clone(&self) -> Self {
        Self {
            build: Arc::clone(&self.build),
            validate: self.validate.clone(),
            process: Arc::clone(&self.process),
            handlers: self.handlers.clone(),
        }
    }
}

impl<A, E> Statement<A, QueryResult, E> {
    /// Start a statement from a descriptor builder. With no processing steps
    /// attached, executing yields the raw [`QueryResult`] unchanged.
    ///
    /// The builder must be pure and deterministic for identical arguments;
    /// descriptor identifiers (and therefore log correlation) rely on it.
    pub fn new<F>(builder: F) -> Self
    where
        F: Fn(&A) -> QueryConfig + Send + Sync + 'static,
    {
        Self {
            build: Arc::new(builder),
            validate: None,
            process: Arc::new(|result, _ctx| result),
            handlers: Vec::new(),
        }
    }
}

impl<A, D, E> Statement<A, D, E> {
    /// Attach argument validation. It runs before the builder; a failure
    /// short-circuits execution entirely and no connection is touched.
    pub fn validate<F>(mut self, validator: F) -> Self
    where
        F: Fn(&A) -> Result<(), ArgsError> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(validator));
        self
    }

    /// Append a processing step. Steps run strictly in order; each receives
    /// the previous step's output and the execution context, and the final
    /// step's output type is the statement's success type.
    pub fn process_data<D2, F>(self, step: F) -> Statement<A, D2, E>
    where
        F: for<'a> Fn(D, &ProcessContext<'a, A>) -> D2 + Send + Sync + 'static,
        D: 'static,
        A: 'static,
    {
        let prev = self.process;
        Statement {
            build: self.build,
            validate: self.validate,
            process: Arc::new(move |result, ctx| step(prev(result, ctx), ctx)),
            handlers: self.handlers,
        }
    }

    /// Discard the result: the success value becomes `()` regardless of row
    /// content.
    pub fn process_to_void(self) -> Statement<A, (), E>
    where
        D: 'static,
        A: 'static,
    {
        self.process_data(|_, _| ())
    }

    /// Register an error handler. The matcher inspects a classified database
    /// error and returns `Some(info)` when it applies; the handler then maps
    /// the context plus the extracted info into the domain error. Handlers
    /// run in registration order and the first match wins; if none match,
    /// the original database error is returned as the failure.
    pub fn match_error<I, M, H>(mut self, matcher: M, handler: H) -> Self
    where
        M: for<'a> Fn(&ErrorContext<'a, A>) -> Option<I> + Send + Sync + 'static,
        H: for<'a> Fn(&ErrorContext<'a, A>, I) -> E + Send + Sync + 'static,
    {
        self.handlers
            .push(Arc::new(move |ctx| matcher(ctx).map(|info| handler(ctx, info))));
        self
    }

    /// Bind this statement to a runner with default arguments.
    pub fn prepare<'r>(&self, runner: &'r mut QueryRunner) -> PreparedQuery<'r, A, D, E>
    where
        A: Default,
    {
        PreparedQuery::new(runner, self.clone(), A::default())
    }

    /// Bind this statement to a runner with the given arguments.
    pub fn prepare_with<'r>(
        &self,
        runner: &'r mut QueryRunner,
        args: A,
    ) -> PreparedQuery<'r, A, D, E> {
        PreparedQuery::new(runner, self.clone(), args)
    }
}
