//! Statement execution over a bound runner.

use crate::error::{RunnerError, StatementError};
use crate::query::QueryRunner;
use crate::statement::statement::{ErrorContext, ProcessContext, Statement};

/// A statement bound to a runner and a set of arguments, ready to execute.
///
/// Borrowing the runner mutably means a prepared query participates in
/// whatever transaction the runner currently holds, and no other query can
/// interleave on the same runner while this one is alive.
pub struct PreparedQuery<'r, A, D, E> {
    runner: &'r mut QueryRunner,
    statement: Statement<A, D, E>,
    args: A,
}

impl<'r, A, D, E> PreparedQuery<'r, A, D, E> {
    pub(crate) fn new(runner: &'r mut QueryRunner, statement: Statement<A, D, E>, args: A) -> Self {
        Self {
            runner,
            statement,
            args,
        }
    }

    pub fn args(&self) -> &A {
        &self.args
    }

    pub fn args_mut(&mut self) -> &mut A {
        &mut self.args
    }

    /// Replace the bound arguments, e.g. to run the same statement several
    /// times inside one transaction.
    pub fn set_args(&mut self, args: A) -> &mut Self {
        self.args = args;
        self
    }

    /// Run the full pipeline: validate the arguments, build the descriptor,
    /// execute it on the bound runner, then either transform the result
    /// through the processing chain or classify the failure through the
    /// error handlers (first match wins).
    pub async fn execute(&mut self) -> Result<D, StatementError<E>> {
        if let Some(validate) = &self.statement.validate {
            validate(&self.args).map_err(StatementError::Args)?;
        }
        let config = (self.statement.build)(&self.args);

        match self.runner.query(config.clone()).await {
            Ok(result) => {
                let ctx = ProcessContext {
                    config: &config,
                    args: &self.args,
                };
                Ok((self.statement.process)(result, &ctx))
            }
            Err(RunnerError::Database(error)) => {
                let ctx = ErrorContext {
                    error: &error,
                    config: &config,
                    args: &self.args,
                };
                for handler in &self.statement.handlers {
                    if let Some(domain) = handler(&ctx) {
                        return Err(StatementError::Domain(domain));
                    }
                }
                Err(StatementError::Database(error))
            }
            Err(RunnerError::Fault(fault)) => Err(StatementError::Fault(fault)),
        }
    }
}

impl QueryRunner {
    /// Bind a statement to this runner with default arguments.
    pub fn prepare<A, D, E>(&mut self, statement: &Statement<A, D, E>) -> PreparedQuery<'_, A, D, E>
    where
        A: Default,
    {
        statement.prepare(self)
    }

    /// Bind a statement to this runner with the given arguments.
    pub fn prepare_with<A, D, E>(
        &mut self,
        statement: &Statement<A, D, E>,
        args: A,
    ) -> PreparedQuery<'_, A, D, E> {
        statement.prepare_with(self, args)
    }
}
