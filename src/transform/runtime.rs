//! Compiled statements and the per-record execution loop.

use serde::Deserialize;
use tracing::{debug, warn};

use super::contexts::TransformContext;
use super::error::{CompileError, ExecutionError, RuntimeError, StatementError};
use super::parser::parse_statement;
use super::registry::{ExprFunc, FunctionRegistry};
use crate::model::Value;

/// What to do when a statement fails on a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Stop and return the first failure.
    #[default]
    Propagate,
    /// Log the failure and move on to the next statement.
    Ignore,
}

/// One compiled statement. Cloning shares the compiled closure.
pub struct Statement<C: TransformContext> {
    text: String,
    func: ExprFunc<C>,
}

impl<C: TransformContext> Clone for Statement<C> {
    fn clone(&self) -> Self {
        Statement {
            text: self.text.clone(),
            func: self.func.clone(),
        }
    }
}

impl<C: TransformContext> std::fmt::Debug for Statement<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("context", &C::NAME)
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

impl<C: TransformContext> Statement<C> {
    /// Parse, bind and build `text` against `registry`.
    pub fn compile(text: &str, registry: &FunctionRegistry<C>) -> Result<Self, StatementError> {
        let wrap = |source: CompileError| StatementError {
            statement: text.to_string(),
            source,
        };
        let invocation = parse_statement(text).map_err(|e| wrap(e.into()))?;
        let func = registry.compile_invocation(&invocation).map_err(wrap)?;
        debug!(context = C::NAME, statement = text, "compiled statement");
        Ok(Statement {
            text: text.to_string(),
            func,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Apply the statement to one context.
    pub fn execute(&self, ctx: &mut C) -> Result<Value, RuntimeError> {
        (self.func)(ctx)
    }
}

/// Statements applied in order to each record.
pub struct Statements<C: TransformContext> {
    statements: Vec<Statement<C>>,
}

impl<C: TransformContext> Clone for Statements<C> {
    fn clone(&self) -> Self {
        Statements {
            statements: self.statements.clone(),
        }
    }
}

impl<C: TransformContext> std::fmt::Debug for Statements<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.statements).finish()
    }
}

impl<C: TransformContext> Default for Statements<C> {
    fn default() -> Self {
        Statements {
            statements: Vec::new(),
        }
    }
}

impl<C: TransformContext> Statements<C> {
    /// Compile every statement; the first failure aborts the whole list.
    pub fn compile<S: AsRef<str>>(
        texts: &[S],
        registry: &FunctionRegistry<C>,
    ) -> Result<Self, StatementError> {
        let statements = texts
            .iter()
            .map(|text| Statement::compile(text.as_ref(), registry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Statements { statements })
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Statement<C>> {
        self.statements.iter()
    }

    /// Run every statement against `ctx` in declared order. Each statement
    /// sees the mutations of the ones before it.
    pub fn execute(&self, ctx: &mut C, mode: ErrorMode) -> Result<(), ExecutionError> {
        for statement in &self.statements {
            if let Err(source) = statement.execute(ctx) {
                match mode {
                    ErrorMode::Propagate => {
                        return Err(ExecutionError {
                            statement: statement.text.clone(),
                            record: ctx.describe(),
                            source,
                        });
                    }
                    ErrorMode::Ignore => {
                        warn!(
                            context = C::NAME,
                            statement = %statement.text,
                            record = %ctx.describe(),
                            error = %source,
                            "statement failed, continuing"
                        );
                    }
                }
            }
        }
        Ok(())
    }
}
