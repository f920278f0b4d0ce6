//! Function factories and the per-context registry that holds them.

use super::arguments::{bind, BoundArguments, Parameter};
use super::contexts::TransformContext;
use super::error::{BuildError, CompileError, RegistryError, RuntimeError};
use super::parser::Invocation;
use crate::model::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A compiled call. Immutable once built and shared across worker threads.
pub type ExprFunc<C> = Arc<dyn Fn(&mut C) -> Result<Value, RuntimeError> + Send + Sync>;

type Builder<C> =
    Arc<dyn Fn(BoundArguments<C>) -> Result<ExprFunc<C>, BuildError> + Send + Sync>;

/// Wraps a closure as an [`ExprFunc`].
pub fn expr_func<C, F>(f: F) -> ExprFunc<C>
where
    F: Fn(&mut C) -> Result<Value, RuntimeError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A named recipe: declared parameters plus a builder that turns bound
/// arguments into an [`ExprFunc`].
pub struct FunctionFactory<C: TransformContext> {
    name: &'static str,
    parameters: &'static [Parameter],
    builder: Builder<C>,
}

impl<C: TransformContext> FunctionFactory<C> {
    pub fn new<B>(name: &'static str, parameters: &'static [Parameter], builder: B) -> Self
    where
        B: Fn(BoundArguments<C>) -> Result<ExprFunc<C>, BuildError> + Send + Sync + 'static,
    {
        FunctionFactory {
            name,
            parameters,
            builder: Arc::new(builder),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parameters(&self) -> &'static [Parameter] {
        self.parameters
    }

    /// Runs the builder. Semantic validation of argument values happens here.
    pub fn build(&self, arguments: BoundArguments<C>) -> Result<ExprFunc<C>, BuildError> {
        (self.builder)(arguments)
    }
}

impl<C: TransformContext> Clone for FunctionFactory<C> {
    fn clone(&self) -> Self {
        FunctionFactory {
            name: self.name,
            parameters: self.parameters,
            builder: Arc::clone(&self.builder),
        }
    }
}

impl<C: TransformContext> fmt::Debug for FunctionFactory<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionFactory")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Name -> factory map for one context kind. Lookup is exact and
/// case-sensitive.
pub struct FunctionRegistry<C: TransformContext> {
    factories: HashMap<&'static str, FunctionFactory<C>>,
}

impl<C: TransformContext> Default for FunctionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: TransformContext> FunctionRegistry<C> {
    pub fn new() -> Self {
        FunctionRegistry {
            factories: HashMap::new(),
        }
    }

    pub fn register(&mut self, factory: FunctionFactory<C>) -> Result<(), RegistryError> {
        validate_parameters(factory.name, factory.parameters)?;
        if self.factories.contains_key(factory.name) {
            return Err(RegistryError::DuplicateFunction(factory.name.to_string()));
        }
        self.factories.insert(factory.name, factory);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&FunctionFactory<C>, CompileError> {
        self.factories
            .get(name)
            .ok_or_else(|| CompileError::UnknownFunction(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Lookup, bind and build one call. Nested calls in the arguments are
    /// compiled recursively against this same registry.
    pub fn compile_invocation(&self, invocation: &Invocation) -> Result<ExprFunc<C>, CompileError> {
        let factory = self.lookup(&invocation.function)?;
        let arguments =
            bind(factory.parameters, &invocation.arguments, self).map_err(|source| {
                CompileError::Bind {
                    function: invocation.function.clone(),
                    source,
                }
            })?;
        factory
            .build(arguments)
            .map_err(|source| CompileError::Build {
                function: invocation.function.clone(),
                source,
            })
    }
}

/// Keywords are unique, optional parameters carry a default that fits their
/// kind, and no optional parameter precedes a required one.
fn validate_parameters(
    function: &'static str,
    parameters: &'static [Parameter],
) -> Result<(), RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidSchema { function, reason };
    let mut seen_optional = false;
    for (position, param) in parameters.iter().enumerate() {
        if parameters[..position]
            .iter()
            .any(|p| p.keyword == param.keyword)
        {
            return Err(invalid(format!("duplicate keyword `{}`", param.keyword)));
        }
        if param.required {
            if seen_optional {
                return Err(invalid(format!(
                    "required parameter `{}` follows an optional one",
                    param.keyword
                )));
            }
            continue;
        }
        seen_optional = true;
        match param.default {
            Some(default) if default.fits(param.kind) => {}
            Some(_) => {
                return Err(invalid(format!(
                    "default of `{}` does not fit {}",
                    param.keyword, param.kind
                )))
            }
            None => {
                return Err(invalid(format!(
                    "optional parameter `{}` has no default",
                    param.keyword
                )))
            }
        }
    }
    Ok(())
}
