//! Name-keyed table of functions and their definitions.

use super::builtins;
use super::definition::FuncDefinition;
use super::func::Func;
use crate::config::QuibConfig;
use crate::quib_error::QuibError;
use hashbrown::HashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Definition for functions nobody registered: no data arguments, so every
/// quib argument is a parameter and every change invalidates the whole
/// result; no inverters, so assignments stop here.
static DEFAULT_DEFINITION: Lazy<Arc<FuncDefinition>> =
    Lazy::new(|| Arc::new(FuncDefinition::builder("default").build()));

/// Function lookup for a session. Populated once at startup; quibs hold
/// the resolved [`Func`] and definition, never the registry.
#[derive(Clone, Debug, Default)]
pub struct FuncRegistry {
    funcs: HashMap<String, Func>,
    definitions: HashMap<String, Arc<FuncDefinition>>,
}

impl FuncRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in function family.
    pub fn with_builtins(config: &QuibConfig) -> Self {
        let mut registry = Self::new();
        builtins::register_all(&mut registry, config);
        registry
    }

    /// Register a callable together with its definition.
    pub fn register(&mut self, func: Func, definition: FuncDefinition) {
        let name = func.name().to_string();
        self.definitions.insert(name.clone(), Arc::new(definition));
        self.funcs.insert(name, func);
    }

    /// Register a definition for functions built elsewhere (such as
    /// [`getitem`](super::getitem), which captures its index).
    pub fn register_definition(&mut self, definition: FuncDefinition) {
        self.definitions.insert(definition.name.clone(), Arc::new(definition));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    /// # Errors
    /// `UnknownFunction` if `name` was never registered.
    pub fn get_func(&self, name: &str) -> Result<Func, QuibError> {
        self.funcs
            .get(name)
            .cloned()
            .ok_or_else(|| QuibError::UnknownFunction(name.to_string()))
    }

    /// The function's own definition, else the one registered under its
    /// name, else the default.
    pub fn get_definition_for_function(&self, func: &Func) -> Arc<FuncDefinition> {
        if let Some(own) = func.definition() {
            return Arc::clone(own);
        }
        self.definitions
            .get(func.name())
            .cloned()
            .unwrap_or_else(|| Arc::clone(&DEFAULT_DEFINITION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Value;

    #[test]
    fn unknown_functions_get_the_default_definition() {
        let registry = FuncRegistry::new();
        let f = Func::new("mystery", |_| Ok(Value::from(0)));
        let def = registry.get_definition_for_function(&f);
        assert!(def.data_arguments.is_empty());
        assert!(def.inverters.is_empty());
        assert!(matches!(registry.get_func("mystery"), Err(QuibError::UnknownFunction(_))));
    }

    #[test]
    fn own_definition_wins() {
        let mut registry = FuncRegistry::new();
        registry.register_definition(FuncDefinition::builder("f").data_args([0]).build());
        let plain = Func::new("f", |_| Ok(Value::from(0)));
        assert_eq!(registry.get_definition_for_function(&plain).data_arguments.len(), 1);
        let own = plain.clone().with_definition(FuncDefinition::builder("f").random().build());
        assert!(registry.get_definition_for_function(&own).is_random);
    }

    #[test]
    fn builtins_are_registered() {
        let registry = FuncRegistry::with_builtins(&QuibConfig::default());
        for name in ["iquib", "add", "sum", "reshape", "concatenate", "zeros_like", "arange", "random"] {
            assert!(registry.contains(name), "{name} missing");
        }
    }
}
