//! Function bindings served by the host.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::TriggerKind;

/// Binds a function name to its trigger and input binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionBinding {
    pub function_name: String,
    pub trigger: TriggerKind,
    pub binding: String,
}

impl FunctionBinding {
    pub fn new(function_name: impl Into<String>, trigger: TriggerKind) -> Self {
        Self {
            function_name: function_name.into(),
            trigger,
            binding: trigger.default_binding().to_string(),
        }
    }

    pub fn with_binding(mut self, binding: impl Into<String>) -> Self {
        self.binding = binding.into();
        self
    }
}

/// Lookup of function bindings by function name.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionBinding>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The benchmark function set, one function per trigger kind.
    pub fn benchmark() -> Self {
        let mut registry = Self::new();
        for (name, trigger) in [
            ("HttpTrigger", TriggerKind::Http),
            ("QueueTrigger", TriggerKind::Queue),
            ("EventHubTrigger", TriggerKind::EventHub),
            ("EventGridTrigger", TriggerKind::EventGrid),
            ("ServiceBusTrigger", TriggerKind::ServiceBus),
            ("BlobTrigger", TriggerKind::Blob),
            ("CosmosTrigger", TriggerKind::Cosmos),
            ("SqlTrigger", TriggerKind::Database),
        ] {
            registry.register(FunctionBinding::new(name, trigger));
        }
        registry
    }

    pub fn register(&mut self, binding: FunctionBinding) {
        self.functions.insert(binding.function_name.clone(), binding);
    }

    pub fn get(&self, function_name: &str) -> Option<&FunctionBinding> {
        self.functions.get(function_name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Function names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
