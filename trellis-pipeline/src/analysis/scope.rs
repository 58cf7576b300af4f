//! Lexical scope of a function body.

use std::collections::HashMap;

use trellis_ir::DescriptorId;

/// Values visible inside one function: its parameters, then `let`
/// bindings in statement order. A later `let` shadows an earlier binding
/// of the same name.
#[derive(Debug, Default)]
pub(crate) struct Scope {
    values: HashMap<String, DescriptorId>,
    type_params: Vec<String>,
}

impl Scope {
    pub(crate) fn for_function(type_params: &[String]) -> Self {
        Self {
            values: HashMap::new(),
            type_params: type_params.to_vec(),
        }
    }

    pub(crate) fn bind(&mut self, name: &str, id: DescriptorId) {
        self.values.insert(name.to_string(), id);
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<DescriptorId> {
        self.values.get(name).copied()
    }

    pub(crate) fn type_params(&self) -> &[String] {
        &self.type_params
    }
}
