//! Native type names for generated structures

use std::{
    collections::{HashMap, HashSet},
    sync::RwLock,
};

use inflector::cases::pascalcase::to_pascal_case;

use crate::{
    error::{Error, Result},
    ShapeId, ShapeKind, ShapeModel,
};

/// Which side of an operation a shape is being named for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Input,
    Output,
}

/// Resolves a shape to the fully-qualified path of its generated type.
/// Implementations must be pure in shape identity: the same (shape, role)
/// always yields the same name.
pub trait NamingRegistry {
    fn resolve_type_name(&self, shape: ShapeId, role: Role) -> Result<String>;
}

/// Names operation inputs `{ns}::input::{Name}`, operation outputs
/// `{ns}::result::{Name}` and every other structure `{ns}::value::{Name}`.
pub struct DefaultNamingRegistry<'m> {
    model: &'m ShapeModel,
    namespace: String,
    inputs: HashSet<ShapeId>,
    outputs: HashSet<ShapeId>,
    cache: RwLock<HashMap<(ShapeId, Role), String>>,
}

impl<'m> DefaultNamingRegistry<'m> {
    pub fn new(model: &'m ShapeModel, namespace: &str) -> Self {
        let inputs = model.operations().filter_map(|op| op.input).collect();
        let outputs = model.operations().filter_map(|op| op.output).collect();
        DefaultNamingRegistry {
            model,
            namespace: namespace.trim_end_matches("::").to_string(),
            inputs,
            outputs,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn module_for(&self, shape: ShapeId, role: Role) -> &'static str {
        match role {
            Role::Input if self.inputs.contains(&shape) => "input",
            Role::Output if self.outputs.contains(&shape) => "result",
            _ => "value",
        }
    }
}

impl NamingRegistry for DefaultNamingRegistry<'_> {
    fn resolve_type_name(&self, shape: ShapeId, role: Role) -> Result<String> {
        if let Ok(cache) = self.cache.read() {
            if let Some(name) = cache.get(&(shape, role)) {
                return Ok(name.clone());
            }
        }
        let def = self.model.shape(shape);
        if !matches!(def.kind, ShapeKind::Structure(_)) {
            return Err(Error::MissingNamingResolution(def.name.clone(), role));
        }
        let name = format!(
            "{}::{}::{}",
            self.namespace,
            self.module_for(shape, role),
            to_pascal_case(&def.name)
        );
        if let Ok(mut cache) = self.cache.write() {
            cache.insert((shape, role), name.clone());
        }
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    const MODEL: &str = r#"{
        "metadata": { "apiVersion": "2016-11-15", "protocol": "rest-json" },
        "operations": {
            "GetThing": {
                "http": { "method": "GET", "requestUri": "/things/{Id}" },
                "input": { "shape": "GetThingRequest" },
                "output": { "shape": "GetThingResponse" }
            }
        },
        "shapes": {
            "GetThingRequest": { "type": "structure", "members": { "Id": { "shape": "String" } } },
            "GetThingResponse": {
                "type": "structure",
                "members": { "Thing": { "shape": "thing" } }
            },
            "thing": { "type": "structure", "members": { "Name": { "shape": "String" } } },
            "String": { "type": "string" }
        }
    }"#;

    #[test_case("GetThingRequest", Role::Input, "ns::input::GetThingRequest" ; "input")]
    #[test_case("GetThingResponse", Role::Output, "ns::result::GetThingResponse" ; "output")]
    #[test_case("thing", Role::Output, "ns::value::Thing" ; "nested structure")]
    #[test_case("thing", Role::Input, "ns::value::Thing" ; "nested structure in both roles")]
    #[test_case("GetThingRequest", Role::Output, "ns::value::GetThingRequest" ; "input as output")]
    fn names_follow_operation_roles(shape: &str, role: Role, expected: &str) {
        let model = ShapeModel::from_json(MODEL).unwrap();
        let registry = DefaultNamingRegistry::new(&model, "ns::");
        let id = model.shape_id(shape).unwrap();
        assert_eq!(registry.resolve_type_name(id, role).unwrap(), expected);
    }

    #[test]
    fn resolution_is_memoized() {
        let model = ShapeModel::from_json(MODEL).unwrap();
        let registry = DefaultNamingRegistry::new(&model, "ns");
        let thing = model.shape_id("thing").unwrap();
        let first = registry.resolve_type_name(thing, Role::Input).unwrap();
        let second = registry.resolve_type_name(thing, Role::Input).unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.cache.read().unwrap().len(), 1);
    }

    #[test]
    fn scalars_have_no_type_name() {
        let model = ShapeModel::from_json(MODEL).unwrap();
        let registry = DefaultNamingRegistry::new(&model, "ns");
        let string = model.shape_id("String").unwrap();
        assert!(matches!(
            registry.resolve_type_name(string, Role::Input),
            Err(Error::MissingNamingResolution(name, Role::Input)) if name == "String"
        ));
    }
}
