//! Shape model for AWS service definitions
//!
//! - [`ShapeModel`] is an immutable arena of shapes loaded from a service
//!   definition json file, plus the service's operations
//! - [`registry`] maps shapes to the names of their generated native types
#![forbid(unsafe_code)]

mod error;
mod loader;
pub mod registry;
pub mod shape;

use std::{collections::HashMap, path::Path};

pub use error::{Error, Result};
pub use registry::{DefaultNamingRegistry, NamingRegistry, Role};
pub use shape::{
    Http, ListShape, Location, MapShape, Member, Operation, Protocol, ScalarShape, ScalarType,
    Shape, ShapeId, ShapeKind, StructureMember, StructureShape, TimestampFormat,
};

pub(crate) type JsonMap = serde_json::Map<String, serde_json::Value>;

#[derive(Clone, Debug)]
pub struct ServiceMetadata {
    pub api_version: String,
    pub protocol: Protocol,
    pub service_id: Option<String>,
    pub endpoint_prefix: Option<String>,
}

impl ServiceMetadata {
    /// `serviceId`, or the endpoint prefix for older definitions without one
    pub fn service_name(&self) -> Option<&str> {
        self.service_id.as_deref().or(self.endpoint_prefix.as_deref())
    }
}

/// All shapes and operations of one service
#[derive(Debug)]
pub struct ShapeModel {
    shapes: Vec<Shape>,
    by_name: HashMap<String, ShapeId>,
    operations: Vec<Operation>,
    metadata: ServiceMetadata,
}

impl ShapeModel {
    /// Parse a service definition document
    pub fn from_json(json: &str) -> Result<ShapeModel> {
        loader::load(json)
    }

    /// Read and parse a service definition file
    pub fn from_path(path: &Path) -> Result<ShapeModel> {
        let json = std::fs::read_to_string(path)?;
        loader::load(&json)
    }

    pub fn metadata(&self) -> &ServiceMetadata {
        &self.metadata
    }

    /// Returns the shape. Ids are only handed out by this model, so the lookup cannot miss.
    pub fn shape(&self, id: ShapeId) -> &Shape {
        &self.shapes[id.index()]
    }

    pub fn shape_id(&self, name: &str) -> Result<ShapeId> {
        self.by_name.get(name).copied().ok_or_else(|| Error::ShapeNotFound(name.to_string()))
    }

    /// Iterates shapes in declaration order
    pub fn shapes(&self) -> impl Iterator<Item = (ShapeId, &Shape)> {
        self.shapes.iter().enumerate().map(|(ix, shape)| (ShapeId(ix as u32), shape))
    }

    pub fn structure(&self, id: ShapeId) -> Result<&StructureShape> {
        let shape = self.shape(id);
        match &shape.kind {
            ShapeKind::Structure(s) => Ok(s),
            other => Err(Error::InvalidModel(format!(
                "{} is a {}, not a structure",
                shape.name,
                other.kind_name()
            ))),
        }
    }

    /// Members of a structure, in the order they are declared in the source model
    pub fn members(&self, id: ShapeId) -> Result<&[StructureMember]> {
        Ok(&self.structure(id)?.members)
    }

    pub fn member(&self, id: ShapeId, name: &str) -> Result<&StructureMember> {
        self.members(id)?
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| Error::MemberNotFound(self.shape(id).name.clone(), name.to_string()))
    }

    pub fn operation(&self, name: &str) -> Result<&Operation> {
        self.operations
            .iter()
            .find(|op| op.name == name)
            .ok_or_else(|| Error::OperationNotFound(name.to_string()))
    }

    /// Iterates operations in declaration order
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    const MODEL: &str = r#"{
        "metadata": { "apiVersion": "2010-03-31", "protocol": "query", "serviceId": "SNS" },
        "operations": {
            "CreateTopic": {
                "name": "CreateTopic",
                "http": { "method": "POST", "requestUri": "/" },
                "input": { "shape": "CreateTopicInput" },
                "output": { "shape": "CreateTopicResponse", "resultWrapper": "CreateTopicResult" }
            }
        },
        "shapes": {
            "CreateTopicInput": {
                "type": "structure",
                "required": ["Name"],
                "members": {
                    "Name": { "shape": "topicName" },
                    "Tags": { "shape": "TagList" },
                    "Attributes": { "shape": "TopicAttributesMap" }
                }
            },
            "CreateTopicResponse": {
                "type": "structure",
                "members": { "TopicArn": { "shape": "topicARN" } }
            },
            "TagList": { "type": "list", "member": { "shape": "Tag" } },
            "Tag": {
                "type": "structure",
                "required": ["Key", "Value"],
                "members": { "Key": { "shape": "topicName" }, "Value": { "shape": "topicName" } }
            },
            "TopicAttributesMap": {
                "type": "map",
                "key": { "shape": "topicName", "locationName": "key" },
                "value": { "shape": "topicName", "locationName": "value" }
            },
            "topicName": { "type": "string" },
            "topicARN": { "type": "string" }
        }
    }"#;

    #[test]
    fn members_keep_declaration_order() {
        let model = ShapeModel::from_json(MODEL).unwrap();
        let input = model.shape_id("CreateTopicInput").unwrap();
        let names: Vec<&str> =
            model.members(input).unwrap().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Name", "Tags", "Attributes"]);
        assert!(model.member(input, "Name").unwrap().required);
        assert!(!model.member(input, "Tags").unwrap().required);
    }

    #[test]
    fn missing_member_is_reported() {
        let model = ShapeModel::from_json(MODEL).unwrap();
        let input = model.shape_id("CreateTopicInput").unwrap();
        assert!(matches!(
            model.member(input, "Nope"),
            Err(Error::MemberNotFound(s, m)) if s == "CreateTopicInput" && m == "Nope"
        ));
    }

    #[test]
    fn result_wrapper_moves_onto_output_structure() {
        let model = ShapeModel::from_json(MODEL).unwrap();
        let op = model.operation("CreateTopic").unwrap();
        assert_eq!(op.api_version, "2010-03-31");
        assert_eq!(op.protocol, Protocol::Query);
        let output = model.structure(op.output.unwrap()).unwrap();
        assert_eq!(output.result_wrapper.as_deref(), Some("CreateTopicResult"));
    }

    #[test]
    fn shared_shapes_resolve_to_one_id() {
        let model = ShapeModel::from_json(MODEL).unwrap();
        let tag = model.shape_id("Tag").unwrap();
        let key = model.member(tag, "Key").unwrap().shape;
        let value = model.member(tag, "Value").unwrap().shape;
        assert_eq!(key, value);
    }

    #[test]
    fn dangling_reference_fails() {
        let json = r#"{
            "metadata": { "apiVersion": "1", "protocol": "rest-json" },
            "shapes": { "A": { "type": "list", "member": { "shape": "Missing" } } }
        }"#;
        assert!(matches!(
            ShapeModel::from_json(json),
            Err(Error::ShapeNotFound(s)) if s == "Missing"
        ));
    }

    #[test]
    fn undeclared_required_member_fails() {
        let json = r#"{
            "metadata": { "apiVersion": "1", "protocol": "rest-json" },
            "shapes": { "A": { "type": "structure", "required": ["B"], "members": {} } }
        }"#;
        assert!(matches!(ShapeModel::from_json(json), Err(Error::InvalidModel(_))));
    }

    #[test_case("string", ScalarType::String ; "string")]
    #[test_case("long", ScalarType::Long ; "long")]
    #[test_case("float", ScalarType::Float ; "float")]
    #[test_case("timestamp", ScalarType::Timestamp ; "timestamp")]
    #[test_case("document", ScalarType::Other("document".into()) ; "unknown types are kept")]
    fn scalar_types_parse(ty: &str, expected: ScalarType) {
        let json = format!(
            r#"{{
                "metadata": {{ "apiVersion": "1", "protocol": "json" }},
                "shapes": {{ "Doc": {{ "type": "{ty}" }} }}
            }}"#
        );
        let model = ShapeModel::from_json(&json).unwrap();
        let doc = model.shape(model.shape_id("Doc").unwrap());
        assert!(matches!(&doc.kind, ShapeKind::Scalar(s) if s.ty == expected));
    }

    #[test]
    fn service_name_falls_back_to_endpoint_prefix() {
        let model = ShapeModel::from_json(MODEL).unwrap();
        assert_eq!(model.metadata().service_name(), Some("SNS"));
        let json = r#"{
            "metadata": { "apiVersion": "1", "protocol": "json", "endpointPrefix": "dynamodb" },
            "shapes": {}
        }"#;
        let model = ShapeModel::from_json(json).unwrap();
        assert_eq!(model.metadata().service_name(), Some("dynamodb"));
    }

    #[test_case("query", Protocol::Query ; "query")]
    #[test_case("json", Protocol::Json ; "json")]
    #[test_case("rest-json", Protocol::RestJson ; "rest json")]
    #[test_case("rest-xml", Protocol::RestXml ; "rest xml")]
    #[test_case("ec2", Protocol::Ec2 ; "ec2")]
    fn protocols_parse(name: &str, expected: Protocol) {
        let json = format!(
            r#"{{ "metadata": {{ "apiVersion": "1", "protocol": "{name}" }}, "shapes": {{}} }}"#
        );
        assert_eq!(ShapeModel::from_json(&json).unwrap().metadata().protocol, expected);
    }
}
