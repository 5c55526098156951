//! Service definition loader
//!
//! Reads the `metadata`, `operations` and `shapes` sections of an AWS service
//! definition file. Object order is preserved so structure members keep the
//! order they are declared in.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{Error, Result},
    shape::{
        Http, ListShape, Location, MapShape, Member, Operation, Protocol, ScalarShape,
        ScalarType, Shape, ShapeId, ShapeKind, StructureMember, StructureShape,
        TimestampFormat,
    },
    JsonMap, ServiceMetadata, ShapeModel,
};

#[derive(Deserialize)]
struct ServiceDef {
    #[serde(default)]
    metadata: MetadataDef,
    #[serde(default)]
    operations: JsonMap,
    shapes: JsonMap,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataDef {
    #[serde(default)]
    api_version: String,
    protocol: Option<String>,
    #[serde(default)]
    protocols: Vec<String>,
    service_id: Option<String>,
    endpoint_prefix: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationDef {
    name: Option<String>,
    #[serde(default)]
    http: HttpDef,
    input: Option<ShapeRefDef>,
    output: Option<ShapeRefDef>,
    #[serde(default)]
    deprecated: bool,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HttpDef {
    #[serde(default)]
    method: String,
    #[serde(default)]
    request_uri: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShapeRefDef {
    shape: String,
    location_name: Option<String>,
    location: Option<Location>,
    #[serde(default)]
    xml_attribute: bool,
    #[serde(default)]
    streaming: bool,
    #[serde(default)]
    deprecated: bool,
    #[serde(default)]
    flattened: bool,
    timestamp_format: Option<TimestampFormat>,
    result_wrapper: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShapeDef {
    #[serde(rename = "type")]
    ty: String,
    member: Option<ShapeRefDef>,
    key: Option<ShapeRefDef>,
    value: Option<ShapeRefDef>,
    #[serde(default)]
    members: JsonMap,
    #[serde(default)]
    required: Vec<String>,
    payload: Option<String>,
    #[serde(default)]
    flattened: bool,
    timestamp_format: Option<TimestampFormat>,
    #[serde(default)]
    streaming: bool,
    result_wrapper: Option<String>,
    xml_namespace: Option<XmlNamespaceDef>,
}

#[derive(Deserialize)]
struct XmlNamespaceDef {
    uri: Option<String>,
}

/// Parse a service definition document into a [`ShapeModel`]
pub(crate) fn load(json: &str) -> Result<ShapeModel> {
    let def: ServiceDef = serde_json::from_str(json)?;

    let mut defs = Vec::with_capacity(def.shapes.len());
    let mut by_name = HashMap::with_capacity(def.shapes.len());
    for (ix, (name, value)) in def.shapes.into_iter().enumerate() {
        let shape: ShapeDef = serde_json::from_value(value)
            .map_err(|e| Error::InvalidModel(format!("shape {name}: {e}")))?;
        by_name.insert(name.clone(), ShapeId(ix as u32));
        defs.push((name, shape));
    }

    let resolver = Resolver { by_name: &by_name, defs: &defs };
    let mut shapes = Vec::with_capacity(defs.len());
    for (name, shape) in defs.iter() {
        shapes.push(resolver.shape(name, shape)?);
    }

    let protocol = def
        .metadata
        .protocol
        .as_deref()
        .or_else(|| def.metadata.protocols.first().map(String::as_str))
        .ok_or_else(|| Error::InvalidModel("metadata.protocol is missing".to_string()))?
        .parse::<Protocol>()?;

    let mut operations = Vec::with_capacity(def.operations.len());
    for (name, value) in def.operations.into_iter() {
        let op: OperationDef = serde_json::from_value(value)
            .map_err(|e| Error::InvalidModel(format!("operation {name}: {e}")))?;
        let input = op.input.as_ref().map(|r| resolver.id(&r.shape)).transpose()?;
        let output = op.output.as_ref().map(|r| resolver.id(&r.shape)).transpose()?;
        if let (Some(id), Some(wrapper)) =
            (output, op.output.as_ref().and_then(|r| r.result_wrapper.clone()))
        {
            match &mut shapes[id.index()].kind {
                ShapeKind::Structure(s) => s.result_wrapper = Some(wrapper),
                _ => {
                    return Err(Error::InvalidModel(format!(
                        "output of operation {name} is not a structure"
                    )))
                }
            }
        }
        operations.push(Operation {
            name: op.name.unwrap_or(name),
            api_version: def.metadata.api_version.clone(),
            protocol,
            http: Http { method: op.http.method, request_uri: op.http.request_uri },
            input,
            output,
            deprecated: op.deprecated,
        });
    }
    debug!(
        shapes = shapes.len(),
        operations = operations.len(),
        %protocol,
        "loaded service definition"
    );

    Ok(ShapeModel {
        shapes,
        by_name,
        operations,
        metadata: ServiceMetadata {
            api_version: def.metadata.api_version,
            protocol,
            service_id: def.metadata.service_id,
            endpoint_prefix: def.metadata.endpoint_prefix,
        },
    })
}

struct Resolver<'a> {
    by_name: &'a HashMap<String, ShapeId>,
    defs: &'a [(String, ShapeDef)],
}

impl<'a> Resolver<'a> {
    fn id(&self, name: &str) -> Result<ShapeId> {
        self.by_name.get(name).copied().ok_or_else(|| Error::ShapeNotFound(name.to_string()))
    }

    fn member(&self, def: &ShapeRefDef) -> Result<Member> {
        let shape = self.id(&def.shape)?;
        let target = &self.defs[shape.index()].1;
        let mut member = Member::new(shape);
        member.location_name = def.location_name.clone();
        member.location = def.location;
        member.xml_attribute = def.xml_attribute;
        member.streaming = def.streaming || target.streaming;
        member.deprecated = def.deprecated;
        member.flattened = def.flattened;
        member.timestamp_format = def.timestamp_format;
        Ok(member)
    }

    fn required_member(
        &self,
        owner: &str,
        field: &str,
        def: &Option<ShapeRefDef>,
    ) -> Result<Member> {
        match def {
            Some(def) => self.member(def),
            None => Err(Error::InvalidModel(format!("{owner} is missing '{field}'"))),
        }
    }

    fn shape(&self, name: &str, def: &ShapeDef) -> Result<Shape> {
        let kind = match def.ty.as_str() {
            "structure" => {
                let mut members = Vec::with_capacity(def.members.len());
                for (member_name, value) in def.members.iter() {
                    let member_def: ShapeRefDef = serde_json::from_value(value.clone())
                        .map_err(|e| {
                            Error::InvalidModel(format!("member {name}.{member_name}: {e}"))
                        })?;
                    let required = def.required.iter().any(|r| r == member_name);
                    members.push(StructureMember::new(
                        member_name.clone(),
                        required,
                        self.member(&member_def)?,
                    ));
                }
                if let Some(missing) =
                    def.required.iter().find(|r| !def.members.contains_key(r.as_str()))
                {
                    return Err(Error::InvalidModel(format!(
                        "structure {name} requires undeclared member {missing}"
                    )));
                }
                if let Some(payload) = &def.payload {
                    if !def.members.contains_key(payload.as_str()) {
                        return Err(Error::MemberNotFound(name.to_string(), payload.clone()));
                    }
                }
                ShapeKind::Structure(StructureShape {
                    members,
                    payload: def.payload.clone(),
                    result_wrapper: def.result_wrapper.clone(),
                    xml_namespace: def.xml_namespace.as_ref().and_then(|ns| ns.uri.clone()),
                })
            }
            "list" => ShapeKind::List(ListShape {
                member: self.required_member(name, "member", &def.member)?,
                flattened: def.flattened,
            }),
            "map" => ShapeKind::Map(MapShape {
                key: self.required_member(name, "key", &def.key)?,
                value: self.required_member(name, "value", &def.value)?,
                flattened: def.flattened,
            }),
            other => ShapeKind::Scalar(ScalarShape {
                ty: ScalarType::from(other),
                timestamp_format: def.timestamp_format,
                streaming: def.streaming,
            }),
        };
        Ok(Shape { name: name.to_string(), kind })
    }
}
