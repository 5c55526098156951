//! Shape definitions
//!
//! Shapes live in an arena owned by [`ShapeModel`](crate::ShapeModel) and are
//! addressed by [`ShapeId`]. Members hold ids, never references, so a shape
//! shared by several members is stored once and compared by index.

use std::{fmt, ops::Deref, str::FromStr};

use serde::Deserialize;

/// Index of a shape in its model's arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub(crate) u32);

impl ShapeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
pub struct Shape {
    pub name: String,
    pub kind: ShapeKind,
}

#[derive(Clone, Debug)]
pub enum ShapeKind {
    Scalar(ScalarShape),
    List(ListShape),
    Map(MapShape),
    Structure(StructureShape),
}

impl ShapeKind {
    /// Lower-case kind name as it appears in service definitions
    pub fn kind_name(&self) -> &str {
        match self {
            ShapeKind::Scalar(s) => s.ty.as_str(),
            ShapeKind::List(_) => "list",
            ShapeKind::Map(_) => "map",
            ShapeKind::Structure(_) => "structure",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    Blob,
    Timestamp,
    /// Any type name we carry but cannot marshal (document, bigdecimal, ...)
    Other(String),
}

impl ScalarType {
    pub fn as_str(&self) -> &str {
        match self {
            ScalarType::String => "string",
            ScalarType::Integer => "integer",
            ScalarType::Long => "long",
            ScalarType::Float => "float",
            ScalarType::Double => "double",
            ScalarType::Boolean => "boolean",
            ScalarType::Blob => "blob",
            ScalarType::Timestamp => "timestamp",
            ScalarType::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for ScalarType {
    fn from(s: &str) -> Self {
        match s {
            "string" => ScalarType::String,
            "integer" => ScalarType::Integer,
            "long" => ScalarType::Long,
            "float" => ScalarType::Float,
            "double" => ScalarType::Double,
            "boolean" => ScalarType::Boolean,
            "blob" => ScalarType::Blob,
            "timestamp" => ScalarType::Timestamp,
            other => ScalarType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TimestampFormat {
    Iso8601,
    UnixTimestamp,
    Rfc822,
}

#[derive(Clone, Debug)]
pub struct ScalarShape {
    pub ty: ScalarType,
    pub timestamp_format: Option<TimestampFormat>,
    /// payload is a raw byte stream (blob shapes only)
    pub streaming: bool,
}

#[derive(Clone, Debug)]
pub struct ListShape {
    pub member: Member,
    pub flattened: bool,
}

#[derive(Clone, Debug)]
pub struct MapShape {
    pub key: Member,
    pub value: Member,
    pub flattened: bool,
}

#[derive(Clone, Debug, Default)]
pub struct StructureShape {
    pub members: Vec<StructureMember>,
    /// name of the member carried as the whole HTTP body
    pub payload: Option<String>,
    /// envelope element/key wrapping the structure on the wire
    pub result_wrapper: Option<String>,
    pub xml_namespace: Option<String>,
}

/// Part of the HTTP message a member is bound to. Members without a
/// location are carried in the body.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Location {
    Header,
    Headers,
    StatusCode,
    Uri,
    Querystring,
}

/// Reference from a container shape to the shape it contains
#[derive(Clone, Debug)]
pub struct Member {
    pub shape: ShapeId,
    pub location_name: Option<String>,
    pub location: Option<Location>,
    pub xml_attribute: bool,
    pub streaming: bool,
    pub deprecated: bool,
    pub flattened: bool,
    pub timestamp_format: Option<TimestampFormat>,
}

impl Member {
    /// Body member with no wire metadata, targeting `shape`
    pub fn new(shape: ShapeId) -> Self {
        Member {
            shape,
            location_name: None,
            location: None,
            xml_attribute: false,
            streaming: false,
            deprecated: false,
            flattened: false,
            timestamp_format: None,
        }
    }

    /// true if the member is carried in the body
    pub fn in_body(&self) -> bool {
        self.location.is_none()
    }
}

/// Named member of a structure
#[derive(Clone, Debug)]
pub struct StructureMember {
    pub name: String,
    pub required: bool,
    member: Member,
}

impl StructureMember {
    pub(crate) fn new(name: String, required: bool, member: Member) -> Self {
        StructureMember { name, required, member }
    }
}

impl Deref for StructureMember {
    type Target = Member;

    fn deref(&self) -> &Self::Target {
        &self.member
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    Query,
    Json,
    RestJson,
    RestXml,
    Ec2,
}

impl FromStr for Protocol {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "query" => Ok(Protocol::Query),
            "json" => Ok(Protocol::Json),
            "rest-json" => Ok(Protocol::RestJson),
            "rest-xml" => Ok(Protocol::RestXml),
            "ec2" => Ok(Protocol::Ec2),
            _ => Err(crate::Error::InvalidModel(format!("unsupported protocol '{s}'"))),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Query => "query",
            Protocol::Json => "json",
            Protocol::RestJson => "rest-json",
            Protocol::RestXml => "rest-xml",
            Protocol::Ec2 => "ec2",
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct Http {
    pub method: String,
    pub request_uri: String,
}

#[derive(Clone, Debug)]
pub struct Operation {
    pub name: String,
    pub api_version: String,
    pub protocol: Protocol,
    pub http: Http,
    pub input: Option<ShapeId>,
    pub output: Option<ShapeId>,
    pub deprecated: bool,
}
