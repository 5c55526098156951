//! Typed fragments of generated marshalling code
//!
//! Serializers build a list of [`Op`]s that move native values into the
//! request, parsers build a tree of [`Read`]s that pull native values out of
//! a response. A plan is complete before anything is rendered, so rendering
//! and interpretation never fail on a half-built fragment.

use std::collections::{BTreeMap, BTreeSet};

use shapegen_model::{Protocol, TimestampFormat};

/// Wire representation of a scalar, with the effective timestamp format
/// (member override, else shape declaration). `None` means the default
/// of the place being written or read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    Blob,
    Timestamp(Option<TimestampFormat>),
}

/// Timestamps in headers default to RFC 822, everywhere else to ISO 8601
pub fn timestamp_format(declared: Option<TimestampFormat>, in_header: bool) -> TimestampFormat {
    match declared {
        Some(format) => format,
        None if in_header => TimestampFormat::Rfc822,
        None => TimestampFormat::Iso8601,
    }
}

/// Path from a binding to a native value, e.g. `item_1.tags`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Access {
    pub binding: String,
    /// the binding holds a reference (`if let Some(v) = &..`, `.iter()` items)
    pub binding_is_ref: bool,
    pub fields: Vec<Field>,
}

/// A structure member as seen from generated code
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    /// member name in the model, used as the record key by the interpreter
    pub member: String,
    /// rust field name
    pub ident: String,
}

impl Access {
    pub fn binding(name: &str, binding_is_ref: bool) -> Access {
        Access { binding: name.to_string(), binding_is_ref, fields: Vec::new() }
    }

    pub fn field(&self, field: &Field) -> Access {
        let mut access = self.clone();
        access.fields.push(field.clone());
        access
    }

    /// true if the expression is a reference rather than a place
    pub fn is_ref(&self) -> bool {
        self.binding_is_ref && self.fields.is_empty()
    }

    pub fn expr(&self) -> String {
        let mut s = self.binding.clone();
        for f in self.fields.iter() {
            s.push('.');
            s.push_str(&f.ident);
        }
        s
    }
}

/// One segment of a dotted form key
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Name(String),
    /// 1-based loop counter binding
    Counter(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyPath(pub Vec<Segment>);

impl KeyPath {
    pub fn push(&self, segment: Segment) -> KeyPath {
        let mut path = self.clone();
        path.0.push(segment);
        path
    }

    pub fn name(&self, name: &str) -> KeyPath {
        self.push(Segment::Name(name.to_string()))
    }
}

/// Location in a json document under construction, e.g. `payload["A"]["B"]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonPlace {
    pub root: String,
    pub keys: Vec<String>,
}

impl JsonPlace {
    pub fn root(name: &str) -> JsonPlace {
        JsonPlace { root: name.to_string(), keys: Vec::new() }
    }

    pub fn key(&self, key: &str) -> JsonPlace {
        let mut place = self.clone();
        place.keys.push(key.to_string());
        place
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Form(KeyPath),
    Json(JsonPlace),
    /// text content of an xml element binding
    XmlText(String),
    XmlAttribute { element: String, name: String },
    Header(String),
    /// one header per map entry, named prefix + key binding
    PrefixedHeader { prefix: String, key: String },
    QueryParam(String),
    Label(String),
    RawBody,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Leaf {
    Literal(String),
    Scalar { value: Access, kind: ScalarKind },
    EmptyObject,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sink {
    /// loop body writes directly into the enclosing document
    Inline,
    /// each iteration fills `element`, which is pushed to `list`;
    /// the list is assigned to `into` after the loop
    Collect { list: String, element: String, into: JsonPlace },
}

/// Serializer step
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    IfPresent { value: Access, bind: String, body: Vec<Op> },
    Items { list: Access, item: String, counter: Option<String>, sink: Sink, body: Vec<Op> },
    Entries { map: Access, key: String, value: String, counter: Option<String>, body: Vec<Op> },
    /// new xml element bound to `var`, appended to `parent` after `body` runs
    Element { parent: String, name: String, var: String, body: Vec<Op> },
    Put { target: Target, value: Leaf },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestBody {
    None,
    Form,
    Json,
    Xml { name: String, namespace: Option<String> },
    Raw,
}

/// Everything needed to turn an operation input into request parts
#[derive(Clone, Debug)]
pub struct RequestPlan {
    pub protocol: Protocol,
    pub operation: String,
    pub api_version: String,
    /// native input type, if the operation takes input
    pub input: Option<String>,
    pub body: RequestBody,
    pub ops: Vec<Op>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonSource {
    pub base: String,
    pub keys: Vec<String>,
}

impl JsonSource {
    pub fn base(name: &str) -> JsonSource {
        JsonSource { base: name.to_string(), keys: Vec::new() }
    }

    pub fn key(&self, key: &str) -> JsonSource {
        let mut source = self.clone();
        source.keys.push(key.to_string());
        source
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XmlNode {
    /// the element at `path` itself
    Node,
    Child(String),
    Children(String),
    Attribute { ns: Option<String>, name: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlSource {
    pub base: String,
    /// element hops below `base`, each resolved with the empty fallback
    pub path: Vec<String>,
    pub last: XmlNode,
}

impl XmlSource {
    pub fn base(name: &str) -> XmlSource {
        XmlSource { base: name.to_string(), path: Vec::new(), last: XmlNode::Node }
    }

    /// source for the element this one points at, so its children can be addressed
    pub fn descend(&self) -> XmlSource {
        let mut path = self.path.clone();
        if let XmlNode::Child(name) | XmlNode::Children(name) = &self.last {
            path.push(name.clone());
        }
        XmlSource { base: self.base.clone(), path, last: XmlNode::Node }
    }

    pub fn with_last(&self, last: XmlNode) -> XmlSource {
        XmlSource { base: self.base.clone(), path: self.path.clone(), last }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    Json(JsonSource),
    Xml(XmlSource),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyRead {
    Stream,
    Blob,
    Text,
}

/// Parser expression
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Read {
    /// operation has no output
    Unit,
    /// `guarded` reads yield `Option`; unguarded reads fall back to the type default
    Scalar { source: Source, kind: ScalarKind, guarded: bool },
    Record {
        type_name: String,
        source: Source,
        guarded: bool,
        /// guard binding for the present value
        bind: String,
        fields: Vec<(Field, Read)>,
        /// some members are not read here and take their default
        partial: bool,
    },
    Call { helper: String, source: Source },
    /// wrap an unguarded read in `Some`
    Present(Box<Read>),
    Header { name: String, kind: ScalarKind },
    PrefixHeaders { prefix: String },
    StatusCode,
    Body(BodyRead),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HelperBody {
    /// `item` reads from the element binding `item`; `compact` drops items that read as `None`
    List { item: Read, compact: bool },
    Map { key: Source, value: Read, compact: bool },
}

/// Generated function unpacking one list or map shape
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Helper {
    pub name: String,
    /// rust type of the returned collection
    pub output_type: String,
    pub body: HelperBody,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Document {
    None,
    Json,
    Xml,
}

#[derive(Clone, Debug)]
pub struct ResponsePlan {
    pub protocol: Protocol,
    pub operation: String,
    /// native output type, if the operation has output
    pub output: Option<String>,
    pub document: Document,
    pub wrapper: Option<String>,
    pub read: Read,
    pub helpers: BTreeMap<String, Helper>,
}

/// A plan and the rust source rendered from it
#[derive(Clone, Debug)]
pub struct Generated<P> {
    pub plan: P,
    /// function signature the body belongs to
    pub signature: String,
    pub body: String,
    /// native types the code refers to, sorted, for imports
    pub used_types: BTreeSet<String>,
    /// helper function sources by name
    pub helpers: BTreeMap<String, String>,
}

impl<P> Generated<P> {
    /// The complete function followed by its helpers
    pub fn to_source(&self) -> String {
        let mut source = format!("{} {{\n{}}}\n", self.signature, self.body);
        for helper in self.helpers.values() {
            source.push('\n');
            source.push_str(helper);
        }
        source
    }
}
