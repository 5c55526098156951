//! Plan interpreter
//!
//! Executes request and response plans against dynamic [`Value`]s with the
//! same semantics as the rendered code, so marshalling behavior can be
//! checked without compiling generated sources.

use std::{
    borrow::Cow,
    collections::{BTreeMap, HashMap},
};

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use shapegen_model::TimestampFormat;
use thiserror::Error as ThisError;

use crate::{
    fragment::{
        timestamp_format, Access, BodyRead, Document, Field, HelperBody, JsonPlace, JsonSource,
        KeyPath, Leaf, Op, Read, RequestBody, RequestPlan, ResponsePlan, ScalarKind, Segment,
        Sink, Source, Target, XmlNode, XmlSource,
    },
    runtime::{form_encode, DecodeError, RequestParts, ResponseParts, XmlElement, RFC822_FORMAT},
};

/// Dynamic native value. Records are keyed by member name; a missing or
/// `Null` member is absent.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Blob(Vec<u8>),
    Timestamp(DateTime<Utc>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Record(BTreeMap<String, Value>),
}

static NULL: Value = Value::Null;

impl Value {
    pub fn record<I, K>(fields: I) -> Value
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn map<I, K>(entries: I) -> Value
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Member of a record
    pub fn get(&self, member: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.get(member),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Blob(_) => "blob",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

#[derive(Debug, ThisError)]
pub enum EvalError {
    #[error("no value bound to {0}")]
    MissingBinding(String),

    #[error("required value {0} is missing")]
    MissingRequired(String),

    #[error("expected {0}, found {1}")]
    TypeMismatch(&'static str, &'static str),

    #[error("no helper named {0}")]
    MissingHelper(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

type Result<T> = std::result::Result<T, EvalError>;

/// Runs a serializer plan on `input`, which must be a record when the operation takes input
pub fn serialize(plan: &RequestPlan, input: &Value) -> Result<RequestParts> {
    let mut s = Serializer::default();
    if plan.input.is_some() {
        s.env.insert("input".to_string(), Cow::Borrowed(input));
    }
    match &plan.body {
        RequestBody::Json => {
            s.json.insert("payload".to_string(), serde_json::Value::Object(serde_json::Map::new()));
        }
        RequestBody::Xml { name, namespace } => {
            let mut root = XmlElement::new(name);
            if let Some(ns) = namespace {
                root.set_attribute("xmlns", ns.as_str());
            }
            s.xml.insert("root".to_string(), root);
        }
        RequestBody::None | RequestBody::Form | RequestBody::Raw => {}
    }
    s.ops(&plan.ops)?;
    match &plan.body {
        RequestBody::Form => s.request.body = form_encode(&s.params).into_bytes(),
        RequestBody::Json => {
            let payload = s.json.remove("payload").unwrap_or_default();
            s.request.body = payload.to_string().into_bytes();
        }
        RequestBody::Xml { .. } => {
            let root =
                s.xml.remove("root").ok_or_else(|| EvalError::MissingBinding("root".into()))?;
            s.request.body = root.to_xml().into_bytes();
        }
        RequestBody::None | RequestBody::Raw => {}
    }
    Ok(s.request)
}

#[derive(Default)]
struct Serializer<'v> {
    env: HashMap<String, Cow<'v, Value>>,
    counters: HashMap<String, usize>,
    params: Vec<(String, String)>,
    json: HashMap<String, serde_json::Value>,
    collected: HashMap<String, Vec<serde_json::Value>>,
    xml: HashMap<String, XmlElement>,
    request: RequestParts,
}

fn descend<'a>(mut value: &'a Value, fields: &[Field]) -> Result<&'a Value> {
    for field in fields {
        value = match value {
            Value::Record(members) => members.get(&field.member).unwrap_or(&NULL),
            Value::Null => &NULL,
            other => return Err(EvalError::TypeMismatch("record", other.kind_name())),
        };
    }
    Ok(value)
}

fn elements(value: Cow<'_, Value>) -> Result<Vec<Cow<'_, Value>>> {
    match value {
        Cow::Borrowed(Value::List(items)) => Ok(items.iter().map(Cow::Borrowed).collect()),
        Cow::Owned(Value::List(items)) => Ok(items.into_iter().map(Cow::Owned).collect()),
        Cow::Borrowed(Value::Null) | Cow::Owned(Value::Null) => Ok(Vec::new()),
        other => Err(EvalError::TypeMismatch("list", other.kind_name())),
    }
}

fn entries(value: Cow<'_, Value>) -> Result<Vec<(String, Cow<'_, Value>)>> {
    match value {
        Cow::Borrowed(Value::Map(map)) => {
            Ok(map.iter().map(|(k, v)| (k.clone(), Cow::Borrowed(v))).collect())
        }
        Cow::Owned(Value::Map(map)) => {
            Ok(map.into_iter().map(|(k, v)| (k, Cow::Owned(v))).collect())
        }
        Cow::Borrowed(Value::Null) | Cow::Owned(Value::Null) => Ok(Vec::new()),
        other => Err(EvalError::TypeMismatch("map", other.kind_name())),
    }
}

impl<'v> Serializer<'v> {
    fn resolve(&self, access: &Access) -> Result<Cow<'v, Value>> {
        let bound = self
            .env
            .get(&access.binding)
            .ok_or_else(|| EvalError::MissingBinding(access.binding.clone()))?;
        Ok(match bound {
            Cow::Borrowed(value) => Cow::Borrowed(descend(*value, &access.fields)?),
            Cow::Owned(value) => Cow::Owned(descend(value, &access.fields)?.clone()),
        })
    }

    fn ops(&mut self, ops: &[Op]) -> Result<()> {
        for op in ops {
            self.op(op)?;
        }
        Ok(())
    }

    fn op(&mut self, op: &Op) -> Result<()> {
        match op {
            Op::IfPresent { value, bind, body } => {
                let value = self.resolve(value)?;
                if !value.is_null() {
                    self.env.insert(bind.clone(), value);
                    self.ops(body)?;
                    self.env.remove(bind);
                }
            }
            Op::Items { list, item, counter, sink, body } => {
                let items = elements(self.resolve(list)?)?;
                if let Sink::Collect { list, .. } = sink {
                    self.collected.insert(list.clone(), Vec::new());
                }
                for (index, value) in items.into_iter().enumerate() {
                    self.env.insert(item.clone(), value);
                    if let Some(counter) = counter {
                        self.counters.insert(counter.clone(), index + 1);
                    }
                    match sink {
                        Sink::Inline => self.ops(body)?,
                        Sink::Collect { list, element, .. } => {
                            self.json.insert(element.clone(), serde_json::Value::Null);
                            self.ops(body)?;
                            let element = self.json.remove(element).unwrap_or_default();
                            self.collected.entry(list.clone()).or_default().push(element);
                        }
                    }
                }
                self.env.remove(item);
                if let Sink::Collect { list, into, .. } = sink {
                    let items = self.collected.remove(list).unwrap_or_default();
                    *self.json_slot(into)? = serde_json::Value::Array(items);
                }
            }
            Op::Entries { map, key, value, counter, body } => {
                let map = entries(self.resolve(map)?)?;
                for (index, (k, v)) in map.into_iter().enumerate() {
                    self.env.insert(key.clone(), Cow::Owned(Value::String(k)));
                    self.env.insert(value.clone(), v);
                    if let Some(counter) = counter {
                        self.counters.insert(counter.clone(), index + 1);
                    }
                    self.ops(body)?;
                }
                self.env.remove(key);
                self.env.remove(value);
            }
            Op::Element { parent, name, var, body } => {
                self.xml.insert(var.clone(), XmlElement::new(name));
                self.ops(body)?;
                let element =
                    self.xml.remove(var).ok_or_else(|| EvalError::MissingBinding(var.clone()))?;
                self.xml
                    .get_mut(parent)
                    .ok_or_else(|| EvalError::MissingBinding(parent.clone()))?
                    .push(element);
            }
            Op::Put { target, value } => self.put(target, value)?,
        }
        Ok(())
    }

    fn put(&mut self, target: &Target, leaf: &Leaf) -> Result<()> {
        match target {
            Target::Form(path) => {
                let key = self.form_key(path)?;
                let text = self.text(leaf, false)?;
                self.params.push((key, text));
            }
            Target::Json(place) => {
                let value = self.json_value(leaf)?;
                *self.json_slot(place)? = value;
            }
            Target::XmlText(element) => {
                let text = self.text(leaf, false)?;
                self.element(element)?.set_text(text);
            }
            Target::XmlAttribute { element, name } => {
                let text = self.text(leaf, false)?;
                self.element(element)?.set_attribute(name, text);
            }
            Target::Header(name) => {
                let text = self.text(leaf, true)?;
                self.request.headers.push((name.clone(), text));
            }
            Target::PrefixedHeader { prefix, key } => {
                let key = match self.env.get(key).map(|v| &**v) {
                    Some(Value::String(key)) => key.clone(),
                    Some(other) => return Err(EvalError::TypeMismatch("string", other.kind_name())),
                    None => return Err(EvalError::MissingBinding(key.clone())),
                };
                let text = self.text(leaf, true)?;
                self.request.headers.push((format!("{prefix}{key}"), text));
            }
            Target::QueryParam(name) => {
                let text = self.text(leaf, false)?;
                self.request.query.push((name.clone(), text));
            }
            Target::Label(name) => {
                let text = self.text(leaf, false)?;
                self.request.labels.insert(name.clone(), text);
            }
            Target::RawBody => {
                self.request.body = match leaf {
                    Leaf::Scalar { value, kind: ScalarKind::Blob | ScalarKind::String } => {
                        match &*self.resolve(value)? {
                            Value::Blob(bytes) => bytes.clone(),
                            Value::String(s) => s.as_bytes().to_vec(),
                            Value::Null => return Err(EvalError::MissingRequired(value.expr())),
                            other => return Err(EvalError::TypeMismatch("blob", other.kind_name())),
                        }
                    }
                    other => self.text(other, false)?.into_bytes(),
                };
            }
        }
        Ok(())
    }

    fn element(&mut self, name: &str) -> Result<&mut XmlElement> {
        self.xml.get_mut(name).ok_or_else(|| EvalError::MissingBinding(name.to_string()))
    }

    fn form_key(&self, path: &KeyPath) -> Result<String> {
        let mut parts = Vec::with_capacity(path.0.len());
        for segment in path.0.iter() {
            parts.push(match segment {
                Segment::Name(name) => name.clone(),
                Segment::Counter(counter) => self
                    .counters
                    .get(counter)
                    .ok_or_else(|| EvalError::MissingBinding(counter.clone()))?
                    .to_string(),
            });
        }
        Ok(parts.join("."))
    }

    fn json_slot(&mut self, place: &JsonPlace) -> Result<&mut serde_json::Value> {
        let mut slot = self
            .json
            .get_mut(&place.root)
            .ok_or_else(|| EvalError::MissingBinding(place.root.clone()))?;
        for key in place.keys.iter() {
            if slot.is_null() {
                *slot = serde_json::Value::Object(serde_json::Map::new());
            }
            let Some(object) = slot.as_object_mut() else {
                return Err(EvalError::TypeMismatch("object", "json value"));
            };
            slot = object.entry(key.clone()).or_insert(serde_json::Value::Null);
        }
        Ok(slot)
    }

    fn scalar(&self, value: &Access) -> Result<Cow<'v, Value>> {
        let resolved = self.resolve(value)?;
        if resolved.is_null() {
            return Err(EvalError::MissingRequired(value.expr()));
        }
        Ok(resolved)
    }

    fn text(&self, leaf: &Leaf, in_header: bool) -> Result<String> {
        let (value, kind) = match leaf {
            Leaf::Literal(s) => return Ok(s.clone()),
            Leaf::EmptyObject => return Ok(String::new()),
            Leaf::Scalar { value, kind } => (self.scalar(value)?, *kind),
        };
        Ok(match (kind, &*value) {
            (ScalarKind::String, Value::String(s)) => s.clone(),
            (ScalarKind::Integer | ScalarKind::Long, Value::Integer(n)) => n.to_string(),
            (ScalarKind::Float, Value::Float(n)) => (*n as f32).to_string(),
            (ScalarKind::Float, Value::Integer(n)) => (*n as f32).to_string(),
            (ScalarKind::Double, Value::Float(n)) => n.to_string(),
            (ScalarKind::Double, Value::Integer(n)) => (*n as f64).to_string(),
            (ScalarKind::Boolean, Value::Bool(b)) => b.to_string(),
            (ScalarKind::Blob, Value::Blob(bytes)) => STANDARD.encode(bytes),
            (ScalarKind::Timestamp(declared), Value::Timestamp(t)) => {
                format_timestamp(t, timestamp_format(declared, in_header))
            }
            (kind, other) => {
                return Err(EvalError::TypeMismatch(kind_name(kind), other.kind_name()))
            }
        })
    }

    fn json_value(&self, leaf: &Leaf) -> Result<serde_json::Value> {
        let (value, kind) = match leaf {
            Leaf::Literal(s) => return Ok(serde_json::Value::from(s.as_str())),
            Leaf::EmptyObject => return Ok(serde_json::Value::Object(serde_json::Map::new())),
            Leaf::Scalar { value, kind } => (self.scalar(value)?, *kind),
        };
        Ok(match (kind, &*value) {
            (ScalarKind::Integer | ScalarKind::Long, Value::Integer(n)) => {
                serde_json::Value::from(*n)
            }
            (ScalarKind::Float, Value::Float(n)) => serde_json::Value::from(*n as f32),
            (ScalarKind::Double, Value::Float(n)) => serde_json::Value::from(*n),
            (ScalarKind::Timestamp(Some(TimestampFormat::UnixTimestamp)), Value::Timestamp(t)) => {
                serde_json::Value::from(t.timestamp())
            }
            _ => serde_json::Value::from(self.text(leaf, false)?),
        })
    }
}

fn kind_name(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::String => "string",
        ScalarKind::Integer => "integer",
        ScalarKind::Long => "long",
        ScalarKind::Float => "float",
        ScalarKind::Double => "double",
        ScalarKind::Boolean => "boolean",
        ScalarKind::Blob => "blob",
        ScalarKind::Timestamp(_) => "timestamp",
    }
}

fn format_timestamp(t: &DateTime<Utc>, format: TimestampFormat) -> String {
    match format {
        TimestampFormat::Iso8601 => t.to_rfc3339_opts(chrono::SecondsFormat::Secs, false),
        TimestampFormat::UnixTimestamp => t.timestamp().to_string(),
        TimestampFormat::Rfc822 => t.format(RFC822_FORMAT).to_string(),
    }
}

fn parse_timestamp(text: &str, format: TimestampFormat) -> Option<DateTime<Utc>> {
    match format {
        TimestampFormat::Iso8601 => {
            DateTime::parse_from_rfc3339(text.trim()).ok().map(|t| t.with_timezone(&Utc))
        }
        TimestampFormat::Rfc822 => {
            DateTime::parse_from_rfc2822(text.trim()).ok().map(|t| t.with_timezone(&Utc))
        }
        TimestampFormat::UnixTimestamp => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(|n| DateTime::from_timestamp(n as i64, 0)),
    }
}

fn coerce_text(text: &str, kind: ScalarKind, in_header: bool) -> Option<Value> {
    match kind {
        ScalarKind::String => Some(Value::String(text.to_string())),
        ScalarKind::Integer => text.trim().parse::<i32>().ok().map(Value::from),
        ScalarKind::Long => text.trim().parse::<i64>().ok().map(Value::Integer),
        ScalarKind::Float => text.trim().parse::<f32>().ok().map(|n| Value::Float(n.into())),
        ScalarKind::Double => text.trim().parse::<f64>().ok().map(Value::Float),
        ScalarKind::Boolean => Some(Value::Bool(text.trim() == "true")),
        ScalarKind::Blob => STANDARD.decode(text.trim()).ok().map(Value::Blob),
        ScalarKind::Timestamp(declared) => {
            parse_timestamp(text, timestamp_format(declared, in_header)).map(Value::Timestamp)
        }
    }
}

fn coerce_json(value: &serde_json::Value, kind: ScalarKind) -> Option<Value> {
    match kind {
        ScalarKind::String => value.as_str().map(Value::from),
        ScalarKind::Integer => {
            value.as_i64().and_then(|n| i32::try_from(n).ok()).map(Value::from)
        }
        ScalarKind::Long => value.as_i64().map(Value::Integer),
        ScalarKind::Float => value
            .as_f64()
            .filter(|n| n.abs() <= f64::from(f32::MAX))
            .map(|n| Value::Float((n as f32).into())),
        ScalarKind::Double => value.as_f64().map(Value::Float),
        ScalarKind::Boolean => Some(Value::Bool(
            value.as_str().map_or_else(|| value.to_string(), str::to_owned) == "true",
        )),
        ScalarKind::Blob => value.as_str().and_then(|s| STANDARD.decode(s).ok()).map(Value::Blob),
        ScalarKind::Timestamp(Some(TimestampFormat::UnixTimestamp)) => value
            .as_f64()
            .and_then(|n| DateTime::from_timestamp(n as i64, 0))
            .map(Value::Timestamp),
        ScalarKind::Timestamp(declared) => value
            .as_str()
            .and_then(|s| parse_timestamp(s, timestamp_format(declared, false)))
            .map(Value::Timestamp),
    }
}

fn default_scalar(kind: ScalarKind) -> Value {
    match kind {
        ScalarKind::String => Value::String(String::new()),
        ScalarKind::Integer | ScalarKind::Long => Value::Integer(0),
        ScalarKind::Float | ScalarKind::Double => Value::Float(0.0),
        ScalarKind::Boolean => Value::Bool(false),
        ScalarKind::Blob => Value::Blob(Vec::new()),
        ScalarKind::Timestamp(_) => Value::Timestamp(DateTime::<Utc>::default()),
    }
}

/// Runs a parser plan on a response. An operation without output parses to `Null`.
pub fn parse(plan: &ResponsePlan, response: &ResponseParts) -> Result<Value> {
    let json_doc;
    let xml_doc;
    let mut parser = Parser { plan, response, json: HashMap::new(), xml: HashMap::new() };
    match plan.document {
        Document::Json => {
            json_doc = response.json()?;
            let data = match &plan.wrapper {
                Some(wrapper) => &json_doc[wrapper.as_str()],
                None => &json_doc,
            };
            parser.json.insert("data".to_string(), data);
        }
        Document::Xml => {
            xml_doc = response.xml()?;
            let data = match &plan.wrapper {
                Some(wrapper) => xml_doc.element(wrapper),
                None => &xml_doc,
            };
            parser.xml.insert("data".to_string(), data);
        }
        Document::None => {}
    }
    parser.read(&plan.read)
}

struct Parser<'d> {
    plan: &'d ResponsePlan,
    response: &'d ResponseParts,
    json: HashMap<String, &'d serde_json::Value>,
    xml: HashMap<String, &'d XmlElement>,
}

impl<'d> Parser<'d> {
    fn json_source(&self, source: &JsonSource) -> Result<&'d serde_json::Value> {
        let mut value: &'d serde_json::Value = self
            .json
            .get(&source.base)
            .copied()
            .ok_or_else(|| EvalError::MissingBinding(source.base.clone()))?;
        for key in source.keys.iter() {
            value = &value[key.as_str()];
        }
        Ok(value)
    }

    fn xml_element(&self, source: &XmlSource) -> Result<&'d XmlElement> {
        let mut element: &'d XmlElement = self
            .xml
            .get(&source.base)
            .copied()
            .ok_or_else(|| EvalError::MissingBinding(source.base.clone()))?;
        for hop in source.path.iter() {
            element = element.element(hop);
        }
        Ok(element)
    }

    fn xml_text(&self, source: &XmlSource) -> Result<Option<&'d str>> {
        let element = self.xml_element(source)?;
        Ok(match &source.last {
            XmlNode::Node => Some(element.text()),
            XmlNode::Child(name) | XmlNode::Children(name) => {
                element.child(name).map(XmlElement::text)
            }
            XmlNode::Attribute { ns: Some(ns), name } => element.namespaced_attribute(ns, name),
            XmlNode::Attribute { ns: None, name } => element.attribute(name),
        })
    }

    fn read(&mut self, read: &'d Read) -> Result<Value> {
        Ok(match read {
            Read::Unit => Value::Null,
            Read::Scalar { source: Source::Json(source), kind, guarded } => {
                let value = self.json_source(source)?;
                match (value.is_null(), *guarded) {
                    (true, true) => Value::Null,
                    (true, false) => default_scalar(*kind),
                    (false, true) => coerce_json(value, *kind).unwrap_or(Value::Null),
                    (false, false) => {
                        coerce_json(value, *kind).unwrap_or_else(|| default_scalar(*kind))
                    }
                }
            }
            Read::Scalar { source: Source::Xml(source), kind, guarded } => {
                let value = self.xml_text(source)?.and_then(|text| coerce_text(text, *kind, false));
                match value {
                    Some(value) => value,
                    None if *guarded => Value::Null,
                    None => default_scalar(*kind),
                }
            }
            Read::Record { source, guarded, bind, fields, .. } => {
                if *guarded {
                    match source {
                        Source::Json(source) => {
                            let value = self.json_source(source)?;
                            if value.is_null() {
                                return Ok(Value::Null);
                            }
                            self.json.insert(bind.clone(), value);
                        }
                        Source::Xml(source) => {
                            let element = self.xml_element(source)?;
                            let found = match &source.last {
                                XmlNode::Child(name) => element.child(name),
                                _ => Some(element),
                            };
                            let Some(found) = found else {
                                return Ok(Value::Null);
                            };
                            self.xml.insert(bind.clone(), found);
                        }
                    }
                }
                let mut record = BTreeMap::new();
                for (field, read) in fields.iter() {
                    let value = self.read(read)?;
                    if !value.is_null() {
                        record.insert(field.member.clone(), value);
                    }
                }
                Value::Record(record)
            }
            Read::Call { helper, source } => self.call(helper, source)?,
            Read::Present(inner) => self.read(inner)?,
            Read::Header { name, kind } => self
                .response
                .header(name)
                .and_then(|text| coerce_text(text, *kind, true))
                .unwrap_or(Value::Null),
            Read::PrefixHeaders { prefix } => Value::Map(
                self.response
                    .headers_with_prefix(prefix)
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
            ),
            Read::StatusCode => Value::Integer(self.response.status().into()),
            Read::Body(BodyRead::Stream | BodyRead::Blob) => {
                Value::Blob(self.response.body().to_vec())
            }
            Read::Body(BodyRead::Text) => {
                Value::String(String::from_utf8_lossy(self.response.body()).into_owned())
            }
        })
    }

    fn call(&mut self, name: &str, source: &'d Source) -> Result<Value> {
        let plan = self.plan;
        let helper =
            plan.helpers.get(name).ok_or_else(|| EvalError::MissingHelper(name.to_string()))?;
        let mut list = Vec::new();
        let mut map = BTreeMap::new();
        match source {
            Source::Json(source) => {
                let items =
                    self.json_source(source)?.as_array().map(Vec::as_slice).unwrap_or_default();
                let saved = self.json.get("item").copied();
                for item in items {
                    self.json.insert("item".to_string(), item);
                    self.helper_item(&helper.body, &mut list, &mut map)?;
                }
                restore(&mut self.json, saved);
            }
            Source::Xml(source) => {
                let element = self.xml_element(source)?;
                let name = match &source.last {
                    XmlNode::Child(name) | XmlNode::Children(name) => name.as_str(),
                    _ => "member",
                };
                let saved = self.xml.get("item").copied();
                for item in element.children(name) {
                    self.xml.insert("item".to_string(), item);
                    self.helper_item(&helper.body, &mut list, &mut map)?;
                }
                restore(&mut self.xml, saved);
            }
        }
        Ok(match helper.body {
            HelperBody::List { .. } => Value::List(list),
            HelperBody::Map { .. } => Value::Map(map),
        })
    }

    fn helper_item(
        &mut self,
        body: &'d HelperBody,
        list: &mut Vec<Value>,
        map: &mut BTreeMap<String, Value>,
    ) -> Result<()> {
        match body {
            HelperBody::List { item, compact } => {
                let value = self.read(item)?;
                if !(*compact && value.is_null()) {
                    list.push(value);
                }
            }
            HelperBody::Map { key, value, compact } => {
                let key = match key {
                    Source::Json(source) => match self.json_source(source)? {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    },
                    Source::Xml(source) => self.xml_text(source)?.unwrap_or_default().to_string(),
                };
                let value = self.read(value)?;
                if !(*compact && value.is_null()) {
                    map.insert(key, value);
                }
            }
        }
        Ok(())
    }
}

fn restore<T>(env: &mut HashMap<String, T>, saved: Option<T>) {
    match saved {
        Some(value) => {
            env.insert("item".to_string(), value);
        }
        None => {
            env.remove("item");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_format_per_declaration() {
        let t = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(format_timestamp(&t, TimestampFormat::Iso8601), "2023-11-14T22:13:20+00:00");
        assert_eq!(format_timestamp(&t, TimestampFormat::UnixTimestamp), "1700000000");
        assert_eq!(format_timestamp(&t, TimestampFormat::Rfc822), "Tue, 14 Nov 2023 22:13:20 GMT");
        assert_eq!(
            parse_timestamp("Tue, 14 Nov 2023 22:13:20 GMT", TimestampFormat::Rfc822),
            Some(t)
        );
        assert_eq!(parse_timestamp("1700000000", TimestampFormat::UnixTimestamp), Some(t));
    }

    #[test]
    fn json_booleans_compare_their_text() {
        let kind = ScalarKind::Boolean;
        assert_eq!(coerce_json(&serde_json::json!("true"), kind), Some(Value::Bool(true)));
        assert_eq!(coerce_json(&serde_json::json!(true), kind), Some(Value::Bool(true)));
        assert_eq!(coerce_json(&serde_json::json!("yes"), kind), Some(Value::Bool(false)));
    }

    #[test]
    fn json_numbers_out_of_range_are_absent() {
        let int = ScalarKind::Integer;
        let max = serde_json::json!(2_147_483_647);
        assert_eq!(coerce_json(&max, int), Some(Value::from(i32::MAX)));
        assert_eq!(coerce_json(&serde_json::json!(3_000_000_000_i64), int), None);
        assert_eq!(coerce_json(&serde_json::json!(-3_000_000_000_i64), int), None);
        let float = ScalarKind::Float;
        assert_eq!(coerce_json(&serde_json::json!(1.5), float), Some(Value::Float(1.5)));
        assert_eq!(coerce_json(&serde_json::json!(1e39), float), None);
    }

    #[test]
    fn records_skip_missing_fields() {
        let input = Value::record([("Name", Value::from("demo"))]);
        let field = Field { member: "Other".into(), ident: "other".into() };
        assert!(descend(&input, &[field]).unwrap().is_null());
        let bad = Value::from("x");
        let field = Field { member: "Name".into(), ident: "name".into() };
        assert!(matches!(
            descend(&bad, &[field]),
            Err(EvalError::TypeMismatch("record", "string"))
        ));
    }
}
