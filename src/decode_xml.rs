// REST-XML parser (also used for query protocol responses)
//
// Reads walk the element tree with `element` lookups, which fall back to an
// empty element, so a missing required member reads as its type default.
// Optional members look the element up with `child` and yield `None` when
// it is absent.

use std::collections::BTreeMap;

use shapegen_model::{ListShape, MapShape, Member, Operation, ShapeId, StructureShape};
use tracing::debug;

use crate::{
    bindings::location_read,
    decode_json::{helper_name, payload_body},
    error::Result,
    fragment::{
        Document, Helper, HelperBody, Read, ResponsePlan, ScalarKind, Source, XmlNode, XmlSource,
    },
    walk::{field, ShapeVisitor, Walker},
};

pub(crate) struct XmlReadCtx {
    source: XmlSource,
    /// missing values read as defaults instead of `None`
    required: bool,
    top: bool,
}

#[derive(Default)]
pub(crate) struct XmlDecoder {
    helpers: BTreeMap<String, Helper>,
    reads_body: bool,
}

pub(crate) fn response_plan(walker: &mut Walker<'_>, op: &Operation) -> Result<ResponsePlan> {
    let mut plan = ResponsePlan {
        protocol: op.protocol,
        operation: op.name.clone(),
        output: None,
        document: Document::None,
        wrapper: None,
        read: Read::Unit,
        helpers: BTreeMap::new(),
    };
    let Some(id) = op.output else {
        return Ok(plan);
    };
    plan.output = Some(walker.type_name(id)?);
    plan.wrapper = walker.model().structure(id)?.result_wrapper.clone();

    let mut decoder = XmlDecoder::default();
    let ctx = XmlReadCtx { source: XmlSource::base("data"), required: true, top: true };
    plan.read = walker.walk(&mut decoder, &Member::new(id), ctx)?;
    if decoder.reads_body {
        plan.document = Document::Xml;
    }
    plan.helpers = decoder.helpers;
    Ok(plan)
}

/// `ns:name` attributes are looked up by namespace prefix
fn attribute(name: &str) -> XmlNode {
    match name.split_once(':') {
        Some((ns, name)) => XmlNode::Attribute { ns: Some(ns.to_string()), name: name.to_string() },
        None => XmlNode::Attribute { ns: None, name: name.to_string() },
    }
}

fn is_scalar(walker: &Walker<'_>, member: &Member) -> bool {
    !walker.is_structure(member) && !walker.is_collection(member)
}

impl<'m> ShapeVisitor<'m> for XmlDecoder {
    type Context = XmlReadCtx;
    type Output = Read;

    fn visit_structure(
        &mut self,
        walker: &mut Walker<'m>,
        id: ShapeId,
        shape: &'m StructureShape,
        _member: &Member,
        ctx: XmlReadCtx,
    ) -> Result<Read> {
        let type_name = walker.type_name(id)?;
        let payload = if ctx.top { shape.payload.as_deref() } else { None };
        let guarded = !ctx.required && matches!(ctx.source.last, XmlNode::Child(_));
        walker.nested(|w| {
            let bind = w.var("v");
            let parent = if guarded { XmlSource::base(&bind) } else { ctx.source.descend() };
            let mut fields = Vec::new();
            let mut partial = false;
            for m in shape.members.iter() {
                if !m.in_body() {
                    match location_read(w, m)? {
                        Some(read) => fields.push((field(m), read)),
                        None => partial = true,
                    }
                    continue;
                }
                let read = match payload {
                    Some(p) if p == m.name => {
                        if w.is_structure(m) {
                            self.reads_body = true;
                            let source = XmlSource::base("data");
                            let ctx = XmlReadCtx { source, required: true, top: false };
                            Read::Present(Box::new(w.walk(self, m, ctx)?))
                        } else {
                            payload_body(w, m)?
                        }
                    }
                    Some(_) => {
                        debug!(member = %m.name, "body member of a payload structure is not read");
                        partial = true;
                        continue;
                    }
                    None => {
                        if ctx.top {
                            self.reads_body = true;
                        }
                        let name = w.wire_name(m);
                        let source = if m.xml_attribute {
                            parent.with_last(attribute(&name))
                        } else {
                            parent.with_last(XmlNode::Child(name))
                        };
                        w.walk(self, m, XmlReadCtx { source, required: m.required, top: false })?
                    }
                };
                fields.push((field(m), read));
            }
            Ok(Read::Record {
                type_name,
                source: Source::Xml(ctx.source),
                guarded,
                bind,
                fields,
                partial,
            })
        })
    }

    fn visit_list(
        &mut self,
        walker: &mut Walker<'m>,
        id: ShapeId,
        shape: &'m ListShape,
        member: &Member,
        ctx: XmlReadCtx,
    ) -> Result<Read> {
        let member_name =
            shape.member.location_name.clone().unwrap_or_else(|| "member".to_string());
        let elements = match &ctx.source.last {
            XmlNode::Child(name) if shape.flattened || member.flattened => {
                ctx.source.with_last(XmlNode::Children(name.clone()))
            }
            XmlNode::Child(_) => ctx.source.descend().with_last(XmlNode::Children(member_name)),
            _ => ctx.source.with_last(XmlNode::Children(member_name)),
        };
        let name = helper_name(walker, id);
        if !self.helpers.contains_key(&name) {
            let output_type = walker.rust_type(member)?;
            let compact = is_scalar(walker, &shape.member);
            let item = walker.nested(|w| {
                let source = XmlSource::base("item");
                let ctx = XmlReadCtx { source, required: !compact, top: false };
                w.walk(self, &shape.member, ctx)
            })?;
            debug!(helper = %name, "emitting list helper");
            self.helpers.insert(
                name.clone(),
                Helper {
                    name: name.clone(),
                    output_type,
                    body: HelperBody::List { item, compact },
                },
            );
        }
        Ok(Read::Call { helper: name, source: Source::Xml(elements) })
    }

    fn visit_map(
        &mut self,
        walker: &mut Walker<'m>,
        id: ShapeId,
        shape: &'m MapShape,
        member: &Member,
        ctx: XmlReadCtx,
    ) -> Result<Read> {
        let entries = match &ctx.source.last {
            XmlNode::Child(name) if shape.flattened || member.flattened => {
                ctx.source.with_last(XmlNode::Children(name.clone()))
            }
            XmlNode::Child(_) => {
                ctx.source.descend().with_last(XmlNode::Children("entry".to_string()))
            }
            _ => ctx.source.with_last(XmlNode::Children("entry".to_string())),
        };
        let name = helper_name(walker, id);
        if !self.helpers.contains_key(&name) {
            let output_type = walker.rust_type(member)?;
            let compact = is_scalar(walker, &shape.value);
            let key_name = shape.key.location_name.clone().unwrap_or_else(|| "key".to_string());
            let value_name =
                shape.value.location_name.clone().unwrap_or_else(|| "value".to_string());
            let value = walker.nested(|w| {
                let source = XmlSource::base("item").with_last(XmlNode::Child(value_name));
                w.walk(self, &shape.value, XmlReadCtx { source, required: !compact, top: false })
            })?;
            debug!(helper = %name, "emitting map helper");
            self.helpers.insert(
                name.clone(),
                Helper {
                    name: name.clone(),
                    output_type,
                    body: HelperBody::Map {
                        key: Source::Xml(
                            XmlSource::base("item").with_last(XmlNode::Child(key_name)),
                        ),
                        value,
                        compact,
                    },
                },
            );
        }
        Ok(Read::Call { helper: name, source: Source::Xml(entries) })
    }

    fn visit_scalar(
        &mut self,
        _walker: &mut Walker<'m>,
        _id: ShapeId,
        kind: ScalarKind,
        _member: &Member,
        ctx: XmlReadCtx,
    ) -> Result<Read> {
        Ok(Read::Scalar { source: Source::Xml(ctx.source), kind, guarded: !ctx.required })
    }
}
