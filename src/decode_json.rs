// REST-JSON parser
//
// Every read is a single expression over a `&serde_json::Value`. A null or
// missing optional member reads as `None`, a required one as its type
// default. Lists and maps are unpacked by named helper functions so nesting
// never needs statements inside an expression.

use std::collections::BTreeMap;

use shapegen_model::{ListShape, MapShape, Member, Operation, ShapeId, StructureShape};
use tracing::debug;

use crate::{
    bindings::location_read,
    error::{Error, Result},
    fragment::{
        BodyRead, Document, Helper, HelperBody, JsonSource, Read, ResponsePlan, ScalarKind, Source,
    },
    strings::to_snake_case,
    walk::{field, ShapeVisitor, Walker},
};

pub(crate) struct JsonReadCtx {
    source: JsonSource,
    guarded: bool,
    /// the operation output itself, where payload members apply
    top: bool,
}

#[derive(Default)]
pub(crate) struct JsonDecoder {
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

    let mut decoder = JsonDecoder::default();
    let ctx = JsonReadCtx { source: JsonSource::base("data"), guarded: false, top: true };
    plan.read = walker.walk(&mut decoder, &Member::new(id), ctx)?;
    if decoder.reads_body {
        plan.document = Document::Json;
    }
    plan.helpers = decoder.helpers;
    Ok(plan)
}

/// Read for a non-document payload member
pub(crate) fn payload_body(walker: &Walker<'_>, member: &Member) -> Result<Read> {
    Ok(match walker.scalar_kind(member)? {
        ScalarKind::Blob if member.streaming => Read::Body(BodyRead::Stream),
        ScalarKind::Blob => Read::Body(BodyRead::Blob),
        ScalarKind::String => Read::Body(BodyRead::Text),
        other => {
            return Err(Error::UnsupportedShapeKind(format!(
                "{other:?} payload members are not implemented"
            )))
        }
    })
}

pub(crate) fn helper_name(walker: &Walker<'_>, id: ShapeId) -> String {
    format!("populate_result_{}", to_snake_case(walker.shape_name(id)))
}

impl<'m> ShapeVisitor<'m> for JsonDecoder {
    type Context = JsonReadCtx;
    type Output = Read;

    fn visit_structure(
        &mut self,
        walker: &mut Walker<'m>,
        id: ShapeId,
        shape: &'m StructureShape,
        _member: &Member,
        ctx: JsonReadCtx,
    ) -> Result<Read> {
        let type_name = walker.type_name(id)?;
        let payload = if ctx.top { shape.payload.as_deref() } else { None };
        walker.nested(|w| {
            let bind = w.var("v");
            let base = if ctx.guarded { JsonSource::base(&bind) } else { ctx.source.clone() };
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
                            let ctx =
                                JsonReadCtx { source: base.clone(), guarded: false, top: false };
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
                        let source = base.key(&w.wire_name(m));
                        let ctx = JsonReadCtx { source, guarded: !m.required, top: false };
                        w.walk(self, m, ctx)?
                    }
                };
                fields.push((field(m), read));
            }
            Ok(Read::Record {
                type_name,
                source: Source::Json(ctx.source),
                guarded: ctx.guarded,
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
        ctx: JsonReadCtx,
    ) -> Result<Read> {
        let name = helper_name(walker, id);
        if !self.helpers.contains_key(&name) {
            let output_type = walker.rust_type(member)?;
            let compact =
                !walker.is_structure(&shape.member) && !walker.is_collection(&shape.member);
            let item = walker.nested(|w| {
                let source = JsonSource::base("item");
                let ctx = JsonReadCtx { source, guarded: compact, top: false };
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
        Ok(Read::Call { helper: name, source: Source::Json(ctx.source) })
    }

    fn visit_map(
        &mut self,
        walker: &mut Walker<'m>,
        id: ShapeId,
        shape: &'m MapShape,
        member: &Member,
        ctx: JsonReadCtx,
    ) -> Result<Read> {
        let key_name = shape.key.location_name.as_deref().ok_or_else(|| {
            Error::MissingWireMetadata(
                walker.shape_name(id).to_string(),
                "map key has no locationName".to_string(),
            )
        })?;
        let name = helper_name(walker, id);
        if !self.helpers.contains_key(&name) {
            let output_type = walker.rust_type(member)?;
            let compact = !walker.is_structure(&shape.value) && !walker.is_collection(&shape.value);
            let value_name = shape.value.location_name.as_deref().unwrap_or("value");
            let value = walker.nested(|w| {
                let source = JsonSource::base("item").key(value_name);
                w.walk(self, &shape.value, JsonReadCtx { source, guarded: compact, top: false })
            })?;
            debug!(helper = %name, "emitting map helper");
            self.helpers.insert(
                name.clone(),
                Helper {
                    name: name.clone(),
                    output_type,
                    body: HelperBody::Map {
                        key: Source::Json(JsonSource::base("item").key(key_name)),
                        value,
                        compact,
                    },
                },
            );
        }
        Ok(Read::Call { helper: name, source: Source::Json(ctx.source) })
    }

    fn visit_scalar(
        &mut self,
        _walker: &mut Walker<'m>,
        _id: ShapeId,
        kind: ScalarKind,
        _member: &Member,
        ctx: JsonReadCtx,
    ) -> Result<Read> {
        Ok(Read::Scalar { source: Source::Json(ctx.source), kind, guarded: ctx.guarded })
    }
}
