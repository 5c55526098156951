// REST-JSON serializer
//
// Values are written through accessor chains on a `serde_json::Value`
// (`payload["A"]["B"] = ..`). Lists are collected into a vector and
// assigned as an array, so an empty list is written as `[]`.

use shapegen_model::{ListShape, MapShape, Member, Operation, ShapeId, ShapeKind, StructureShape};
use tracing::{trace, warn};

use crate::{
    bindings::location_ops,
    error::{Error, Result},
    fragment::{Access, JsonPlace, Leaf, Op, RequestBody, RequestPlan, ScalarKind, Sink, Target},
    walk::{field, ShapeVisitor, Walker},
};

pub(crate) struct JsonCtx {
    value: Access,
    place: JsonPlace,
    /// the structure is the document itself, not a nested object
    top: bool,
}

pub(crate) struct JsonEncoder;

pub(crate) fn request_plan(walker: &mut Walker<'_>, op: &Operation) -> Result<RequestPlan> {
    let mut plan = RequestPlan {
        protocol: op.protocol,
        operation: op.name.clone(),
        api_version: op.api_version.clone(),
        input: None,
        body: RequestBody::Json,
        ops: Vec::new(),
    };
    let header = action_version(op);
    let Some(id) = op.input else {
        plan.ops = header;
        return Ok(plan);
    };
    plan.input = Some(walker.type_name(id)?);
    let input = Access::binding("input", true);
    let model = walker.model();
    let shape = model.structure(id)?;

    let payload = shape.payload.as_deref().map(|name| model.member(id, name)).transpose()?;
    let raw = payload.is_some_and(|p| !walker.is_structure(p));

    let mut ops = if raw { Vec::new() } else { header };
    for m in shape.members.iter().filter(|m| !m.in_body()) {
        ops.extend(location_ops(walker, &input, m)?);
    }
    match payload {
        None => {
            let ctx = JsonCtx { value: input, place: JsonPlace::root("payload"), top: true };
            ops.extend(walker.walk(&mut JsonEncoder, &Member::new(id), ctx)?);
        }
        Some(payload) => {
            let value = input.field(&field(payload));
            match &model.shape(payload.shape).kind {
                ShapeKind::Structure(_) => {
                    let body = |w: &mut Walker<'_>, value: Access| {
                        let ctx = JsonCtx { value, place: JsonPlace::root("payload"), top: true };
                        w.walk(&mut JsonEncoder, payload, ctx)
                    };
                    ops.extend(guard(walker, payload.required, value, body)?);
                }
                ShapeKind::Scalar(_) => {
                    plan.body = RequestBody::Raw;
                    let kind = walker.scalar_kind(payload)?;
                    let body = |_: &mut Walker<'_>, value: Access| {
                        let value = Leaf::Scalar { value, kind };
                        Ok(vec![Op::Put { target: Target::RawBody, value }])
                    };
                    ops.extend(guard(walker, payload.required, value, body)?);
                }
                other => {
                    return Err(Error::UnsupportedShapeKind(format!(
                        "{} payload members are not implemented",
                        other.kind_name()
                    )))
                }
            }
        }
    }
    plan.ops = ops;
    Ok(plan)
}

/// `Action` and `Version` are written into every structured json body
fn action_version(op: &Operation) -> Vec<Op> {
    vec![
        Op::Put {
            target: Target::Json(JsonPlace::root("payload").key("Action")),
            value: Leaf::Literal(op.name.clone()),
        },
        Op::Put {
            target: Target::Json(JsonPlace::root("payload").key("Version")),
            value: Leaf::Literal(op.api_version.clone()),
        },
    ]
}

/// Runs `body` on the value directly when it is required, otherwise inside a presence check
pub(crate) fn guard<'m, F>(
    walker: &mut Walker<'m>,
    required: bool,
    value: Access,
    body: F,
) -> Result<Vec<Op>>
where
    F: FnOnce(&mut Walker<'m>, Access) -> Result<Vec<Op>>,
{
    if required {
        return body(walker, value);
    }
    walker.nested(|w| {
        let bind = w.var("v");
        let ops = body(w, Access::binding(&bind, true))?;
        Ok(vec![Op::IfPresent { value, bind, body: ops }])
    })
}

impl<'m> ShapeVisitor<'m> for JsonEncoder {
    type Context = JsonCtx;
    type Output = Vec<Op>;

    fn visit_structure(
        &mut self,
        walker: &mut Walker<'m>,
        id: ShapeId,
        shape: &'m StructureShape,
        _member: &Member,
        ctx: JsonCtx,
    ) -> Result<Vec<Op>> {
        let mut ops = Vec::new();
        if !ctx.top {
            ops.push(Op::Put { target: Target::Json(ctx.place.clone()), value: Leaf::EmptyObject });
        }
        for m in shape.members.iter() {
            if !m.in_body() {
                trace!(shape = walker.shape_name(id), member = %m.name, "skipping bound member");
                continue;
            }
            if m.deprecated {
                warn!(
                    shape = walker.shape_name(id),
                    member = %m.name,
                    "serializing deprecated member"
                );
            }
            let place = ctx.place.key(&walker.wire_name(m));
            let value = ctx.value.field(&field(m));
            let required = m.required || walker.is_collection(m);
            ops.extend(guard(walker, required, value, |w, value| {
                w.walk(self, m, JsonCtx { value, place, top: false })
            })?);
        }
        Ok(ops)
    }

    fn visit_list(
        &mut self,
        walker: &mut Walker<'m>,
        _id: ShapeId,
        shape: &'m ListShape,
        _member: &Member,
        ctx: JsonCtx,
    ) -> Result<Vec<Op>> {
        walker.nested(|w| {
            let item = w.var("item");
            let list = w.var("list");
            let element = w.var("element");
            let body = w.walk(
                self,
                &shape.member,
                JsonCtx {
                    value: Access::binding(&item, true),
                    place: JsonPlace::root(&element),
                    top: false,
                },
            )?;
            Ok(vec![Op::Items {
                list: ctx.value,
                item,
                counter: None,
                sink: Sink::Collect { list, element, into: ctx.place },
                body,
            }])
        })
    }

    fn visit_map(
        &mut self,
        _walker: &mut Walker<'m>,
        _id: ShapeId,
        _shape: &'m MapShape,
        _member: &Member,
        _ctx: JsonCtx,
    ) -> Result<Vec<Op>> {
        Err(Error::UnsupportedShapeKind("MapShapes are not implemented".to_string()))
    }

    fn visit_scalar(
        &mut self,
        _walker: &mut Walker<'m>,
        _id: ShapeId,
        kind: ScalarKind,
        _member: &Member,
        ctx: JsonCtx,
    ) -> Result<Vec<Op>> {
        Ok(vec![Op::Put {
            target: Target::Json(ctx.place),
            value: Leaf::Scalar { value: ctx.value, kind },
        }])
    }
}
