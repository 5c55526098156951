// Query (form) serializer
//
// Every value is flattened to a `dotted.key=value` pair. Lists and maps
// add 1-based counters to the key; the counter binding is named by nesting
// depth so an inner loop never reuses an outer loop's counter.

use shapegen_model::{ListShape, MapShape, Member, Operation, ShapeId, StructureShape};
use tracing::{trace, warn};

use crate::{
    error::{Error, Result},
    fragment::{
        Access, KeyPath, Leaf, Op, RequestBody, RequestPlan, ScalarKind, Segment, Sink, Target,
    },
    walk::{field, ShapeVisitor, Walker},
};

#[derive(Clone)]
pub(crate) struct FormCtx {
    value: Access,
    path: KeyPath,
}

pub(crate) struct QueryEncoder;

pub(crate) fn request_plan(walker: &mut Walker<'_>, op: &Operation) -> Result<RequestPlan> {
    let mut ops = vec![
        Op::Put {
            target: Target::Form(KeyPath::default().name("Action")),
            value: Leaf::Literal(op.name.clone()),
        },
        Op::Put {
            target: Target::Form(KeyPath::default().name("Version")),
            value: Leaf::Literal(op.api_version.clone()),
        },
    ];
    let input = match op.input {
        Some(id) => {
            let ctx = FormCtx { value: Access::binding("input", true), path: KeyPath::default() };
            ops.extend(walker.walk(&mut QueryEncoder, &Member::new(id), ctx)?);
            Some(walker.type_name(id)?)
        }
        None => None,
    };
    Ok(RequestPlan {
        protocol: op.protocol,
        operation: op.name.clone(),
        api_version: op.api_version.clone(),
        input,
        body: RequestBody::Form,
        ops,
    })
}

impl<'m> ShapeVisitor<'m> for QueryEncoder {
    type Context = FormCtx;
    type Output = Vec<Op>;

    fn visit_structure(
        &mut self,
        walker: &mut Walker<'m>,
        id: ShapeId,
        shape: &'m StructureShape,
        _member: &Member,
        ctx: FormCtx,
    ) -> Result<Vec<Op>> {
        let mut ops = Vec::new();
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
            let path = ctx.path.name(&walker.wire_name(m));
            let value = ctx.value.field(&field(m));
            if m.required || walker.is_collection(m) {
                ops.extend(walker.walk(self, m, FormCtx { value, path })?);
            } else {
                ops.push(walker.nested(|w| {
                    let bind = w.var("v");
                    let ctx = FormCtx { value: Access::binding(&bind, true), path };
                    let body = w.walk(self, m, ctx)?;
                    Ok(Op::IfPresent { value, bind, body })
                })?);
            }
        }
        Ok(ops)
    }

    fn visit_list(
        &mut self,
        walker: &mut Walker<'m>,
        _id: ShapeId,
        shape: &'m ListShape,
        member: &Member,
        ctx: FormCtx,
    ) -> Result<Vec<Op>> {
        walker.nested(|w| {
            let item = w.var("item");
            let counter = w.var("index");
            let path = if shape.flattened || member.flattened {
                ctx.path.push(Segment::Counter(counter.clone()))
            } else {
                ctx.path
                    .name(shape.member.location_name.as_deref().unwrap_or("member"))
                    .push(Segment::Counter(counter.clone()))
            };
            let item_ctx = FormCtx { value: Access::binding(&item, true), path };
            let body = w.walk(self, &shape.member, item_ctx)?;
            Ok(vec![Op::Items {
                list: ctx.value,
                item,
                counter: Some(counter),
                sink: Sink::Inline,
                body,
            }])
        })
    }

    fn visit_map(
        &mut self,
        walker: &mut Walker<'m>,
        id: ShapeId,
        shape: &'m MapShape,
        member: &Member,
        ctx: FormCtx,
    ) -> Result<Vec<Op>> {
        let key_name = shape.key.location_name.as_deref().ok_or_else(|| {
            Error::MissingWireMetadata(
                walker.shape_name(id).to_string(),
                "map key has no locationName".to_string(),
            )
        })?;
        let key_kind = walker.scalar_kind(&shape.key)?;
        walker.nested(|w| {
            let key = w.var("key");
            let value = w.var("value");
            let counter = w.var("index");
            let prefix = if shape.flattened || member.flattened {
                ctx.path.push(Segment::Counter(counter.clone()))
            } else {
                ctx.path.name("entry").push(Segment::Counter(counter.clone()))
            };
            let mut body = vec![Op::Put {
                target: Target::Form(prefix.name(key_name)),
                value: Leaf::Scalar { value: Access::binding(&key, true), kind: key_kind },
            }];
            let value_path = prefix.name(shape.value.location_name.as_deref().unwrap_or("value"));
            body.extend(w.walk(
                self,
                &shape.value,
                FormCtx { value: Access::binding(&value, true), path: value_path },
            )?);
            Ok(vec![Op::Entries { map: ctx.value, key, value, counter: Some(counter), body }])
        })
    }

    fn visit_scalar(
        &mut self,
        _walker: &mut Walker<'m>,
        _id: ShapeId,
        kind: ScalarKind,
        _member: &Member,
        ctx: FormCtx,
    ) -> Result<Vec<Op>> {
        Ok(vec![Op::Put {
            target: Target::Form(ctx.path),
            value: Leaf::Scalar { value: ctx.value, kind },
        }])
    }
}
