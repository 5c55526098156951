// REST-XML serializer
//
// Builds an element tree rooted at `root`: structures and scalars become
// child elements, `xmlAttribute` members become attributes of their parent.

use shapegen_model::{ListShape, MapShape, Member, Operation, ShapeId, ShapeKind, StructureShape};
use tracing::{trace, warn};

use crate::{
    bindings::location_ops,
    encode_json::guard,
    error::{Error, Result},
    fragment::{Access, Leaf, Op, RequestBody, RequestPlan, ScalarKind, Sink, Target},
    walk::{field, ShapeVisitor, Walker},
};

const ROOT: &str = "root";

pub(crate) struct XmlCtx {
    value: Access,
    /// element binding the value is appended to
    parent: String,
    name: String,
    /// the structure is the root element itself
    top: bool,
}

pub(crate) struct XmlEncoder;

pub(crate) fn request_plan(walker: &mut Walker<'_>, op: &Operation) -> Result<RequestPlan> {
    let mut plan = RequestPlan {
        protocol: op.protocol,
        operation: op.name.clone(),
        api_version: op.api_version.clone(),
        input: None,
        body: RequestBody::None,
        ops: Vec::new(),
    };
    let Some(id) = op.input else {
        return Ok(plan);
    };
    plan.input = Some(walker.type_name(id)?);
    let input = Access::binding("input", true);
    let model = walker.model();
    let shape = model.structure(id)?;

    for m in shape.members.iter().filter(|m| !m.in_body()) {
        plan.ops.extend(location_ops(walker, &input, m)?);
    }

    let Some(name) = &shape.payload else {
        if shape.members.iter().any(|m| m.in_body()) {
            plan.body = RequestBody::Xml {
                name: model.shape(id).name.clone(),
                namespace: shape.xml_namespace.clone(),
            };
            let ctx =
                XmlCtx { value: input, parent: ROOT.to_string(), name: String::new(), top: true };
            plan.ops.extend(walker.walk(&mut XmlEncoder, &Member::new(id), ctx)?);
        }
        return Ok(plan);
    };

    let payload = model.member(id, name)?;
    let value = input.field(&field(payload));
    let target = model.shape(payload.shape);
    match &target.kind {
        ShapeKind::Structure(s) => {
            plan.body = RequestBody::Xml {
                name: payload.location_name.clone().unwrap_or_else(|| target.name.clone()),
                namespace: s.xml_namespace.clone().or_else(|| shape.xml_namespace.clone()),
            };
            let body = |w: &mut Walker<'_>, value: Access| {
                let ctx =
                    XmlCtx { value, parent: ROOT.to_string(), name: String::new(), top: true };
                w.walk(&mut XmlEncoder, payload, ctx)
            };
            plan.ops.extend(guard(walker, payload.required, value, body)?);
        }
        ShapeKind::Scalar(_) => {
            plan.body = RequestBody::Raw;
            let kind = walker.scalar_kind(payload)?;
            let body = |_: &mut Walker<'_>, value: Access| {
                Ok(vec![Op::Put { target: Target::RawBody, value: Leaf::Scalar { value, kind } }])
            };
            plan.ops.extend(guard(walker, payload.required, value, body)?);
        }
        other => {
            return Err(Error::UnsupportedShapeKind(format!(
                "{} payload members are not implemented",
                other.kind_name()
            )))
        }
    }
    Ok(plan)
}

impl XmlEncoder {
    fn members<'m>(
        &mut self,
        walker: &mut Walker<'m>,
        id: ShapeId,
        shape: &'m StructureShape,
        value: &Access,
        parent: &str,
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
            let name = walker.wire_name(m);
            let member_value = value.field(&field(m));
            let required = m.required || walker.is_collection(m);
            if m.xml_attribute {
                let kind = walker.scalar_kind(m)?;
                let target = Target::XmlAttribute { element: parent.to_string(), name };
                ops.extend(guard(walker, required, member_value, |_, value| {
                    Ok(vec![Op::Put { target, value: Leaf::Scalar { value, kind } }])
                })?);
            } else {
                let parent = parent.to_string();
                ops.extend(guard(walker, required, member_value, |w, value| {
                    w.walk(self, m, XmlCtx { value, parent, name, top: false })
                })?);
            }
        }
        Ok(ops)
    }
}

impl<'m> ShapeVisitor<'m> for XmlEncoder {
    type Context = XmlCtx;
    type Output = Vec<Op>;

    fn visit_structure(
        &mut self,
        walker: &mut Walker<'m>,
        id: ShapeId,
        shape: &'m StructureShape,
        _member: &Member,
        ctx: XmlCtx,
    ) -> Result<Vec<Op>> {
        if ctx.top {
            return self.members(walker, id, shape, &ctx.value, &ctx.parent);
        }
        walker.nested(|w| {
            let var = w.var("element");
            let mut body = Vec::new();
            if let Some(ns) = &shape.xml_namespace {
                body.push(Op::Put {
                    target: Target::XmlAttribute {
                        element: var.clone(),
                        name: "xmlns".to_string(),
                    },
                    value: Leaf::Literal(ns.clone()),
                });
            }
            body.extend(self.members(w, id, shape, &ctx.value, &var)?);
            Ok(vec![Op::Element { parent: ctx.parent, name: ctx.name, var, body }])
        })
    }

    fn visit_list(
        &mut self,
        walker: &mut Walker<'m>,
        _id: ShapeId,
        shape: &'m ListShape,
        member: &Member,
        ctx: XmlCtx,
    ) -> Result<Vec<Op>> {
        let flattened = shape.flattened || member.flattened;
        walker.nested(|w| {
            let item = w.var("item");
            let item_value = Access::binding(&item, true);
            if flattened {
                let body = w.walk(
                    self,
                    &shape.member,
                    XmlCtx { value: item_value, parent: ctx.parent, name: ctx.name, top: false },
                )?;
                return Ok(vec![Op::Items {
                    list: ctx.value,
                    item,
                    counter: None,
                    sink: Sink::Inline,
                    body,
                }]);
            }
            let wrapper = w.var("element");
            let name = shape.member.location_name.clone().unwrap_or_else(|| "member".to_string());
            let body = w.walk(
                self,
                &shape.member,
                XmlCtx { value: item_value, parent: wrapper.clone(), name, top: false },
            )?;
            Ok(vec![Op::Element {
                parent: ctx.parent,
                name: ctx.name,
                var: wrapper,
                body: vec![Op::Items {
                    list: ctx.value,
                    item,
                    counter: None,
                    sink: Sink::Inline,
                    body,
                }],
            }])
        })
    }

    fn visit_map(
        &mut self,
        walker: &mut Walker<'m>,
        _id: ShapeId,
        shape: &'m MapShape,
        member: &Member,
        ctx: XmlCtx,
    ) -> Result<Vec<Op>> {
        let flattened = shape.flattened || member.flattened;
        walker.nested(|w| {
            let key = w.var("key");
            let value = w.var("value");
            let entry = w.var("entry");
            let wrapper = w.var("element");
            let mut entry_body = w.walk(
                self,
                &shape.key,
                XmlCtx {
                    value: Access::binding(&key, true),
                    parent: entry.clone(),
                    name: shape.key.location_name.clone().unwrap_or_else(|| "key".to_string()),
                    top: false,
                },
            )?;
            entry_body.extend(w.walk(
                self,
                &shape.value,
                XmlCtx {
                    value: Access::binding(&value, true),
                    parent: entry.clone(),
                    name: shape.value.location_name.clone().unwrap_or_else(|| "value".to_string()),
                    top: false,
                },
            )?);
            let (entry_parent, entry_name) = if flattened {
                (ctx.parent.clone(), ctx.name.clone())
            } else {
                (wrapper.clone(), "entry".to_string())
            };
            let entries = Op::Entries {
                map: ctx.value,
                key,
                value,
                counter: None,
                body: vec![Op::Element {
                    parent: entry_parent,
                    name: entry_name,
                    var: entry,
                    body: entry_body,
                }],
            };
            if flattened {
                return Ok(vec![entries]);
            }
            Ok(vec![Op::Element {
                parent: ctx.parent,
                name: ctx.name,
                var: wrapper,
                body: vec![entries],
            }])
        })
    }

    fn visit_scalar(
        &mut self,
        walker: &mut Walker<'m>,
        _id: ShapeId,
        kind: ScalarKind,
        _member: &Member,
        ctx: XmlCtx,
    ) -> Result<Vec<Op>> {
        walker.nested(|w| {
            let var = w.var("element");
            let put = Op::Put {
                target: Target::XmlText(var.clone()),
                value: Leaf::Scalar { value: ctx.value, kind },
            };
            Ok(vec![Op::Element { parent: ctx.parent, name: ctx.name, var, body: vec![put] }])
        })
    }
}
