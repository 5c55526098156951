//! Shared shape walker
//!
//! Protocol serializers and parsers implement [`ShapeVisitor`] and only say
//! what to emit for each kind of shape. The [`Walker`] owns the recursion:
//! dispatch on the shape kind, cycle detection, depth-keyed binding names
//! and native type naming.

use std::collections::BTreeSet;

use shapegen_model::{
    ListShape, MapShape, Member, NamingRegistry, Role, ScalarType, ShapeId, ShapeKind,
    ShapeModel, StructureMember, StructureShape,
};

use crate::{
    error::{Error, Result},
    fragment::{Field, ScalarKind},
    strings::to_snake_case,
};

pub(crate) trait ShapeVisitor<'m> {
    /// where the value being visited lives (key path, accessor, source)
    type Context;
    type Output;

    fn visit_structure(
        &mut self,
        walker: &mut Walker<'m>,
        id: ShapeId,
        shape: &'m StructureShape,
        member: &Member,
        ctx: Self::Context,
    ) -> Result<Self::Output>;

    fn visit_list(
        &mut self,
        walker: &mut Walker<'m>,
        id: ShapeId,
        shape: &'m ListShape,
        member: &Member,
        ctx: Self::Context,
    ) -> Result<Self::Output>;

    fn visit_map(
        &mut self,
        walker: &mut Walker<'m>,
        id: ShapeId,
        shape: &'m MapShape,
        member: &Member,
        ctx: Self::Context,
    ) -> Result<Self::Output>;

    fn visit_scalar(
        &mut self,
        walker: &mut Walker<'m>,
        id: ShapeId,
        kind: ScalarKind,
        member: &Member,
        ctx: Self::Context,
    ) -> Result<Self::Output>;
}

pub(crate) struct Walker<'m> {
    model: &'m ShapeModel,
    registry: &'m dyn NamingRegistry,
    role: Role,
    depth: usize,
    /// container shapes currently being walked
    stack: Vec<ShapeId>,
    used_types: BTreeSet<String>,
}

impl<'m> Walker<'m> {
    pub(crate) fn new(model: &'m ShapeModel, registry: &'m dyn NamingRegistry, role: Role) -> Self {
        Walker { model, registry, role, depth: 0, stack: Vec::new(), used_types: BTreeSet::new() }
    }

    pub(crate) fn model(&self) -> &'m ShapeModel {
        self.model
    }

    /// Dispatch on the kind of the member's target shape
    pub(crate) fn walk<V: ShapeVisitor<'m>>(
        &mut self,
        visitor: &mut V,
        member: &Member,
        ctx: V::Context,
    ) -> Result<V::Output> {
        let model = self.model;
        let id = member.shape;
        let shape = model.shape(id);
        if let ShapeKind::Scalar(_) = shape.kind {
            let kind = self.scalar_kind(member)?;
            return visitor.visit_scalar(self, id, kind, member, ctx);
        }
        if self.stack.contains(&id) {
            return Err(Error::RecursiveShape(shape.name.clone()));
        }
        self.stack.push(id);
        let out = match &shape.kind {
            ShapeKind::Structure(s) => visitor.visit_structure(self, id, s, member, ctx),
            ShapeKind::List(l) => visitor.visit_list(self, id, l, member, ctx),
            ShapeKind::Map(m) => visitor.visit_map(self, id, m, member, ctx),
            ShapeKind::Scalar(_) => unreachable!("scalars are dispatched above"),
        };
        self.stack.pop();
        out
    }

    /// Runs `f` one nesting level deeper, so bindings it names don't collide with ours
    pub(crate) fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }

    /// Binding name for the current depth, e.g. `index_2`
    pub(crate) fn var(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.depth)
    }

    pub(crate) fn shape_name(&self, id: ShapeId) -> &'m str {
        &self.model.shape(id).name
    }

    /// Native type of a structure, recorded for imports
    pub(crate) fn type_name(&mut self, id: ShapeId) -> Result<String> {
        let name = self.registry.resolve_type_name(id, self.role)?;
        self.used_types.insert(name.clone());
        Ok(name)
    }

    /// Native type of any member target
    pub(crate) fn rust_type(&mut self, member: &Member) -> Result<String> {
        let model = self.model;
        let shape = model.shape(member.shape);
        Ok(match &shape.kind {
            ShapeKind::Structure(_) => self.type_name(member.shape)?,
            ShapeKind::List(l) => format!("Vec<{}>", self.rust_type(&l.member)?),
            ShapeKind::Map(m) => {
                format!("std::collections::BTreeMap<String, {}>", self.rust_type(&m.value)?)
            }
            ShapeKind::Scalar(_) => match self.scalar_kind(member)? {
                ScalarKind::String => "String".to_string(),
                ScalarKind::Integer => "i32".to_string(),
                ScalarKind::Long => "i64".to_string(),
                ScalarKind::Float => "f32".to_string(),
                ScalarKind::Double => "f64".to_string(),
                ScalarKind::Boolean => "bool".to_string(),
                ScalarKind::Blob if member.streaming => "bytes::Bytes".to_string(),
                ScalarKind::Blob => "Vec<u8>".to_string(),
                ScalarKind::Timestamp(_) => "chrono::DateTime<chrono::Utc>".to_string(),
            },
        })
    }

    /// Scalar kind with the member's timestamp format taking precedence over the shape's
    pub(crate) fn scalar_kind(&self, member: &Member) -> Result<ScalarKind> {
        let shape = self.model.shape(member.shape);
        let ShapeKind::Scalar(scalar) = &shape.kind else {
            return Err(Error::UnsupportedShapeType(
                shape.name.clone(),
                shape.kind.kind_name().to_string(),
            ));
        };
        Ok(match &scalar.ty {
            ScalarType::String => ScalarKind::String,
            ScalarType::Integer => ScalarKind::Integer,
            ScalarType::Long => ScalarKind::Long,
            ScalarType::Float => ScalarKind::Float,
            ScalarType::Double => ScalarKind::Double,
            ScalarType::Boolean => ScalarKind::Boolean,
            ScalarType::Blob => ScalarKind::Blob,
            ScalarType::Timestamp => {
                ScalarKind::Timestamp(member.timestamp_format.or(scalar.timestamp_format))
            }
            ScalarType::Other(ty) => {
                return Err(Error::UnsupportedShapeType(shape.name.clone(), ty.clone()))
            }
        })
    }

    /// true if the member targets a list or map shape
    pub(crate) fn is_collection(&self, member: &Member) -> bool {
        matches!(self.model.shape(member.shape).kind, ShapeKind::List(_) | ShapeKind::Map(_))
    }

    pub(crate) fn is_structure(&self, member: &Member) -> bool {
        matches!(self.model.shape(member.shape).kind, ShapeKind::Structure(_))
    }

    /// Name on the wire: location name, else the location name of a flattened
    /// list's member, else the member name
    pub(crate) fn wire_name(&self, member: &StructureMember) -> String {
        if let Some(name) = &member.location_name {
            return name.clone();
        }
        if let ShapeKind::List(list) = &self.model.shape(member.shape).kind {
            if list.flattened || member.flattened {
                if let Some(name) = &list.member.location_name {
                    return name.clone();
                }
            }
        }
        member.name.clone()
    }

    pub(crate) fn used_types(&mut self) -> BTreeSet<String> {
        std::mem::take(&mut self.used_types)
    }
}

/// Rust field for a structure member
pub(crate) fn field(member: &StructureMember) -> Field {
    Field { member: member.name.clone(), ident: field_ident(&member.name) }
}

pub(crate) fn field_ident(name: &str) -> String {
    let ident = to_snake_case(name);
    match ident.as_str() {
        "self" | "super" | "crate" | "Self" => format!("{ident}_"),
        "as" | "async" | "await" | "box" | "break" | "const" | "continue" | "do" | "dyn"
        | "else" | "enum" | "extern" | "false" | "final" | "fn" | "for" | "gen" | "if"
        | "impl" | "in" | "let" | "loop" | "macro" | "match" | "mod" | "move" | "mut"
        | "override" | "priv" | "pub" | "ref" | "return" | "static" | "struct" | "trait"
        | "true" | "try" | "type" | "typeof" | "unsafe" | "unsized" | "use" | "virtual"
        | "where" | "while" | "yield" => format!("r#{ident}"),
        _ => ident,
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::field_ident;

    #[test_case("TopicArn", "topic_arn" ; "pascal")]
    #[test_case("Type", "r#type" ; "keyword")]
    #[test_case("Self", "self_" ; "reserved path segment")]
    #[test_case("maxResults", "max_results" ; "camel")]
    fn field_idents(name: &str, expected: &str) {
        assert_eq!(field_ident(name), expected);
    }
}
