//! Members bound to headers, the query string, uri labels and the status code

use shapegen_model::{Location, ShapeKind, StructureMember};
use tracing::{trace, warn};

use crate::{
    error::{Error, Result},
    fragment::{Access, Leaf, Op, Read, Sink, Target},
    walk::{field, Walker},
};

/// Ops writing one location-bound member of the input found at `owner`
pub(crate) fn location_ops(
    walker: &mut Walker<'_>,
    owner: &Access,
    member: &StructureMember,
) -> Result<Vec<Op>> {
    let Some(location) = member.location else {
        return Ok(Vec::new());
    };
    if member.deprecated {
        warn!(member = %member.name, "serializing deprecated member");
    }
    let name = member.location_name.clone().unwrap_or_else(|| member.name.clone());
    let value = owner.field(&field(member));
    let model = walker.model();
    let shape = model.shape(member.shape);

    match (location, &shape.kind) {
        (Location::Headers, ShapeKind::Map(map)) => {
            let kind = walker.scalar_kind(&map.value)?;
            walker.nested(|w| {
                let key = w.var("key");
                let entry = w.var("value");
                let put = Op::Put {
                    target: Target::PrefixedHeader { prefix: name, key: key.clone() },
                    value: Leaf::Scalar { value: Access::binding(&entry, true), kind },
                };
                Ok(vec![Op::Entries {
                    map: value,
                    key,
                    value: entry,
                    counter: None,
                    body: vec![put],
                }])
            })
        }
        (Location::Querystring, ShapeKind::List(list)) => {
            let kind = walker.scalar_kind(&list.member)?;
            walker.nested(|w| {
                let item = w.var("item");
                let put = Op::Put {
                    target: Target::QueryParam(name),
                    value: Leaf::Scalar { value: Access::binding(&item, true), kind },
                };
                Ok(vec![Op::Items {
                    list: value,
                    item,
                    counter: None,
                    sink: Sink::Inline,
                    body: vec![put],
                }])
            })
        }
        (Location::Header | Location::Querystring | Location::Uri, ShapeKind::Scalar(_)) => {
            let kind = walker.scalar_kind(member)?;
            let target = match location {
                Location::Header => Target::Header(name),
                Location::Querystring => Target::QueryParam(name),
                _ => Target::Label(name),
            };
            if member.required {
                return Ok(vec![Op::Put { target, value: Leaf::Scalar { value, kind } }]);
            }
            walker.nested(|w| {
                let bind = w.var("v");
                let leaf = Leaf::Scalar { value: Access::binding(&bind, true), kind };
                let put = Op::Put { target, value: leaf };
                Ok(vec![Op::IfPresent { value, bind, body: vec![put] }])
            })
        }
        (Location::StatusCode, _) => Ok(Vec::new()),
        (location, kind) => Err(Error::UnsupportedShapeKind(format!(
            "{} members bound to {:?} are not implemented",
            kind.kind_name(),
            location
        ))),
    }
}

/// Read for a response member bound to a header, the header map or the
/// status code. Uri and querystring members have nothing to read.
pub(crate) fn location_read(walker: &Walker<'_>, member: &StructureMember) -> Result<Option<Read>> {
    let Some(location) = member.location else {
        return Ok(None);
    };
    let name = member.location_name.clone().unwrap_or_else(|| member.name.clone());
    let model = walker.model();
    let shape = model.shape(member.shape);
    Ok(match (location, &shape.kind) {
        (Location::Header, ShapeKind::Scalar(_)) => {
            Some(Read::Header { name, kind: walker.scalar_kind(member)? })
        }
        (Location::Headers, ShapeKind::Map(_)) => Some(Read::PrefixHeaders { prefix: name }),
        (Location::StatusCode, ShapeKind::Scalar(_)) => Some(Read::StatusCode),
        (Location::Uri | Location::Querystring, _) => {
            trace!(member = %member.name, "request-only member has nothing to read");
            None
        }
        (location, kind) => {
            return Err(Error::UnsupportedShapeKind(format!(
                "{} members bound to {:?} are not implemented",
                kind.kind_name(),
                location
            )))
        }
    })
}
