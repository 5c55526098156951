//! Renders plans to Rust source
//!
//! Serializer ops become statements filling a `RequestParts`; parser reads
//! become one expression each, laid out over several lines where they
//! contain struct literals or matches. Parser helpers are rendered as
//! separate functions.

use std::collections::BTreeMap;

use shapegen_model::TimestampFormat;

use crate::{
    fragment::{
        timestamp_format, Access, BodyRead, Document, Helper, HelperBody, JsonPlace, JsonSource,
        KeyPath, Leaf, Op, Read, RequestBody, RequestPlan, ResponsePlan, ScalarKind, Segment,
        Sink, Source, Target, XmlNode, XmlSource,
    },
    strings::to_snake_case,
    writer::Writer,
};

/// Path of the support module in generated code
pub const RUNTIME: &str = "shapegen::runtime";

/// Rust string literal for `s`
fn lit(s: &str) -> String {
    format!("{s:?}")
}

/// Indents every line after the first, for nesting multi-line expressions
fn indent(s: &str) -> String {
    s.replace('\n', "\n    ")
}

pub(crate) fn request_signature(plan: &RequestPlan) -> String {
    let name = format!("serialize_{}", to_snake_case(&plan.operation));
    match &plan.input {
        Some(ty) => format!("pub fn {name}(input: &{ty}) -> {RUNTIME}::RequestParts"),
        None => format!("pub fn {name}() -> {RUNTIME}::RequestParts"),
    }
}

pub(crate) fn response_signature(plan: &ResponsePlan) -> String {
    let name = format!("parse_{}", to_snake_case(&plan.operation));
    match &plan.output {
        Some(ty) => format!(
            "pub fn {name}(response: &{RUNTIME}::ResponseParts) \
             -> Result<{ty}, {RUNTIME}::DecodeError>"
        ),
        None => format!(
            "pub fn {name}(_response: &{RUNTIME}::ResponseParts) \
             -> Result<(), {RUNTIME}::DecodeError>"
        ),
    }
}

/// Body of the serializer function
pub(crate) fn request_body(plan: &RequestPlan) -> String {
    let mut w = Writer::with_depth(1);
    w.line(format!("let mut request = {RUNTIME}::RequestParts::default();"));
    match &plan.body {
        RequestBody::Form => w.line("let mut params: Vec<(String, String)> = Vec::new();"),
        RequestBody::Json => {
            w.line("let mut payload = serde_json::Value::Object(serde_json::Map::new());")
        }
        RequestBody::Xml { name, namespace } => {
            w.line(format!("let mut root = {RUNTIME}::XmlElement::new({});", lit(name)));
            if let Some(ns) = namespace {
                w.line(format!("root.set_attribute(\"xmlns\", {});", lit(ns)));
            }
        }
        RequestBody::None | RequestBody::Raw => {}
    }
    ops(&mut w, &plan.ops);
    match &plan.body {
        RequestBody::Form => {
            w.line(format!("request.body = {RUNTIME}::form_encode(&params).into_bytes();"))
        }
        RequestBody::Json => w.line("request.body = payload.to_string().into_bytes();"),
        RequestBody::Xml { .. } => w.line("request.body = root.to_xml().into_bytes();"),
        RequestBody::None | RequestBody::Raw => {}
    }
    w.line("request");
    w.into_string()
}

fn ops(w: &mut Writer, ops: &[Op]) {
    for op in ops {
        render_op(w, op);
    }
}

fn render_op(w: &mut Writer, op: &Op) {
    match op {
        Op::IfPresent { value, bind, body } => {
            let amp = if value.is_ref() { "" } else { "&" };
            w.open(format!("if let Some({bind}) = {amp}{} {{", value.expr()));
            ops(w, body);
            w.close("}");
        }
        Op::Items { list, item, counter, sink, body } => {
            if let Sink::Collect { list: collected, .. } = sink {
                w.line(format!("let mut {collected} = Vec::new();"));
            }
            match counter {
                Some(counter) => {
                    let list = list.expr();
                    w.open(format!("for ({counter}, {item}) in {list}.iter().enumerate() {{"));
                    w.line(format!("let {counter} = {counter} + 1;"));
                }
                None => w.open(format!("for {item} in {}.iter() {{", list.expr())),
            }
            match sink {
                Sink::Inline => ops(w, body),
                Sink::Collect { list: collected, element, .. } => {
                    w.line(format!("let mut {element} = serde_json::Value::Null;"));
                    ops(w, body);
                    w.line(format!("{collected}.push({element});"));
                }
            }
            w.close("}");
            if let Sink::Collect { list: collected, into, .. } = sink {
                w.line(format!("{} = serde_json::Value::Array({collected});", json_place(into)));
            }
        }
        Op::Entries { map, key, value, counter, body } => {
            match counter {
                Some(counter) => {
                    w.open(format!(
                        "for ({counter}, ({key}, {value})) in {}.iter().enumerate() {{",
                        map.expr()
                    ));
                    w.line(format!("let {counter} = {counter} + 1;"));
                }
                None => w.open(format!("for ({key}, {value}) in {}.iter() {{", map.expr())),
            }
            ops(w, body);
            w.close("}");
        }
        Op::Element { parent, name, var, body } => {
            w.line(format!("let mut {var} = {RUNTIME}::XmlElement::new({});", lit(name)));
            ops(w, body);
            w.line(format!("{parent}.push({var});"));
        }
        Op::Put { target, value } => put(w, target, value),
    }
}

fn put(w: &mut Writer, target: &Target, value: &Leaf) {
    let stmt = match target {
        Target::Form(path) => format!("params.push(({}, {}));", form_key(path), text(value, false)),
        Target::Json(place) => format!("{} = {};", json_place(place), json_value(value)),
        Target::XmlText(element) => format!("{element}.set_text({});", text(value, false)),
        Target::XmlAttribute { element, name } => {
            format!("{element}.set_attribute({}, {});", lit(name), text(value, false))
        }
        Target::Header(name) => {
            format!("request.headers.push(({}.to_string(), {}));", lit(name), text(value, true))
        }
        Target::PrefixedHeader { prefix, key } => format!(
            "request.headers.push((format!(\"{{}}{{}}\", {}, {key}), {}));",
            lit(prefix),
            text(value, true)
        ),
        Target::QueryParam(name) => {
            format!("request.query.push(({}.to_string(), {}));", lit(name), text(value, false))
        }
        Target::Label(name) => {
            format!("request.labels.insert({}.to_string(), {});", lit(name), text(value, false))
        }
        Target::RawBody => format!("request.body = {};", raw_bytes(value)),
    };
    w.line(stmt);
}

/// `"A.B".to_string()` or `format!("A.{}.B", index_1)`
fn form_key(path: &KeyPath) -> String {
    let counters: Vec<&str> = path
        .0
        .iter()
        .filter_map(|s| match s {
            Segment::Counter(c) => Some(c.as_str()),
            Segment::Name(_) => None,
        })
        .collect();
    let pattern = path
        .0
        .iter()
        .map(|s| match s {
            Segment::Name(n) if counters.is_empty() => n.clone(),
            Segment::Name(n) => n.replace('{', "{{").replace('}', "}}"),
            Segment::Counter(_) => "{}".to_string(),
        })
        .collect::<Vec<_>>()
        .join(".");
    if counters.is_empty() {
        format!("{}.to_string()", lit(&pattern))
    } else {
        format!("format!({}, {})", lit(&pattern), counters.join(", "))
    }
}

fn json_place(place: &JsonPlace) -> String {
    let mut s = place.root.clone();
    for key in place.keys.iter() {
        s.push_str(&format!("[{}]", lit(key)));
    }
    s
}

/// Copy of a `Copy` scalar
fn copied(value: &Access) -> String {
    if value.is_ref() {
        format!("*{}", value.expr())
    } else {
        value.expr()
    }
}

fn borrowed(value: &Access) -> String {
    if value.is_ref() {
        value.expr()
    } else {
        format!("&{}", value.expr())
    }
}

fn base64_encode(value: &Access) -> String {
    format!(
        "base64::Engine::encode(&base64::engine::general_purpose::STANDARD, {})",
        borrowed(value)
    )
}

fn timestamp_text(expr: &str, format: TimestampFormat) -> String {
    match format {
        TimestampFormat::Iso8601 => {
            format!("{expr}.to_rfc3339_opts(chrono::SecondsFormat::Secs, false)")
        }
        TimestampFormat::UnixTimestamp => format!("{expr}.timestamp().to_string()"),
        TimestampFormat::Rfc822 => format!("{expr}.format({RUNTIME}::RFC822_FORMAT).to_string()"),
    }
}

/// `String` expression for a leaf written as text
fn text(leaf: &Leaf, in_header: bool) -> String {
    let (value, kind) = match leaf {
        Leaf::Literal(s) => return format!("{}.to_string()", lit(s)),
        Leaf::EmptyObject => return "String::new()".to_string(),
        Leaf::Scalar { value, kind } => (value, *kind),
    };
    match kind {
        ScalarKind::String
        | ScalarKind::Integer
        | ScalarKind::Long
        | ScalarKind::Float
        | ScalarKind::Double => format!("{}.to_string()", value.expr()),
        ScalarKind::Boolean => {
            format!("String::from(if {} {{ \"true\" }} else {{ \"false\" }})", copied(value))
        }
        ScalarKind::Blob => base64_encode(value),
        ScalarKind::Timestamp(declared) => {
            timestamp_text(&value.expr(), timestamp_format(declared, in_header))
        }
    }
}

fn json_value(leaf: &Leaf) -> String {
    let (value, kind) = match leaf {
        Leaf::Literal(s) => return format!("serde_json::Value::from({})", lit(s)),
        Leaf::EmptyObject => return "serde_json::Value::Object(serde_json::Map::new())".to_string(),
        Leaf::Scalar { value, kind } => (value, *kind),
    };
    match kind {
        ScalarKind::String => format!("serde_json::Value::from({}.as_str())", value.expr()),
        ScalarKind::Integer | ScalarKind::Long | ScalarKind::Float | ScalarKind::Double => {
            format!("serde_json::Value::from({})", copied(value))
        }
        ScalarKind::Boolean => {
            let value = copied(value);
            format!("serde_json::Value::from(if {value} {{ \"true\" }} else {{ \"false\" }})")
        }
        ScalarKind::Timestamp(Some(TimestampFormat::UnixTimestamp)) => {
            format!("serde_json::Value::from({}.timestamp())", value.expr())
        }
        _ => format!("serde_json::Value::from({})", text(leaf, false)),
    }
}

fn raw_bytes(leaf: &Leaf) -> String {
    match leaf {
        Leaf::Scalar { value, kind: ScalarKind::Blob } => format!("{}.to_vec()", value.expr()),
        Leaf::Scalar { value, kind: ScalarKind::String } => {
            format!("{}.as_bytes().to_vec()", value.expr())
        }
        other => format!("{}.into_bytes()", text(other, false)),
    }
}

/// Body of the parser function
pub(crate) fn response_body(plan: &ResponsePlan) -> String {
    let mut w = Writer::with_depth(1);
    match plan.document {
        Document::Json => {
            w.line("let data = response.json()?;");
            match &plan.wrapper {
                Some(wrapper) => w.line(format!("let data = &data[{}];", lit(wrapper))),
                None => w.line("let data = &data;"),
            }
        }
        Document::Xml => {
            w.line("let data = response.xml()?;");
            match &plan.wrapper {
                Some(wrapper) => w.line(format!("let data = data.element({});", lit(wrapper))),
                None => w.line("let data = &data;"),
            }
        }
        Document::None => {}
    }
    match &plan.read {
        Read::Unit => w.line("Ok(())"),
        read => lines(&mut w, &format!("Ok({})", read_expr(read))),
    }
    w.into_string()
}

fn lines(w: &mut Writer, text: &str) {
    for line in text.lines() {
        w.line(line);
    }
}

/// `&data["A"]["B"]`, or the bare binding when there are no keys
fn json_ref(source: &JsonSource) -> String {
    if source.keys.is_empty() {
        return source.base.clone();
    }
    let mut s = format!("&{}", source.base);
    for key in source.keys.iter() {
        s.push_str(&format!("[{}]", lit(key)));
    }
    s
}

/// Element the source's last node is looked up on
fn xml_element(source: &XmlSource) -> String {
    let mut s = source.base.clone();
    for hop in source.path.iter() {
        s.push_str(&format!(".element({})", lit(hop)));
    }
    s
}

/// `Option<&str>` expression for the text a scalar is read from
fn xml_text(source: &XmlSource) -> String {
    let element = xml_element(source);
    match &source.last {
        XmlNode::Node => format!("Some({element}.text())"),
        XmlNode::Child(name) | XmlNode::Children(name) => {
            format!("{element}.child({}).map(|element| element.text())", lit(name))
        }
        XmlNode::Attribute { ns: Some(ns), name } => {
            format!("{element}.namespaced_attribute({}, {})", lit(ns), lit(name))
        }
        XmlNode::Attribute { ns: None, name } => format!("{element}.attribute({})", lit(name)),
    }
}

fn parse_timestamp(s: &str, format: TimestampFormat) -> String {
    match format {
        TimestampFormat::Iso8601 => format!(
            "chrono::DateTime::parse_from_rfc3339({s}.trim()).ok()\
             .map(|t| t.with_timezone(&chrono::Utc))"
        ),
        TimestampFormat::Rfc822 => format!(
            "chrono::DateTime::parse_from_rfc2822({s}.trim()).ok()\
             .map(|t| t.with_timezone(&chrono::Utc))"
        ),
        TimestampFormat::UnixTimestamp => format!(
            "{s}.trim().parse::<f64>().ok()\
             .and_then(|n| chrono::DateTime::from_timestamp(n as i64, 0))"
        ),
    }
}

/// `Option<T>` expression coercing the `&str` binding `text`
fn coerce_text(kind: ScalarKind, in_header: bool) -> String {
    match kind {
        ScalarKind::String => "Some(text.to_string())".to_string(),
        ScalarKind::Integer => "text.trim().parse::<i32>().ok()".to_string(),
        ScalarKind::Long => "text.trim().parse::<i64>().ok()".to_string(),
        ScalarKind::Float => "text.trim().parse::<f32>().ok()".to_string(),
        ScalarKind::Double => "text.trim().parse::<f64>().ok()".to_string(),
        ScalarKind::Boolean => "Some(text.trim() == \"true\")".to_string(),
        ScalarKind::Blob => {
            "base64::Engine::decode(&base64::engine::general_purpose::STANDARD, text.trim()).ok()"
                .to_string()
        }
        ScalarKind::Timestamp(declared) => {
            parse_timestamp("text", timestamp_format(declared, in_header))
        }
    }
}

/// `Option<T>` expression coercing the non-null `&serde_json::Value` binding `value`
fn coerce_json(kind: ScalarKind) -> String {
    match kind {
        ScalarKind::String => "value.as_str().map(str::to_owned)".to_string(),
        ScalarKind::Integer => "value.as_i64().and_then(|n| i32::try_from(n).ok())".to_string(),
        ScalarKind::Long => "value.as_i64()".to_string(),
        ScalarKind::Float => {
            "value.as_f64().filter(|n| n.abs() <= f64::from(f32::MAX)).map(|n| n as f32)"
                .to_string()
        }
        ScalarKind::Double => "value.as_f64()".to_string(),
        ScalarKind::Boolean => {
            "Some(value.as_str().map_or_else(|| value.to_string(), str::to_owned) == \"true\")"
                .to_string()
        }
        ScalarKind::Blob => concat!(
            "value.as_str().and_then(|s| ",
            "base64::Engine::decode(&base64::engine::general_purpose::STANDARD, s).ok())"
        )
        .to_string(),
        ScalarKind::Timestamp(Some(TimestampFormat::UnixTimestamp)) => {
            "value.as_f64().and_then(|n| chrono::DateTime::from_timestamp(n as i64, 0))".to_string()
        }
        ScalarKind::Timestamp(declared) => format!(
            "value.as_str().and_then(|s| {})",
            parse_timestamp("s", timestamp_format(declared, false))
        ),
    }
}

fn read_expr(read: &Read) -> String {
    match read {
        Read::Unit => "()".to_string(),
        Read::Scalar { source: Source::Json(source), kind, guarded } => {
            let expr = format!(
                "match {} {{ serde_json::Value::Null => None, value => {} }}",
                json_ref(source),
                coerce_json(*kind)
            );
            if *guarded {
                expr
            } else {
                format!("{expr}.unwrap_or_default()")
            }
        }
        Read::Scalar { source: Source::Xml(source), kind, guarded } => {
            let expr =
                format!("{}.and_then(|text| {})", xml_text(source), coerce_text(*kind, false));
            if *guarded {
                expr
            } else {
                format!("{expr}.unwrap_or_default()")
            }
        }
        Read::Record { type_name, source, guarded, bind, fields, partial } => {
            let mut literal = format!("{type_name} {{\n");
            for (field, read) in fields.iter() {
                literal.push_str(&format!("    {}: {},\n", field.ident, indent(&read_expr(read))));
            }
            if *partial {
                literal.push_str("    ..Default::default()\n");
            }
            literal.push('}');
            if !*guarded {
                return literal;
            }
            match source {
                Source::Json(source) => format!(
                    "match {} {{\n    serde_json::Value::Null => None,\n    \
                     {bind} => Some({}),\n}}",
                    json_ref(source),
                    indent(&literal)
                ),
                Source::Xml(source) => {
                    let lookup = match &source.last {
                        XmlNode::Child(name) => {
                            format!("{}.child({})", xml_element(source), lit(name))
                        }
                        _ => format!("Some({})", xml_element(source)),
                    };
                    format!(
                        "match {lookup} {{\n    None => None,\n    Some({bind}) => Some({}),\n}}",
                        indent(&literal)
                    )
                }
            }
        }
        Read::Call { helper, source: Source::Json(source) } => {
            format!("{helper}({})", json_ref(source))
        }
        Read::Call { helper, source: Source::Xml(source) } => {
            let name = match &source.last {
                XmlNode::Children(name) | XmlNode::Child(name) => name.as_str(),
                _ => "member",
            };
            format!("{helper}({}.children({}))", xml_element(source), lit(name))
        }
        Read::Present(inner) => format!("Some({})", read_expr(inner)),
        Read::Header { name, kind } => {
            format!("response.header({}).and_then(|text| {})", lit(name), coerce_text(*kind, true))
        }
        Read::PrefixHeaders { prefix } => format!("response.headers_with_prefix({})", lit(prefix)),
        Read::StatusCode => "Some(response.status().into())".to_string(),
        Read::Body(BodyRead::Stream) => "Some(response.body().clone())".to_string(),
        Read::Body(BodyRead::Blob) => "Some(response.body().to_vec())".to_string(),
        Read::Body(BodyRead::Text) => {
            "Some(String::from_utf8_lossy(response.body()).into_owned())".to_string()
        }
    }
}

/// Sources of the helper functions a response plan calls, by name
pub(crate) fn helpers(plan: &ResponsePlan) -> BTreeMap<String, String> {
    plan.helpers.iter().map(|(name, helper)| (name.clone(), helper_source(helper))).collect()
}

fn helper_source(helper: &Helper) -> String {
    let Helper { name, output_type, body } = helper;
    let json = match body {
        HelperBody::List { item, .. } => read_source_is_json(item),
        HelperBody::Map { key, .. } => matches!(key, Source::Json(_)),
    };
    let mut w = Writer::default();
    if json {
        w.open(format!("fn {name}(json: &serde_json::Value) -> {output_type} {{"));
        w.line(format!("let mut items: {output_type} = Default::default();"));
        w.open("for item in json.as_array().into_iter().flatten() {");
    } else {
        w.open(format!(
            "fn {name}<'a>(elements: impl Iterator<Item = &'a {RUNTIME}::XmlElement>) \
             -> {output_type} {{"
        ));
        w.line(format!("let mut items: {output_type} = Default::default();"));
        w.open("for item in elements {");
    }
    match body {
        HelperBody::List { item, compact: true } => {
            lines(&mut w, &format!("if let Some(value) = {} {{", read_expr(item)));
            w.line("    items.push(value);");
            w.line("}");
        }
        HelperBody::List { item, compact: false } => {
            lines(&mut w, &format!("items.push({});", read_expr(item)));
        }
        HelperBody::Map { key, value, compact } => {
            let key = match key {
                Source::Json(source) => format!(
                    "match {} {{ serde_json::Value::String(s) => s.clone(), \
                     other => other.to_string() }}",
                    json_ref(source)
                ),
                Source::Xml(source) => {
                    format!("{}.unwrap_or_default().to_string()", xml_text(source))
                }
            };
            w.line(format!("let key = {key};"));
            if *compact {
                lines(&mut w, &format!("if let Some(value) = {} {{", read_expr(value)));
                w.line("    items.insert(key, value);");
                w.line("}");
            } else {
                lines(&mut w, &format!("items.insert(key, {});", read_expr(value)));
            }
        }
    }
    w.close("}");
    w.line("items");
    w.close("}");
    w.into_string()
}

/// true if the read pulls from a json document
fn read_source_is_json(read: &Read) -> bool {
    match read {
        Read::Scalar { source, .. } | Read::Record { source, .. } | Read::Call { source, .. } => {
            matches!(source, Source::Json(_))
        }
        Read::Present(inner) => read_source_is_json(inner),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Field;

    #[test]
    fn form_keys_format_counters() {
        let path = KeyPath::default()
            .name("Tags")
            .name("member")
            .push(Segment::Counter("index_1".into()))
            .name("Key");
        assert_eq!(form_key(&path), "format!(\"Tags.member.{}.Key\", index_1)");
        assert_eq!(form_key(&KeyPath::default().name("Name")), "\"Name\".to_string()");
    }

    #[test]
    fn booleans_are_string_literals() {
        let leaf = Leaf::Scalar { value: Access::binding("v_1", true), kind: ScalarKind::Boolean };
        assert_eq!(
            json_value(&leaf),
            "serde_json::Value::from(if *v_1 { \"true\" } else { \"false\" })"
        );
        assert_eq!(text(&leaf, false), "String::from(if *v_1 { \"true\" } else { \"false\" })");
    }

    #[test]
    fn header_timestamps_default_to_rfc822() {
        let at = Field { member: "At".into(), ident: "at".into() };
        let value = Access::binding("input", true).field(&at);
        let leaf = Leaf::Scalar { value, kind: ScalarKind::Timestamp(None) };
        assert_eq!(
            text(&leaf, true),
            "input.at.format(shapegen::runtime::RFC822_FORMAT).to_string()"
        );
        assert_eq!(
            text(&leaf, false),
            "input.at.to_rfc3339_opts(chrono::SecondsFormat::Secs, false)"
        );
    }

    #[test]
    fn guarded_json_scalar_is_one_expression() {
        let read = Read::Scalar {
            source: Source::Json(JsonSource::base("data").key("Name")),
            kind: ScalarKind::String,
            guarded: true,
        };
        assert_eq!(
            read_expr(&read),
            "match &data[\"Name\"] { serde_json::Value::Null => None, \
             value => value.as_str().map(str::to_owned) }"
        );
    }

    #[test]
    fn required_json_integer_is_range_checked_then_defaulted() {
        let read = Read::Scalar {
            source: Source::Json(JsonSource::base("data").key("Count")),
            kind: ScalarKind::Integer,
            guarded: false,
        };
        assert_eq!(
            read_expr(&read),
            "match &data[\"Count\"] { serde_json::Value::Null => None, \
             value => value.as_i64().and_then(|n| i32::try_from(n).ok()) }.unwrap_or_default()"
        );
    }
}
