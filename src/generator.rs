use std::collections::BTreeMap;

use shapegen_model::{NamingRegistry, Operation, Protocol, Role, ShapeModel};
use tracing::{debug, instrument};

use crate::{
    decode_json, decode_xml, encode_json, encode_query, encode_xml,
    error::{Error, Result},
    fragment::{Generated, RequestPlan, ResponsePlan},
    render,
    walk::Walker,
};

/// Selects the serializer and parser for an operation's protocol and
/// renders what they produce
pub struct Generator<'m> {
    model: &'m ShapeModel,
    registry: &'m dyn NamingRegistry,
    /// protocol used for every operation instead of its own
    protocol: Option<Protocol>,
}

impl<'m> Generator<'m> {
    pub fn new(model: &'m ShapeModel, registry: &'m dyn NamingRegistry) -> Self {
        Generator { model, registry, protocol: None }
    }

    pub fn with_protocol(mut self, protocol: Option<Protocol>) -> Self {
        self.protocol = protocol;
        self
    }

    fn effective<'o>(&self, op: &'o Operation) -> std::borrow::Cow<'o, Operation> {
        match self.protocol {
            Some(protocol) if protocol != op.protocol => {
                let mut op = op.clone();
                op.protocol = protocol;
                std::borrow::Cow::Owned(op)
            }
            _ => std::borrow::Cow::Borrowed(op),
        }
    }

    /// Serializer for the operation input
    #[instrument(level = "debug", skip_all, fields(operation = %op.name))]
    pub fn request(&self, op: &Operation) -> Result<Generated<RequestPlan>> {
        let op = self.effective(op);
        let mut walker = Walker::new(self.model, self.registry, Role::Input);
        let plan = match op.protocol {
            Protocol::Query => encode_query::request_plan(&mut walker, &op),
            Protocol::Json | Protocol::RestJson => encode_json::request_plan(&mut walker, &op),
            Protocol::RestXml => encode_xml::request_plan(&mut walker, &op),
            other => Err(Error::UnsupportedProtocol(other)),
        }
        .map_err(|e| e.in_operation(&op.name, op.protocol))?;
        debug!(protocol = %op.protocol, ops = plan.ops.len(), "request plan built");
        Ok(Generated {
            signature: render::request_signature(&plan),
            body: render::request_body(&plan),
            used_types: walker.used_types(),
            helpers: BTreeMap::new(),
            plan,
        })
    }

    /// Parser for the operation output
    #[instrument(level = "debug", skip_all, fields(operation = %op.name))]
    pub fn response(&self, op: &Operation) -> Result<Generated<ResponsePlan>> {
        let op = self.effective(op);
        let mut walker = Walker::new(self.model, self.registry, Role::Output);
        let plan = match op.protocol {
            Protocol::Query | Protocol::RestXml => decode_xml::response_plan(&mut walker, &op),
            Protocol::Json | Protocol::RestJson => decode_json::response_plan(&mut walker, &op),
            other => Err(Error::UnsupportedProtocol(other)),
        }
        .map_err(|e| e.in_operation(&op.name, op.protocol))?;
        debug!(protocol = %op.protocol, helpers = plan.helpers.len(), "response plan built");
        Ok(Generated {
            signature: render::response_signature(&plan),
            body: render::response_body(&plan),
            used_types: walker.used_types(),
            helpers: render::helpers(&plan),
            plan,
        })
    }

    /// Serializer and parser source for one operation, as a module file
    pub fn operation_source(&self, op: &Operation) -> Result<String> {
        let request = self.request(op)?;
        let response = self.response(op)?;
        let mut source = format!("// {} ({}) marshalling", op.name, self.effective(op).protocol);
        if let Some(service) = self.model.metadata().service_name() {
            source.push_str(&format!(" for {service}"));
        }
        source.push_str(", generated by shapegen. Do not edit.\n\n");
        source.push_str(&request.to_source());
        source.push('\n');
        source.push_str(&response.to_source());
        Ok(source)
    }
}
