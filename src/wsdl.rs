//! WSDL 1.1 service descriptions.
//!
//! Only what a call needs is extracted: operations with their message parts,
//! the binding's SOAP version and SOAPAction values, and the service address.
//! Schema types are not interpreted; part types are reported by local name.

use crate::parser::{local_part, parse_document, XmlNode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub const WSDL_NS: &str = "http://schemas.xmlsoap.org/wsdl/";
pub const WSDL_SOAP_11_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
pub const WSDL_SOAP_12_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";

/// SOAP versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SoapVersion {
    /// SOAP 1.1 (namespace: http://schemas.xmlsoap.org/soap/envelope/)
    #[serde(rename = "1.1")]
    #[default]
    Soap11,
    /// SOAP 1.2 (namespace: http://www.w3.org/2003/05/soap-envelope)
    #[serde(rename = "1.2")]
    Soap12,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WsdlError {
    #[error("SOAP-ERROR: Parsing WSDL: {0}")]
    Xml(String),

    #[error("SOAP-ERROR: Parsing WSDL: Couldn't find <definitions> in '{0}'")]
    NotWsdl(String),

    #[error("SOAP-ERROR: Parsing WSDL: Couldn't bind to service")]
    NoEndpoint,
}

/// A named message part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePart {
    pub name: String,
    /// Local name of the part's `type` or `element`
    pub type_name: String,
}

/// An operation advertised by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub name: String,
    pub inputs: Vec<MessagePart>,
    pub output: Option<MessagePart>,
    /// SOAPAction from the binding, if any
    pub soap_action: Option<String>,
}

impl Operation {
    /// Signature in the `"<ret> <name>(<type> $<part>, ...)"` form.
    pub fn signature(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ret = self
            .output
            .as_ref()
            .map(|p| p.type_name.as_str())
            .unwrap_or("void");
        let args = self
            .inputs
            .iter()
            .map(|p| format!("{} ${}", p.type_name, p.name))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} {}({})", ret, self.name, args)
    }
}

/// Parsed service description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescription {
    pub target_namespace: String,
    /// Address of the first SOAP port
    pub endpoint: String,
    pub soap_version: SoapVersion,
    pub operations: Vec<Operation>,
    /// Non-fatal problems found while reading the document
    pub warnings: Vec<String>,
}

impl ServiceDescription {
    /// Look up an operation by name, ignoring ASCII case.
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations
            .iter()
            .find(|op| op.name.eq_ignore_ascii_case(name))
    }

    pub fn signatures(&self) -> Vec<String> {
        self.operations.iter().map(Operation::signature).collect()
    }
}

/// Parse a WSDL 1.1 document.
pub fn parse_wsdl(xml: &str) -> Result<ServiceDescription, WsdlError> {
    let root = parse_document(xml).map_err(|e| WsdlError::Xml(e.to_string()))?;
    if root.name != "definitions" {
        return Err(WsdlError::NotWsdl(root.name));
    }

    let mut warnings = Vec::new();
    if root.namespace.as_deref() != Some(WSDL_NS) {
        warnings.push(format!(
            "definitions is not in the WSDL 1.1 namespace ({})",
            root.namespace.as_deref().unwrap_or("none")
        ));
    }
    let target_namespace = root.attr("targetNamespace").unwrap_or_default().to_string();
    if target_namespace.is_empty() {
        warnings.push("definitions has no targetNamespace".to_string());
    }

    let messages = collect_messages(&root);

    let mut operations: Vec<Operation> = Vec::new();
    for port_type in root.children_named("portType") {
        for op in port_type.children_named("operation") {
            let Some(name) = op.attr("name") else {
                warnings.push("portType operation without a name".to_string());
                continue;
            };
            if operations.iter().any(|o| o.name == name) {
                continue;
            }

            let inputs = message_parts(op, "input", &messages, &mut warnings);
            let output = message_parts(op, "output", &messages, &mut warnings)
                .into_iter()
                .next();

            operations.push(Operation {
                name: name.to_string(),
                inputs,
                output,
                soap_action: None,
            });
        }
    }

    let soap_version = read_bindings(&root, &mut operations, &mut warnings);

    if operations.is_empty() {
        warnings.push("service advertises no operations".to_string());
    }

    let endpoint = find_endpoint(&root).ok_or(WsdlError::NoEndpoint)?;

    Ok(ServiceDescription {
        target_namespace,
        endpoint,
        soap_version,
        operations,
        warnings,
    })
}

fn collect_messages(root: &XmlNode) -> HashMap<String, Vec<MessagePart>> {
    root.children_named("message")
        .filter_map(|message| {
            let name = message.attr("name")?;
            let parts = message
                .children_named("part")
                .map(|part| MessagePart {
                    name: part.attr("name").unwrap_or_default().to_string(),
                    type_name: part
                        .attr("type")
                        .or_else(|| part.attr("element"))
                        .map(local_part)
                        .unwrap_or("anyType")
                        .to_string(),
                })
                .collect();
            Some((name.to_string(), parts))
        })
        .collect()
}

fn message_parts(
    op: &XmlNode,
    direction: &str,
    messages: &HashMap<String, Vec<MessagePart>>,
    warnings: &mut Vec<String>,
) -> Vec<MessagePart> {
    let Some(reference) = op.child(direction).and_then(|d| d.attr("message")) else {
        return Vec::new();
    };

    match messages.get(local_part(reference)) {
        Some(parts) => parts.clone(),
        None => {
            warnings.push(format!("{} message '{}' is not defined", direction, reference));
            Vec::new()
        }
    }
}

/// Apply binding data to operations and return the SOAP version in use.
fn read_bindings(
    root: &XmlNode,
    operations: &mut [Operation],
    warnings: &mut Vec<String>,
) -> SoapVersion {
    let mut version = None;

    for binding in root.children_named("binding") {
        let Some(soap_binding) = binding.child("binding") else {
            continue;
        };
        let binding_version = match soap_binding.namespace.as_deref() {
            Some(WSDL_SOAP_11_NS) => SoapVersion::Soap11,
            Some(WSDL_SOAP_12_NS) => SoapVersion::Soap12,
            _ => continue,
        };

        if let Some(style) = soap_binding.attr("style") {
            if style != "rpc" && style != "document" {
                warnings.push(format!("unsupported binding style '{}'", style));
            }
        }

        // SOAP 1.1 wins when both bindings are present.
        if version.is_none() || binding_version == SoapVersion::Soap11 {
            version = Some(binding_version);
        }

        for bop in binding.children_named("operation") {
            let Some(name) = bop.attr("name") else {
                continue;
            };
            let action = bop
                .child("operation")
                .and_then(|o| o.attr("soapAction"))
                .filter(|a| !a.is_empty());

            match operations.iter_mut().find(|o| o.name == name) {
                Some(op) => {
                    if op.soap_action.is_none() || binding_version == SoapVersion::Soap11 {
                        op.soap_action = action.map(String::from);
                    }
                }
                None => warnings.push(format!(
                    "binding operation '{}' has no portType counterpart",
                    name
                )),
            }
        }
    }

    version.unwrap_or_default()
}

fn find_endpoint(root: &XmlNode) -> Option<String> {
    let mut fallback = None;
    for port in root
        .children_named("service")
        .flat_map(|service| service.children_named("port"))
    {
        for address in port.children_named("address") {
            let location = address.attr("location").filter(|l| !l.is_empty());
            match address.namespace.as_deref() {
                Some(WSDL_SOAP_11_NS) => return location.map(String::from),
                Some(WSDL_SOAP_12_NS) if fallback.is_none() => {
                    fallback = location.map(String::from)
                }
                _ => {}
            }
        }
    }
    fallback
}
