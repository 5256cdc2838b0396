//! SOAP envelope encoding and decoding.
//!
//! Requests use RPC style: the Body holds one element named after the
//! operation, qualified with the service's target namespace, whose children are
//! the call parameters. Responses are decoded into JSON values without a
//! schema; `xsi:type` hints are honored for numbers and booleans.

use crate::client::Params;
use crate::error::SoapFault;
use crate::parser::{local_part, parse_document, xml_escape, XmlNode, SOAP_11_NS, SOAP_12_NS, XSI_NS};
use crate::wsdl::SoapVersion;
use serde_json::{Map, Number, Value};

impl SoapVersion {
    /// Envelope namespace URI.
    pub fn envelope_ns(&self) -> &'static str {
        match self {
            Self::Soap11 => SOAP_11_NS,
            Self::Soap12 => SOAP_12_NS,
        }
    }

    /// Content-Type for a request, carrying the action for SOAP 1.2.
    pub fn content_type(&self, soap_action: Option<&str>) -> String {
        match (self, soap_action) {
            (Self::Soap11, _) => "text/xml; charset=utf-8".to_string(),
            (Self::Soap12, Some(action)) => {
                format!("application/soap+xml; charset=utf-8; action=\"{}\"", action)
            }
            (Self::Soap12, None) => "application/soap+xml; charset=utf-8".to_string(),
        }
    }
}

/// Build the request envelope for `operation`.
pub fn build_request(
    version: SoapVersion,
    target_namespace: &str,
    operation: &str,
    params: &Params,
) -> Result<String, SoapFault> {
    if !is_xml_name(operation) {
        return Err(SoapFault::client(format!("Invalid operation name '{}'", operation)));
    }

    let mut body = String::new();
    for (name, value) in params {
        encode_value(&mut body, name, value)?;
    }

    Ok(format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="{}" xmlns:xsi="{}" xmlns:tns="{}">
  <soap:Body>
    <tns:{}>{}</tns:{}>
  </soap:Body>
</soap:Envelope>"#,
        version.envelope_ns(),
        XSI_NS,
        xml_escape(target_namespace),
        operation,
        body,
        operation
    ))
}

fn encode_value(out: &mut String, name: &str, value: &Value) -> Result<(), SoapFault> {
    if !is_xml_name(name) {
        return Err(SoapFault::client(format!("Invalid parameter name '{}'", name)));
    }

    match value {
        Value::Null => out.push_str(&format!("<{} xsi:nil=\"true\"/>", name)),
        Value::Bool(b) => out.push_str(&format!("<{0}>{1}</{0}>", name, b)),
        Value::Number(n) => out.push_str(&format!("<{0}>{1}</{0}>", name, n)),
        Value::String(s) => out.push_str(&format!("<{0}>{1}</{0}>", name, xml_escape(s))),
        Value::Array(items) => {
            for item in items {
                encode_value(out, name, item)?;
            }
        }
        Value::Object(fields) => {
            out.push_str(&format!("<{}>", name));
            for (child, v) in fields {
                encode_value(out, child, v)?;
            }
            out.push_str(&format!("</{}>", name));
        }
    }
    Ok(())
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Decode a response envelope into the call's result value.
///
/// A response wrapper with a single child yields that child's value, an empty
/// wrapper yields null, and anything else yields an object.
pub fn decode_response(xml: &str) -> Result<Value, SoapFault> {
    let root = parse_document(xml)
        .map_err(|e| SoapFault::client(format!("looks like we got no XML document: {}", e)))?;

    let version = match root.namespace.as_deref() {
        Some(SOAP_11_NS) if root.name == "Envelope" => SoapVersion::Soap11,
        Some(SOAP_12_NS) if root.name == "Envelope" => SoapVersion::Soap12,
        _ => {
            return Err(SoapFault::client(format!(
                "Response is not a SOAP envelope (root element '{}')",
                root.name
            )))
        }
    };

    let body = root
        .children
        .iter()
        .find(|c| c.is("Body", version.envelope_ns()))
        .ok_or_else(|| SoapFault::client("SOAP envelope has no Body"))?;

    let Some(first) = body.children.first() else {
        return Ok(Value::Null);
    };

    if first.is("Fault", version.envelope_ns()) {
        return Err(decode_fault(first));
    }

    Ok(match first.children.len() {
        0 if first.text.is_empty() => Value::Null,
        1 => decode_value(&first.children[0]),
        _ => decode_value(first),
    })
}

/// Whether `xml` carries a SOAP Fault; returns it when it does.
pub fn fault_in(xml: &str) -> Option<SoapFault> {
    decode_response(xml).err().filter(|f| f.code != "Client")
}

fn decode_fault(fault: &XmlNode) -> SoapFault {
    // SOAP 1.1: faultcode / faultstring
    if let Some(message) = fault.child("faultstring") {
        let code = fault
            .child("faultcode")
            .map(|c| c.text.trim().to_string())
            .unwrap_or_default();
        return SoapFault::new(code, message.text.trim());
    }

    // SOAP 1.2: Code/Value, Reason/Text
    let code = fault
        .child("Code")
        .and_then(|c| c.child("Value"))
        .map(|v| v.text.trim().to_string())
        .unwrap_or_default();
    let message = fault
        .child("Reason")
        .and_then(|r| r.child("Text"))
        .map(|t| t.text.trim().to_string())
        .unwrap_or_else(|| "Unknown SOAP fault".to_string());
    SoapFault::new(code, message)
}

fn decode_value(node: &XmlNode) -> Value {
    if matches!(node.attr("nil"), Some("true") | Some("1")) {
        return Value::Null;
    }

    if node.children.is_empty() {
        return decode_leaf(&node.text, node.attr("type").map(local_part));
    }

    let mut map = Map::new();
    for child in &node.children {
        let value = decode_value(child);
        match map.get_mut(&child.name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(child.name.clone(), value);
            }
        }
    }
    Value::Object(map)
}

fn decode_leaf(text: &str, xsi_type: Option<&str>) -> Value {
    let text = text.trim();
    let typed = match xsi_type {
        Some(
            "int" | "integer" | "long" | "short" | "byte" | "negativeInteger"
            | "nonPositiveInteger",
        ) => text.parse::<i64>().ok().map(Value::from),
        Some(
            "unsignedInt" | "unsignedLong" | "unsignedShort" | "unsignedByte"
            | "nonNegativeInteger" | "positiveInteger",
        ) => text.parse::<u64>().ok().map(Value::from),
        Some("float" | "double" | "decimal") => text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        Some("boolean") => match text {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    };
    typed.unwrap_or_else(|| Value::String(text.to_string()))
}
