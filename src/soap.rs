//! Blocking SOAP adapter for the Pingdom API.
//!
//! Requests are rpc/encoded envelopes with positional `param{n}` parts.
//! Responses are decoded into a `serde_json::Value` tree and normalized into
//! a single [`RpcResponse`], including the logout response, which nests its
//! status inside a struct instead of returning it as a separate part.

use std::time::Duration;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::errors::{PingdomError, Result};
use crate::transport::{RpcResponse, RpcTransport, RpcValue};

pub const DEFAULT_ENDPOINT: &str = "https://ws.pingdom.com/soap/PingdomAPI.php";
pub const DEFAULT_NAMESPACE: &str = "urn:PingdomAPI";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const ITEM: &str = "item";

/// Where and how to reach the SOAP endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapConfig {
    /// URL the envelopes are POSTed to.
    pub endpoint: String,
    /// Namespace of the RPC method elements and of the `SOAPAction` header.
    pub namespace: String,
    /// Timeout applied to each request as a whole.
    pub timeout: Duration,
}

impl Default for SoapConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// [`RpcTransport`] speaking SOAP over HTTP.
#[derive(Debug)]
pub struct SoapTransport {
    http: HttpClient,
    config: SoapConfig,
}

impl SoapTransport {
    pub fn new(config: SoapConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| PingdomError::RequestFailed(err.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &SoapConfig {
        &self.config
    }
}

impl RpcTransport for SoapTransport {
    fn call(&mut self, method: &str, args: &[RpcValue]) -> Result<RpcResponse> {
        let envelope = encode_envelope(&self.config.namespace, method, args);

        let response = self
            .http
            .post(&self.config.endpoint)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{}#{}\"", self.config.namespace, method))
            .body(envelope)
            .send()
            .map_err(|err| PingdomError::RequestFailed(err.to_string()))?;

        let status = response.status();
        debug!(method, %status, "SOAP response received");

        // Faults are delivered with a 500 and decoded from the body.
        if !status.is_success() && status != reqwest::StatusCode::INTERNAL_SERVER_ERROR {
            return Err(PingdomError::RequestFailed(format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .map_err(|err| PingdomError::FailedToDecode(err.to_string()))?;

        decode_response(&body)
    }
}

/// Builds the request envelope for `method` with positional `args`.
pub(crate) fn encode_envelope(namespace: &str, method: &str, args: &[RpcValue]) -> String {
    let mut parts = String::new();
    for (index, arg) in args.iter().enumerate() {
        encode_value(&mut parts, &format!("param{}", index), arg);
    }

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<SOAP-ENV:Envelope"#,
            r#" xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/""#,
            r#" xmlns:SOAP-ENC="http://schemas.xmlsoap.org/soap/encoding/""#,
            r#" xmlns:xsd="http://www.w3.org/2001/XMLSchema""#,
            r#" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#,
            r#" SOAP-ENV:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">"#,
            r#"<SOAP-ENV:Body><ns1:{method} xmlns:ns1="{namespace}">{parts}</ns1:{method}></SOAP-ENV:Body>"#,
            r#"</SOAP-ENV:Envelope>"#
        ),
        method = method,
        namespace = escape(namespace),
        parts = parts,
    )
}

fn encode_value(out: &mut String, name: &str, value: &RpcValue) {
    match value {
        RpcValue::String(text) => encode_scalar(out, name, "xsd:string", &escape(text.as_str())),
        RpcValue::Int(number) => encode_scalar(out, name, "xsd:int", &number.to_string()),
        RpcValue::Bool(flag) => {
            encode_scalar(out, name, "xsd:boolean", if *flag { "true" } else { "false" })
        }
        RpcValue::DateTime(datetime) => encode_scalar(
            out,
            name,
            "xsd:dateTime",
            &datetime.format("%Y-%m-%dT%H:%M:%S").to_string(),
        ),
        RpcValue::Struct(members) => {
            out.push_str(&format!("<{}>", name));
            for (member, value) in members {
                encode_value(out, member, value);
            }
            out.push_str(&format!("</{}>", name));
        }
    }
}

fn encode_scalar(out: &mut String, name: &str, kind: &str, text: &str) {
    out.push_str(&format!(r#"<{name} xsi:type="{kind}">{text}</{name}>"#));
}

/// Decodes a response envelope into the uniform `(status, payload)` shape.
pub(crate) fn decode_response(xml: &[u8]) -> Result<RpcResponse> {
    let envelope = parse_document(xml)?;

    let body = envelope
        .get("Body")
        .and_then(Value::as_object)
        .ok_or_else(|| decode_error("missing SOAP body"))?;

    if let Some(fault) = body.get("Fault") {
        let field = |name: &str| {
            fault
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        return Err(PingdomError::Fault {
            code: field("faultcode"),
            message: field("faultstring"),
        });
    }

    let response = body
        .values()
        .next()
        .cloned()
        .ok_or_else(|| decode_error("empty SOAP body"))?;

    normalize(response)
}

fn normalize(response: Value) -> Result<RpcResponse> {
    let mut parts = match response {
        Value::Object(parts) => parts,
        _ => return Err(decode_error("response carries no parts")),
    };

    // Some calls wrap every part in a single `return` struct.
    if parts.len() == 1 && parts.get("return").map_or(false, Value::is_object) {
        if let Some(Value::Object(inner)) = parts.remove("return") {
            parts = inner;
        }
    }

    let status = parts
        .remove("status")
        .ok_or_else(|| decode_error("response carries no status"))?;
    let status = status
        .as_i64()
        .or_else(|| status.as_str().and_then(|s| s.trim().parse().ok()))
        .and_then(|code| i32::try_from(code).ok())
        .ok_or_else(|| decode_error(format!("status {} is not an integer", status)))?;

    let payload = match parts.len() {
        0 => Value::Null,
        1 => parts.into_iter().next().map(|(_, v)| v).unwrap_or(Value::Null),
        _ => Value::Object(parts),
    };

    Ok(RpcResponse::new(status, payload))
}

/// An element being assembled while its children are read.
struct Node {
    name: String,
    kind: Option<String>,
    nil: bool,
    array: bool,
    text: String,
    children: Vec<(String, Value)>,
}

impl Node {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let name = std::str::from_utf8(start.local_name().as_ref())
            .map_err(decode_error)?
            .to_string();

        let mut node = Node {
            name,
            kind: None,
            nil: false,
            array: false,
            text: String::new(),
            children: Vec::new(),
        };

        for attr in start.attributes() {
            let attr = attr.map_err(decode_error)?;
            let value = attr.unescape_value().map_err(decode_error)?;
            match attr.key.local_name().as_ref() {
                b"type" => {
                    let kind = value.rsplit(':').next().unwrap_or_default();
                    node.array |= kind.ends_with("Array");
                    node.kind = Some(kind.to_string());
                }
                b"nil" => node.nil = value == "true" || value == "1",
                b"arrayType" => node.array = true,
                _ => {}
            }
        }

        Ok(node)
    }

    fn close(self) -> (String, Value) {
        let value = if self.nil {
            Value::Null
        } else if self.array {
            Value::Array(self.children.into_iter().map(|(_, v)| v).collect())
        } else if !self.children.is_empty() {
            members(self.children)
        } else if self.kind.is_none() && self.text.trim().is_empty() {
            // Indentation inside an untyped empty element.
            Value::String(String::new())
        } else {
            scalar(self.kind.as_deref(), self.text)
        };

        (self.name, value)
    }
}

fn members(children: Vec<(String, Value)>) -> Value {
    let mut grouped: Vec<(String, Vec<Value>)> = Vec::new();
    for (name, value) in children {
        match grouped.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, values)) => values.push(value),
            None => grouped.push((name, vec![value])),
        }
    }

    let mut map = Map::new();
    for (name, mut values) in grouped {
        let value = if name == ITEM || values.len() > 1 {
            Value::Array(values)
        } else {
            values.pop().unwrap_or(Value::Null)
        };
        map.insert(name, value);
    }

    Value::Object(map)
}

fn scalar(kind: Option<&str>, text: String) -> Value {
    match kind {
        Some("int" | "integer" | "long" | "short" | "byte" | "unsignedInt" | "unsignedLong") => text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::String(text)),
        Some("float" | "double" | "decimal") => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::String(text)),
        Some("boolean") => {
            let flag = match text.trim() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            };
            flag.map(Value::Bool).unwrap_or(Value::String(text))
        }
        _ => Value::String(text),
    }
}

fn parse_document(xml: &[u8]) -> Result<Value> {
    // Text is kept verbatim. Whitespace between elements lands on nodes with
    // children and is discarded when they close.
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut stack: Vec<Node> = Vec::new();

    loop {
        let finished = match reader.read_event_into(&mut buf).map_err(decode_error)? {
            Event::Start(start) => {
                stack.push(Node::open(&start)?);
                None
            }
            Event::Empty(start) => attach(&mut stack, Node::open(&start)?),
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| decode_error("unbalanced closing tag"))?;
                attach(&mut stack, node)
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(decode_error)?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
                None
            }
            Event::CData(data) => {
                let bytes = data.into_inner();
                let text = std::str::from_utf8(&bytes).map_err(decode_error)?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(text);
                }
                None
            }
            Event::Eof => return Err(decode_error("unexpected end of document")),
            _ => None,
        };
        buf.clear();

        if let Some(root) = finished {
            return Ok(root);
        }
    }
}

/// Hands a closed element to its parent, or returns it once the root closes.
fn attach(stack: &mut Vec<Node>, node: Node) -> Option<Value> {
    let (name, value) = node.close();
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push((name, value));
            None
        }
        None => Some(value),
    }
}

fn decode_error(err: impl ToString) -> PingdomError {
    PingdomError::FailedToDecode(err.to_string())
}
