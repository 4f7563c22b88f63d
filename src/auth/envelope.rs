//! YourMembership XML envelopes.
//!
//! Outbound calls are wrapped in a `<YourMembership>` document:
//!
//! ```xml
//! <?xml version="1.0"?>
//! <YourMembership>
//!     <Version>2.03</Version>
//!     <ApiKey>...</ApiKey>
//!     <CallID>...</CallID>
//!     <SessionID>...</SessionID>
//!     <Call Method="Auth.CreateToken">
//!         <RetUrl>...</RetUrl>
//!     </Call>
//! </YourMembership>
//! ```
//!
//! Responses carry an `ErrCode` at the top level and, on success, an element
//! named after the invoked method whose children are flattened into a map.

use std::collections::BTreeMap;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::{AuthError, Result};

/// Protocol version sent in every envelope.
pub const API_VERSION: &str = "2.03";

/// Length of the `CallID` the provider accepts.
pub const CALL_ID_LEN: usize = 23;

/// Key under which the invoked method name is stored in an [`ApiResponse`].
pub const CALL_METHOD_KEY: &str = "call_method";

/// Generate a fresh call id: the first 23 characters of a random UUIDv4.
pub fn generate_call_id() -> String {
    let mut id = Uuid::new_v4().to_string();
    id.truncate(CALL_ID_LEN);
    id
}

/// One outbound API call.
#[derive(Debug, Clone)]
pub struct RequestEnvelope<'a> {
    pub api_key: &'a str,
    pub call_id: String,
    pub session_id: Option<&'a str>,
    pub method: &'a str,
    pub args: &'a [(&'a str, &'a str)],
}

impl<'a> RequestEnvelope<'a> {
    /// Build an envelope with a freshly generated call id. An empty session id
    /// is treated as no session.
    pub fn new(
        api_key: &'a str,
        method: &'a str,
        session_id: Option<&'a str>,
        args: &'a [(&'a str, &'a str)],
    ) -> Self {
        Self {
            api_key,
            call_id: generate_call_id(),
            session_id: session_id.filter(|s| !s.is_empty()),
            method,
            args,
        }
    }

    /// Serialize to pretty-printed XML.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);

        write(&mut writer, Event::Decl(BytesDecl::new("1.0", None, None)))?;
        write(&mut writer, Event::Start(BytesStart::new("YourMembership")))?;
        text_element(&mut writer, "Version", API_VERSION)?;
        text_element(&mut writer, "ApiKey", self.api_key)?;
        text_element(&mut writer, "CallID", &self.call_id)?;
        if let Some(session_id) = self.session_id {
            text_element(&mut writer, "SessionID", session_id)?;
        }

        let call = BytesStart::new("Call").with_attributes([("Method", self.method)]);
        if self.args.is_empty() {
            write(&mut writer, Event::Empty(call))?;
        } else {
            write(&mut writer, Event::Start(call))?;
            for (key, value) in self.args {
                text_element(&mut writer, key, value)?;
            }
            write(&mut writer, Event::End(BytesEnd::new("Call")))?;
        }

        write(&mut writer, Event::End(BytesEnd::new("YourMembership")))?;

        let mut xml = String::from_utf8(writer.into_inner())
            .map_err(|e| AuthError::malformed(format!("request XML is not UTF-8: {}", e)))?;
        xml.push('\n');
        Ok(xml)
    }
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| AuthError::malformed(format!("failed to write request XML: {}", e)))
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    write(writer, Event::Start(BytesStart::new(name)))?;
    write(writer, Event::Text(BytesText::new(text)))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

/// Flattened success payload of one API call.
///
/// Holds the children of the method-named element (tag → text) plus a
/// `call_method` entry naming the invoked method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ApiResponse {
    fields: BTreeMap<String, String>,
}

impl ApiResponse {
    pub fn new(method: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(CALL_METHOD_KEY.to_string(), method.to_string());
        Self { fields }
    }

    /// Build a response from raw fields, e.g. in host-side fixtures.
    pub fn from_fields<K, V>(method: &str, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut response = Self::new(method);
        for (key, value) in fields {
            response.insert(key, value);
        }
        response
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Name of the method that produced this response.
    pub fn method(&self) -> &str {
        self.get(CALL_METHOD_KEY).unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Look up a field that must be present.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| AuthError::missing_field(key))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Top-level pieces of a response document.
#[derive(Debug, Default)]
struct RawResponse {
    err_code: Option<String>,
    err_desc: Option<String>,
    extended_error_info: Option<String>,
    payload: Option<BTreeMap<String, String>>,
}

/// Parse a response body for `method`.
///
/// Returns the flattened payload when `ErrCode` is 0, otherwise the error kind
/// the code maps to, carrying the provider's `ErrDesc`.
pub fn parse_response(body: &str, method: &str) -> Result<ApiResponse> {
    let raw = read_document(body, method)?;

    let code_text = raw
        .err_code
        .ok_or_else(|| AuthError::malformed("response has no ErrCode"))?;
    let code: i32 = code_text
        .trim()
        .parse()
        .map_err(|_| AuthError::malformed(format!("ErrCode '{}' is not an integer", code_text)))?;

    if code != 0 {
        let description = raw.err_desc.unwrap_or_default();
        warn!(
            method,
            code,
            description = %description,
            extended = raw.extended_error_info.as_deref().unwrap_or(""),
            "YourMembership call failed"
        );
        return Err(AuthError::from_provider(code, description));
    }

    let payload = raw.payload.ok_or_else(|| {
        AuthError::malformed(format!("success response has no <{}> element", method))
    })?;

    let mut response = ApiResponse::new(method);
    for (key, value) in payload {
        response.insert(key, value);
    }
    Ok(response)
}

/// Walk the document once, collecting the top-level fields and the first
/// method-named element's children.
///
/// Field text is kept verbatim. Only text before an element's first nested
/// child counts as its value.
fn read_document(body: &str, method: &str) -> Result<RawResponse> {
    let mut reader = Reader::from_str(body);

    let mut raw = RawResponse::default();
    // Element names from the root down to the current element.
    let mut stack: Vec<String> = Vec::new();
    // Whether the open depth-2 element is the first method element.
    let mut in_payload = false;
    let mut payload: BTreeMap<String, String> = BTreeMap::new();
    let mut text = String::new();
    // Set once the element whose text is being collected opens a nested child.
    let mut text_closed = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| AuthError::malformed(format!("invalid response XML: {}", e)))?;

        match event {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                match stack.len() {
                    1 => {
                        if name == method && raw.payload.is_none() {
                            in_payload = true;
                        }
                        text.clear();
                        text_closed = false;
                    }
                    2 if in_payload => {
                        text.clear();
                        text_closed = false;
                    }
                    0 => {}
                    _ => text_closed = true,
                }
                stack.push(name);
            }
            Event::Empty(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                match stack.len() {
                    1 if name == method && raw.payload.is_none() => {
                        raw.payload = Some(BTreeMap::new());
                    }
                    1 => record_top_level(&mut raw, &name, String::new()),
                    2 if in_payload => {
                        payload.insert(name, String::new());
                    }
                    0 => {}
                    _ => text_closed = true,
                }
            }
            Event::Text(t) => {
                if collecting(&stack, in_payload) && !text_closed {
                    let unescaped = t
                        .unescape()
                        .map_err(|e| AuthError::malformed(format!("invalid response text: {}", e)))?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(c) => {
                if collecting(&stack, in_payload) && !text_closed {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(_) => {
                let Some(name) = stack.pop() else {
                    return Err(AuthError::malformed("unbalanced response XML"));
                };
                match stack.len() {
                    1 if in_payload => {
                        raw.payload = Some(std::mem::take(&mut payload));
                        in_payload = false;
                        text.clear();
                    }
                    1 => record_top_level(&mut raw, &name, std::mem::take(&mut text)),
                    2 if in_payload => {
                        payload.insert(name, std::mem::take(&mut text));
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(raw)
}

/// Whether text at the current position belongs to a top-level element or a
/// payload child.
fn collecting(stack: &[String], in_payload: bool) -> bool {
    stack.len() == 2 || (stack.len() == 3 && in_payload)
}

fn record_top_level(raw: &mut RawResponse, name: &str, text: String) {
    let slot = match name {
        "ErrCode" => &mut raw.err_code,
        "ErrDesc" => &mut raw.err_desc,
        "ExtendedErrorInfo" => &mut raw.extended_error_info,
        _ => return,
    };
    if slot.is_none() {
        *slot = Some(text);
    }
}

// ============================================================================
// Tests
// ============================================================================
