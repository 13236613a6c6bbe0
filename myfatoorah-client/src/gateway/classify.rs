//! Response classification.
//!
//! The gateway reports failures in several shapes: an HTML page from a proxy or
//! firewall, a `ValidationErrors` / `FieldsErrors` list, `Data.ErrorMessage`, a
//! top-level `Message`, or a body that is not JSON at all. [`classify`] turns a raw
//! body into a [`GatewayResponse`] carrying either the data or exactly one
//! [`ApiError`].
//!
//! The checks run in a fixed order and the first match wins:
//!
//! 1. `IsSuccess` is truthy: success.
//! 2. The body contains HTML tags (and is not the Apple Pay domain association
//!    file): [`ApiError::Html`] with the visible text.
//! 3. JSON error fields, in the order listed above.
//! 4. No JSON, or falsy JSON: [`ApiError::Body`] with the raw body.
//! 5. A bare JSON string: [`ApiError::Body`] with that string.
//! 6. Anything else is a success.
//!
//! The HTTP status code plays no part in the decision.

use serde_json::Value;

use crate::error::{ApiError, GatewayError, Result};

/// Message used when the gateway answers with an empty body.
pub const EMPTY_BODY_MESSAGE: &str =
    "Kindly review your MyFatoorah admin configuration due to a wrong entry.";

/// Marker of the Apple Pay domain association file, which legitimately contains tags.
const APPLE_DOMAIN_MARKER: &str = "apple-developer-merchantid-domain-association";

/// Outcome of one gateway call.
///
/// Built only by [`classify`]; a response is either a success or carries exactly
/// one [`ApiError`], never both.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    data: Option<Value>,
    raw_body: String,
    error: Option<ApiError>,
}

impl GatewayResponse {
    fn success(data: Option<Value>, raw_body: &str) -> Self {
        Self { data, raw_body: raw_body.to_owned(), error: None }
    }

    fn failure(error: ApiError, data: Option<Value>, raw_body: &str) -> Self {
        Self { data, raw_body: raw_body.to_owned(), error: Some(error) }
    }

    /// Returns `true` if the call succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the parsed response JSON, if the body was JSON.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Returns the raw response body.
    #[must_use]
    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }

    /// Returns the classified error, if the call failed.
    #[must_use]
    pub const fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    /// Converts the response into the parsed JSON or the classified error.
    ///
    /// A success without JSON data yields [`Value::Null`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Api`] if the response was classified as a failure.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(error) => Err(GatewayError::Api(error)),
            None => Ok(self.data.unwrap_or(Value::Null)),
        }
    }
}

/// Parses `raw_body` as JSON and classifies it.
///
/// # Examples
///
/// ```
/// use myfatoorah_client::{error::ApiError, gateway::classify_body};
///
/// let response = classify_body(r#"{"IsSuccess":false,"Message":"Invalid data"}"#);
/// assert_eq!(response.error(), Some(&ApiError::Message("Invalid data".to_owned())));
///
/// let response = classify_body(r#"{"IsSuccess":true,"Data":{"InvoiceId":42}}"#);
/// assert!(response.is_success());
/// ```
#[must_use]
pub fn classify_body(raw_body: &str) -> GatewayResponse {
    let parsed = serde_json::from_str::<Value>(raw_body).ok();
    classify(raw_body, parsed.as_ref())
}

/// Classifies a gateway response body.
///
/// `parsed` is the JSON form of `raw_body`, or `None` when the body is not JSON.
#[must_use]
pub fn classify(raw_body: &str, parsed: Option<&Value>) -> GatewayResponse {
    if let Some(flag) = parsed.and_then(|json| json.get("IsSuccess"))
        && is_truthy(flag)
    {
        return GatewayResponse::success(parsed.cloned(), raw_body);
    }

    let stripped = strip_tags(raw_body);
    if stripped != raw_body && !stripped.to_ascii_lowercase().contains(APPLE_DOMAIN_MARKER) {
        let text = stripped.split_ascii_whitespace().collect::<Vec<_>>().join(" ");
        return GatewayResponse::failure(ApiError::Html(text), parsed.cloned(), raw_body);
    }

    if let Some(error) = parsed.and_then(json_error) {
        return GatewayResponse::failure(error, parsed.cloned(), raw_body);
    }

    match parsed {
        Some(json) if is_truthy(json) => match json {
            Value::String(message) => GatewayResponse::failure(
                ApiError::Body(message.clone()),
                parsed.cloned(),
                raw_body,
            ),
            _ => GatewayResponse::success(parsed.cloned(), raw_body),
        },
        _ => {
            let message =
                if raw_body.is_empty() { EMPTY_BODY_MESSAGE.to_owned() } else { raw_body.to_owned() };
            GatewayResponse::failure(ApiError::Body(message), parsed.cloned(), raw_body)
        }
    }
}

/// Extracts an error from the JSON error fields.
///
/// The first present field decides. A present field that yields an empty message
/// produces no error and the later fields are not consulted. Field-error lists
/// count as present only when they are arrays.
fn json_error(json: &Value) -> Option<ApiError> {
    let field_errors = json
        .get("ValidationErrors")
        .filter(|v| v.is_array())
        .or_else(|| json.get("FieldsErrors").filter(|v| v.is_array()));

    if let Some(errors) = field_errors {
        let pairs = collect_field_errors(errors);
        return (!pairs.is_empty()).then_some(ApiError::Validation(pairs));
    }

    if let Some(message) = json.pointer("/Data/ErrorMessage").and_then(scalar_text) {
        return (!message.is_empty()).then_some(ApiError::Data(message));
    }

    if let Some(message) = json.get("Message").and_then(scalar_text) {
        return (!message.is_empty()).then_some(ApiError::Message(message));
    }

    None
}

/// Builds ordered `(name, error)` pairs keyed by `Name`.
///
/// Entries without an `Error` field are skipped. A repeated name keeps its first
/// position and takes the later error; entries without a name get the next free
/// numeric key.
fn collect_field_errors(errors: &Value) -> Vec<(String, String)> {
    let Some(entries) = errors.as_array() else {
        return Vec::new();
    };

    let mut pairs: Vec<(String, String)> = Vec::with_capacity(entries.len());
    let mut next_index: u64 = 0;

    for entry in entries {
        let Some(error) = entry.get("Error") else {
            continue;
        };
        let error = scalar_text(error).unwrap_or_default();

        let name = match entry.get("Name").and_then(scalar_text) {
            Some(name) => name,
            None => {
                let key = next_index.to_string();
                next_index += 1;
                key
            }
        };
        if let Ok(index) = name.parse::<u64>()
            && index.to_string() == name
        {
            next_index = next_index.max(index + 1);
        }

        match pairs.iter_mut().find(|(existing, _)| *existing == name) {
            Some(pair) => pair.1 = error,
            None => pairs.push((name, error)),
        }
    }

    pairs
}

/// Renders a JSON scalar as text. `null` is `None`; `false` is empty, `true` is `1`.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(true) => Some("1".to_owned()),
        Value::Bool(false) => Some(String::new()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Loose truthiness of a JSON value.
///
/// `null`, `false`, `0`, `""`, `"0"` and `[]` are falsy. Objects are always truthy.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Removes HTML tags and comments from `input`.
///
/// A `<` followed by whitespace or the end of input is kept as text. Quoted
/// attribute values may contain `>`. An unterminated tag swallows the rest.
fn strip_tags(input: &str) -> String {
    #[derive(Clone, Copy)]
    enum State {
        Text,
        Tag(Option<char>),
        Comment,
    }

    let mut out = String::with_capacity(input.len());
    let mut state = State::Text;
    let mut chars = input.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        state = match state {
            State::Text if c == '<' => match chars.peek() {
                Some((_, next)) if !next.is_whitespace() => {
                    if input[i..].starts_with("<!--") {
                        chars.nth(2);
                        State::Comment
                    } else {
                        State::Tag(None)
                    }
                }
                _ => {
                    out.push(c);
                    State::Text
                }
            },
            State::Text => {
                out.push(c);
                State::Text
            }
            State::Tag(None) if c == '>' => State::Text,
            State::Tag(None) if c == '"' || c == '\'' => State::Tag(Some(c)),
            State::Tag(Some(quote)) if c == quote => State::Tag(None),
            State::Tag(quote) => State::Tag(quote),
            State::Comment if c == '-' && input[i..].starts_with("-->") => {
                chars.nth(1);
                State::Text
            }
            State::Comment => State::Comment,
        };
    }

    out
}
