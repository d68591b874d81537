//! The tool-selection contract: the model's whole completion must be one JSON
//! object with exactly the keys `tool` (a string) and `arguments` (an object
//! of scalar values).

use serde_json::{Map, Value};
use thiserror::Error;

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    pub arguments: Map<String, Value>,
}

/// Why a completion does not satisfy the tool-selection contract
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("the model returned an empty response")]
    Empty,

    #[error("the response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("the response is not a JSON object")]
    NotAnObject,

    #[error("the response is missing the `{0}` key")]
    MissingKey(&'static str),

    #[error("the response has unexpected keys: {}", .0.join(", "))]
    UnexpectedKeys(Vec<String>),

    #[error("`tool` must be a string")]
    ToolNotString,

    #[error("`arguments` must be an object")]
    ArgumentsNotObject,

    #[error("argument `{0}` must be a string, number or boolean")]
    NonScalarArgument(String),
}

const TOOL_KEY: &str = "tool";
const ARGUMENTS_KEY: &str = "arguments";

/// Parse a raw completion into a [`ToolCall`].
///
/// Surrounding whitespace is ignored. Anything else around the object, such as
/// prose, markdown fences or a second object, is a failure.
#[inline]
pub fn parse_tool_call(raw: &str) -> Result<ToolCall, ParseFailure> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ParseFailure::Empty);
    }

    let value: Value =
        serde_json::from_str(raw).map_err(|e| ParseFailure::InvalidJson(e.to_string()))?;
    let Value::Object(mut object) = value else {
        return Err(ParseFailure::NotAnObject);
    };

    let tool = object
        .remove(TOOL_KEY)
        .ok_or(ParseFailure::MissingKey(TOOL_KEY))?;
    let arguments = object
        .remove(ARGUMENTS_KEY)
        .ok_or(ParseFailure::MissingKey(ARGUMENTS_KEY))?;
    if !object.is_empty() {
        return Err(ParseFailure::UnexpectedKeys(object.keys().cloned().collect()));
    }

    let Value::String(tool) = tool else {
        return Err(ParseFailure::ToolNotString);
    };
    let Value::Object(arguments) = arguments else {
        return Err(ParseFailure::ArgumentsNotObject);
    };
    if let Some((name, _)) = arguments
        .iter()
        .find(|(_, v)| matches!(v, Value::Array(_) | Value::Object(_) | Value::Null))
    {
        return Err(ParseFailure::NonScalarArgument(name.clone()));
    }

    Ok(ToolCall { tool, arguments })
}
