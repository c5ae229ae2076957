//! Sample tools: `calculate` and `echo`.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{DomainFailure, McpError};
use crate::mcp::capability::{ToolCallResult, ToolDescriptor};

/// Arithmetic operations supported by `calculate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// `a + b`
    Add,
    /// `a - b`
    Subtract,
    /// `a * b`
    Multiply,
    /// `a / b`, rejecting a zero divisor.
    Divide,
}

impl Operation {
    /// Applies the operation.
    ///
    /// # Errors
    ///
    /// Returns `DivisionByZero` for a zero divisor, and a domain failure if
    /// the result overflows to a non-finite value.
    pub fn apply(self, a: f64, b: f64) -> Result<f64, DomainFailure> {
        let result = match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide if b == 0.0 => return Err(DomainFailure::DivisionByZero),
            Self::Divide => a / b,
        };

        if result.is_finite() {
            Ok(result)
        } else {
            Err(DomainFailure::Other(
                "Result is not a finite number".to_string(),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
struct CalculateArgs {
    operation: Operation,
    a: f64,
    b: f64,
}

#[derive(Debug, Deserialize)]
struct EchoArgs {
    message: String,
}

fn decode<T: serde::de::DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, McpError> {
    serde_json::from_value(arguments)
        .map_err(|e| McpError::invalid_params(&format!("Invalid arguments for '{tool}'"), &e))
}

/// Descriptor for `calculate`.
#[must_use]
pub fn calculate_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "calculate".to_string(),
        description: "Performs basic arithmetic calculations (add, subtract, multiply, divide)"
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "description": "The operation to perform",
                    "enum": ["add", "subtract", "multiply", "divide"]
                },
                "a": {
                    "type": "number",
                    "description": "First operand"
                },
                "b": {
                    "type": "number",
                    "description": "Second operand"
                }
            },
            "required": ["operation", "a", "b"]
        }),
    }
}

/// Runs `calculate`.
///
/// # Errors
///
/// `InvalidParams` for missing or mistyped arguments (including an unknown
/// operation), a domain failure for division by zero.
pub fn calculate(arguments: Value) -> Result<ToolCallResult, McpError> {
    let args: CalculateArgs = decode("calculate", arguments)?;
    let result = args.operation.apply(args.a, args.b)?;
    Ok(ToolCallResult::text(format!("Result: {result}")))
}

/// Descriptor for `echo`.
#[must_use]
pub fn echo_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "echo".to_string(),
        description: "Echoes back the provided message".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message to echo"
                }
            },
            "required": ["message"]
        }),
    }
}

/// Runs `echo`.
///
/// # Errors
///
/// `InvalidParams` if `message` is missing or not a string.
pub fn echo(arguments: Value) -> Result<ToolCallResult, McpError> {
    let args: EchoArgs = decode("echo", arguments)?;
    Ok(ToolCallResult::text(format!("Echo: {}", args.message)))
}
