// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Dynamically typed setting values

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Result, SettingsError};

/// A property or setting value.
///
/// `Invalid` is the unset state. Equality is by value: two values are equal
/// only when they have the same kind and the same contents.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    #[default]
    Invalid,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    StringList(Vec<String>),
}

/// Declared type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Bool,
    Int,
    Double,
    String,
    StringList,
}

impl Value {
    pub fn is_valid(&self) -> bool {
        !matches!(self, Value::Invalid)
    }

    /// Kind of the held value, `None` when unset
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Invalid => None,
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::Int(_) => Some(ValueKind::Int),
            Value::Double(_) => Some(ValueKind::Double),
            Value::String(_) => Some(ValueKind::String),
            Value::StringList(_) => Some(ValueKind::StringList),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`
    pub fn to_double(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            Value::StringList(list) => Some(list),
            _ => None,
        }
    }

    /// Replace an unset value with the empty value of a string-list property.
    ///
    /// Unset string lists do not survive a store round trip as "unset", so a
    /// string-list property always receives an empty list instead.
    pub fn normalized_for(self, kind: Option<ValueKind>) -> Value {
        match (kind, self) {
            (Some(ValueKind::StringList), Value::Invalid) => Value::StringList(Vec::new()),
            (_, value) => value,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Invalid => write!(f, "<unset>"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "{}", s),
            Value::StringList(list) => write!(f, "{}", list.join(",")),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::StringList(v)
    }
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::StringList => "string_list",
        }
    }

    /// Parse command-line text into a value of this kind.
    ///
    /// String lists are comma separated; an empty input is an empty list.
    pub fn parse_value(&self, input: &str) -> Result<Value> {
        let invalid = || SettingsError::InvalidValue {
            kind: self.name().to_string(),
            input: input.to_string(),
        };
        let trimmed = input.trim();

        match self {
            ValueKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            ValueKind::Int => trimmed.parse::<i64>().map(Value::Int).map_err(|_| invalid()),
            ValueKind::Double => {
                let d = trimmed.parse::<f64>().map_err(|_| invalid())?;
                if d.is_finite() {
                    Ok(Value::Double(d))
                } else {
                    Err(invalid())
                }
            }
            ValueKind::String => Ok(Value::String(input.to_string())),
            ValueKind::StringList => {
                if trimmed.is_empty() {
                    return Ok(Value::StringList(Vec::new()));
                }
                Ok(Value::StringList(
                    trimmed.split(',').map(|s| s.trim().to_string()).collect(),
                ))
            }
        }
    }

    /// Whether `value` may be stored in a property of this kind
    pub fn accepts(&self, value: &Value) -> bool {
        match value.kind() {
            Some(kind) => kind == *self,
            None => true,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
