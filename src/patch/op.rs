//! Patch operations and their JSON encoding.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_json::{Map, Number, Value};

use super::PatchDocument;
use crate::Error;

/// The expected value of a `test` operation.
///
/// `Any` is the presence sentinel: it matches any value at the path,
/// including `null`, and is encoded by omitting the `value` field. A literal
/// `Value(Value::Null)` only matches `null` and is encoded as `"value": null`.
#[derive(Debug, Clone, PartialEq)]
pub enum TestValue {
    /// Matches any present value.
    Any,
    /// Matches exactly this value.
    Value(Value),
}

impl TestValue {
    /// Returns `true` if `actual` satisfies this expectation.
    ///
    /// `actual` is `None` when the path is absent.
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        match self {
            TestValue::Any => actual.is_some(),
            TestValue::Value(expected) => actual == Some(expected),
        }
    }

    /// Returns the literal value, or `None` for the presence sentinel.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            TestValue::Any => None,
            TestValue::Value(value) => Some(value),
        }
    }
}

/// One operation of a [`PatchDocument`].
///
/// Paths are JSON pointers (`/address/city`, `/tags/0`, `/tags/-`). The root
/// of the document is addressed by either `""` or `"/"`.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// Adds or overwrites the value at `path`.
    Add {
        /// Target path.
        path: String,
        /// Value to add.
        value: Value,
    },
    /// Removes the value at `path`, which must exist.
    Remove {
        /// Target path.
        path: String,
    },
    /// Replaces the value at `path`, which must exist.
    Replace {
        /// Target path.
        path: String,
        /// Replacement value.
        value: Value,
    },
    /// Moves the value at `from` to `path`.
    Move {
        /// Source path.
        from: String,
        /// Target path.
        path: String,
    },
    /// Copies the value at `from` to `path`.
    Copy {
        /// Source path.
        from: String,
        /// Target path.
        path: String,
    },
    /// Increments the number at `path` by `amount` (1 when absent).
    Inc {
        /// Target path.
        path: String,
        /// Increment, possibly negative.
        amount: Option<Number>,
    },
    /// Sets `path` to `value` only if `path` is absent.
    Init {
        /// Target path.
        path: String,
        /// Initial value.
        value: Value,
    },
    /// Merges `value` into the value at `path` (JSON merge patch semantics).
    Merge {
        /// Target path.
        path: String,
        /// Merge patch.
        value: Value,
    },
    /// Asserts the value at `path`.
    Test {
        /// Target path.
        path: String,
        /// Expected value or presence sentinel.
        value: TestValue,
        /// Inverts the assertion.
        negate: bool,
    },
    /// Applies a nested document to the value at `path`.
    ///
    /// With `conditional` set, a failed `test` inside `ops` skips the nested
    /// document instead of failing the enclosing one.
    Patch {
        /// Target path; nested operation paths are relative to it.
        path: String,
        /// Nested operations.
        ops: PatchDocument,
        /// Whether test failures are scoped to this operation.
        conditional: bool,
    },
}

impl PatchOp {
    /// Returns the operation name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            PatchOp::Add { .. } => "add",
            PatchOp::Remove { .. } => "remove",
            PatchOp::Replace { .. } => "replace",
            PatchOp::Move { .. } => "move",
            PatchOp::Copy { .. } => "copy",
            PatchOp::Inc { .. } => "inc",
            PatchOp::Init { .. } => "init",
            PatchOp::Merge { .. } => "merge",
            PatchOp::Test { .. } => "test",
            PatchOp::Patch { .. } => "patch",
        }
    }

    /// Returns the target path.
    pub fn path(&self) -> &str {
        match self {
            PatchOp::Add { path, .. }
            | PatchOp::Remove { path }
            | PatchOp::Replace { path, .. }
            | PatchOp::Move { path, .. }
            | PatchOp::Copy { path, .. }
            | PatchOp::Inc { path, .. }
            | PatchOp::Init { path, .. }
            | PatchOp::Merge { path, .. }
            | PatchOp::Test { path, .. }
            | PatchOp::Patch { path, .. } => path,
        }
    }

    /// Returns `true` for `test` operations.
    pub fn is_test(&self) -> bool {
        matches!(self, PatchOp::Test { .. })
    }

    /// Encodes the operation as a JSON object.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("op".into(), Value::String(self.name().into()));
        match self {
            PatchOp::Move { from, path } | PatchOp::Copy { from, path } => {
                object.insert("from".into(), Value::String(from.clone()));
                object.insert("path".into(), Value::String(path.clone()));
            }
            PatchOp::Add { path, value }
            | PatchOp::Replace { path, value }
            | PatchOp::Init { path, value }
            | PatchOp::Merge { path, value } => {
                object.insert("path".into(), Value::String(path.clone()));
                object.insert("value".into(), value.clone());
            }
            PatchOp::Remove { path } => {
                object.insert("path".into(), Value::String(path.clone()));
            }
            PatchOp::Inc { path, amount } => {
                object.insert("path".into(), Value::String(path.clone()));
                if let Some(amount) = amount {
                    object.insert("value".into(), Value::Number(amount.clone()));
                }
            }
            PatchOp::Test {
                path,
                value,
                negate,
            } => {
                object.insert("path".into(), Value::String(path.clone()));
                if let TestValue::Value(value) = value {
                    object.insert("value".into(), value.clone());
                }
                if *negate {
                    object.insert("negate".into(), Value::Bool(true));
                }
            }
            PatchOp::Patch {
                path,
                ops,
                conditional,
            } => {
                object.insert("path".into(), Value::String(path.clone()));
                object.insert("value".into(), ops.to_json());
                if *conditional {
                    object.insert("conditional".into(), Value::Bool(true));
                }
            }
        }
        Value::Object(object)
    }

    /// Decodes an operation from its JSON encoding.
    ///
    /// A missing `value` on a `test` operation decodes to the presence
    /// sentinel [`TestValue::Any`]; an explicit `null` decodes to
    /// `TestValue::Value(Value::Null)`.
    pub fn from_json(value: &Value) -> Result<Self, Error> {
        let object = value
            .as_object()
            .ok_or_else(|| malformed("operation is not an object"))?;
        let name = object
            .get("op")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("missing \"op\""))?;
        let path = || string_field(object, "path");
        let required_value = || {
            object
                .get("value")
                .cloned()
                .ok_or_else(|| malformed(format!("\"{}\" requires \"value\"", name)))
        };

        let op = match name {
            "add" => PatchOp::Add {
                path: path()?,
                value: required_value()?,
            },
            "remove" => PatchOp::Remove { path: path()? },
            "replace" => PatchOp::Replace {
                path: path()?,
                value: required_value()?,
            },
            "move" => PatchOp::Move {
                from: string_field(object, "from")?,
                path: path()?,
            },
            "copy" => PatchOp::Copy {
                from: string_field(object, "from")?,
                path: path()?,
            },
            "inc" => PatchOp::Inc {
                path: path()?,
                amount: match object.get("value") {
                    None | Some(Value::Null) => None,
                    Some(Value::Number(number)) => Some(number.clone()),
                    Some(_) => return Err(malformed("\"inc\" value must be a number")),
                },
            },
            "init" => PatchOp::Init {
                path: path()?,
                value: required_value()?,
            },
            "merge" => PatchOp::Merge {
                path: path()?,
                value: required_value()?,
            },
            "test" => PatchOp::Test {
                path: path()?,
                value: match object.get("value") {
                    Some(value) => TestValue::Value(value.clone()),
                    None => TestValue::Any,
                },
                negate: bool_field(object, "negate")?,
            },
            "patch" => PatchOp::Patch {
                path: path()?,
                ops: PatchDocument::from_json(&required_value()?)?,
                conditional: bool_field(object, "conditional")?,
            },
            other => return Err(malformed(format!("unknown op {:?}", other))),
        };
        Ok(op)
    }
}

fn malformed(message: impl Into<String>) -> Error {
    Error::invalid_response(format!("malformed patch operation: {}", message.into()))
}

fn string_field(object: &Map<String, Value>, field: &str) -> Result<String, Error> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| malformed(format!("missing string field {:?}", field)))
}

fn bool_field(object: &Map<String, Value>, field: &str) -> Result<bool, Error> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(_) => Err(malformed(format!("{:?} must be a boolean", field))),
    }
}

impl Serialize for PatchOp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PatchOp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        PatchOp::from_json(&value).map_err(de::Error::custom)
    }
}
