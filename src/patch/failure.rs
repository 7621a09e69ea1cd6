//! Structured report of a patch operation that failed to apply.

use std::fmt;

use serde_json::{Map, Value};

use super::PatchOp;
use crate::Error;

/// The operation that stopped a patch document from applying.
///
/// `op_index` always addresses the top-level document. When the failure
/// happened inside one or more nested `patch` operations, `nested_path` holds
/// the index of the failing operation at each nesting level, outermost first.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchFailure {
    op_index: usize,
    op: PatchOp,
    nested_path: Vec<usize>,
    actual: Option<Value>,
    info: String,
}

impl PatchFailure {
    pub(crate) fn new(
        op_index: usize,
        op: PatchOp,
        nested_path: Vec<usize>,
        actual: Option<Value>,
        info: impl Into<String>,
    ) -> Self {
        Self {
            op_index,
            op,
            nested_path,
            actual,
            info: info.into(),
        }
    }

    /// Returns the zero-based index of the failing top-level operation.
    pub fn op_index(&self) -> usize {
        self.op_index
    }

    /// Returns the failing top-level operation.
    pub fn op(&self) -> &PatchOp {
        &self.op
    }

    /// Returns the nesting path below the top-level operation.
    pub fn nested_path(&self) -> &[usize] {
        &self.nested_path
    }

    /// Returns the innermost failing operation.
    pub fn failing_op(&self) -> &PatchOp {
        let mut op = &self.op;
        for &index in &self.nested_path {
            match op {
                PatchOp::Patch { ops, .. } => match ops.get(index) {
                    Some(inner) => op = inner,
                    None => break,
                },
                _ => break,
            }
        }
        op
    }

    /// Returns `true` if the innermost failing operation is a `test`.
    pub fn is_assertion(&self) -> bool {
        self.failing_op().is_test()
    }

    /// Returns the value a failing `test` expected.
    ///
    /// `None` for non-test failures and for presence/absence assertions.
    pub fn expected(&self) -> Option<&Value> {
        match self.failing_op() {
            PatchOp::Test { value, .. } => value.as_value(),
            _ => None,
        }
    }

    /// Returns the value found at the failing path, `None` if it was absent
    /// or not reported.
    pub fn actual(&self) -> Option<&Value> {
        self.actual.as_ref()
    }

    /// Returns the human-readable reason.
    pub fn info(&self) -> &str {
        &self.info
    }

    /// Encodes the failure as an error `details` map.
    pub fn to_details(&self) -> Map<String, Value> {
        let mut details = Map::new();
        details.insert("opIndex".into(), Value::from(self.op_index));
        details.insert("op".into(), self.op.to_json());
        details.insert("info".into(), Value::String(self.info.clone()));
        if !self.nested_path.is_empty() {
            details.insert(
                "nestedPath".into(),
                Value::Array(self.nested_path.iter().map(|&i| Value::from(i)).collect()),
            );
        }
        if let Some(actual) = &self.actual {
            details.insert("actual".into(), actual.clone());
        }
        details
    }

    /// Decodes a failure from an error `details` map.
    ///
    /// `opIndex` and `op` are required; `nestedPath`, `actual` and `info` are
    /// optional.
    pub fn from_details(details: &Map<String, Value>) -> Result<Self, Error> {
        let op_index = details
            .get("opIndex")
            .and_then(Value::as_u64)
            .and_then(|index| usize::try_from(index).ok())
            .ok_or_else(|| Error::invalid_response("patch failure without a valid opIndex"))?;
        let op = details
            .get("op")
            .ok_or_else(|| Error::invalid_response("patch failure without an op"))
            .and_then(PatchOp::from_json)?;
        let nested_path = match details.get("nestedPath") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|index| usize::try_from(index).ok())
                        .ok_or_else(|| Error::invalid_response("invalid nestedPath entry"))
                })
                .collect::<Result<_, _>>()?,
            Some(_) => return Err(Error::invalid_response("nestedPath must be an array")),
        };

        Ok(Self {
            op_index,
            op,
            nested_path,
            actual: details.get("actual").cloned(),
            info: details
                .get("info")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
        })
    }
}

impl fmt::Display for PatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.failing_op();
        write!(f, "operation {}", self.op_index)?;
        for index in &self.nested_path {
            write!(f, ".{}", index)?;
        }
        write!(f, " ({} {})", op.name(), op.path())?;
        if !self.info.is_empty() {
            write!(f, ": {}", self.info)?;
        }
        Ok(())
    }
}
