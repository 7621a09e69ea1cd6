//! Patch algebra: ordered partial-update documents.
//!
//! A [`PatchDocument`] is an ordered list of [`PatchOp`]s. Documents are plain
//! values with no network dependency. They are built with [`PatchBuilder`],
//! encoded into request bodies, evaluated locally with
//! [`PatchDocument::apply`], and decoded back out of `patch_conflict` error
//! details as a [`PatchFailure`].
//!
//! ## Failure scope
//!
//! Operations apply strictly in order. A failing operation aborts the whole
//! document and nothing is changed, with one exception: a failing `test`
//! inside a conditional nested `patch` skips only that nested document, whose
//! own changes are rolled back, and the enclosing document carries on.
//!
//! ```rust
//! use docstore::PatchDocument;
//! use serde_json::json;
//!
//! let patch = PatchDocument::builder()
//!     .inc("/a")
//!     .patch_if(
//!         "/",
//!         PatchDocument::builder().inc("/b").test("/a", 100).inc("/c"),
//!     )
//!     .inc("/d")
//!     .build();
//!
//! let mut doc = json!({"a": 0, "b": 0, "c": 0, "d": 0});
//! patch.apply(&mut doc).unwrap();
//! assert_eq!(doc, json!({"a": 1, "b": 0, "c": 0, "d": 1}));
//! ```

mod apply;
mod builder;
mod failure;
mod op;

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_json::Value;

pub use builder::PatchBuilder;
pub use failure::PatchFailure;
pub use op::{PatchOp, TestValue};

use crate::Error;

/// An immutable, ordered sequence of patch operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchDocument {
    ops: Vec<PatchOp>,
}

impl PatchDocument {
    /// Starts a new builder.
    pub fn builder() -> PatchBuilder {
        PatchBuilder::new()
    }

    pub(crate) fn from_ops(ops: Vec<PatchOp>) -> Self {
        Self { ops }
    }

    /// Returns the operations in application order.
    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    /// Returns the operation at `index`.
    pub fn get(&self, index: usize) -> Option<&PatchOp> {
        self.ops.get(index)
    }

    /// Returns the number of top-level operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if the document has no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Iterates over the operations in order.
    pub fn iter(&self) -> std::slice::Iter<'_, PatchOp> {
        self.ops.iter()
    }

    /// Encodes the document as a JSON array.
    pub fn to_json(&self) -> Value {
        Value::Array(self.ops.iter().map(PatchOp::to_json).collect())
    }

    /// Encodes the document as a request body.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.to_json().to_string())
    }

    /// Decodes a document from its JSON array encoding.
    pub fn from_json(value: &Value) -> Result<Self, Error> {
        let items = value
            .as_array()
            .ok_or_else(|| Error::invalid_response("patch document is not an array"))?;
        let ops = items
            .iter()
            .map(PatchOp::from_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { ops })
    }

    /// Decodes a document from body bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_json(&value)
    }
}

impl<'a> IntoIterator for &'a PatchDocument {
    type Item = &'a PatchOp;
    type IntoIter = std::slice::Iter<'a, PatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

impl FromIterator<PatchOp> for PatchDocument {
    fn from_iter<I: IntoIterator<Item = PatchOp>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

impl Serialize for PatchDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PatchDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        PatchDocument::from_json(&value).map_err(de::Error::custom)
    }
}
