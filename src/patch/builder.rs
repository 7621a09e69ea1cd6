//! Fluent construction of patch documents.

use serde_json::{Number, Value};

use super::{PatchDocument, PatchOp, TestValue};

/// Accumulates operations in call order and produces an immutable
/// [`PatchDocument`].
///
/// ```rust
/// use docstore::PatchDocument;
///
/// let patch = PatchDocument::builder()
///     .test_field_present("/email")
///     .replace("/name", "Alice")
///     .inc_by("/visits", 2)
///     .patch_if(
///         "/",
///         PatchDocument::builder()
///             .test("/plan", "trial")
///             .add("/trialEnded", true),
///     )
///     .build();
///
/// assert_eq!(patch.len(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PatchBuilder {
    ops: Vec<PatchOp>,
}

impl PatchBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a prebuilt operation.
    #[must_use]
    pub fn push(mut self, op: PatchOp) -> Self {
        self.ops.push(op);
        self
    }

    /// Appends `add`.
    #[must_use]
    pub fn add(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(PatchOp::Add {
            path: path.into(),
            value: value.into(),
        })
    }

    /// Appends `remove`.
    #[must_use]
    pub fn remove(self, path: impl Into<String>) -> Self {
        self.push(PatchOp::Remove { path: path.into() })
    }

    /// Appends `replace`.
    #[must_use]
    pub fn replace(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(PatchOp::Replace {
            path: path.into(),
            value: value.into(),
        })
    }

    /// Appends `move`.
    #[must_use]
    pub fn move_path(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.push(PatchOp::Move {
            from: from.into(),
            path: to.into(),
        })
    }

    /// Appends `copy`.
    #[must_use]
    pub fn copy_path(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.push(PatchOp::Copy {
            from: from.into(),
            path: to.into(),
        })
    }

    /// Appends `inc` with the default amount of 1.
    #[must_use]
    pub fn inc(self, path: impl Into<String>) -> Self {
        self.push(PatchOp::Inc {
            path: path.into(),
            amount: None,
        })
    }

    /// Appends `inc` with an explicit amount.
    #[must_use]
    pub fn inc_by(self, path: impl Into<String>, amount: impl Into<Number>) -> Self {
        self.push(PatchOp::Inc {
            path: path.into(),
            amount: Some(amount.into()),
        })
    }

    /// Appends `init`.
    #[must_use]
    pub fn init(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(PatchOp::Init {
            path: path.into(),
            value: value.into(),
        })
    }

    /// Appends `merge`.
    #[must_use]
    pub fn merge(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(PatchOp::Merge {
            path: path.into(),
            value: value.into(),
        })
    }

    /// Appends a `test` asserting the value at `path` equals `value`.
    ///
    /// `Value::Null` asserts a literal `null`; use
    /// [`test_field_present`](Self::test_field_present) for "any value".
    #[must_use]
    pub fn test(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(PatchOp::Test {
            path: path.into(),
            value: TestValue::Value(value.into()),
            negate: false,
        })
    }

    /// Appends a `test` asserting the value at `path` differs from `value`.
    #[must_use]
    pub fn test_not(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(PatchOp::Test {
            path: path.into(),
            value: TestValue::Value(value.into()),
            negate: true,
        })
    }

    /// Appends a `test` asserting that `path` holds some value, `null`
    /// included.
    #[must_use]
    pub fn test_field_present(self, path: impl Into<String>) -> Self {
        self.push(PatchOp::Test {
            path: path.into(),
            value: TestValue::Any,
            negate: false,
        })
    }

    /// Appends a `test` asserting that `path` is absent.
    #[must_use]
    pub fn test_field_missing(self, path: impl Into<String>) -> Self {
        self.push(PatchOp::Test {
            path: path.into(),
            value: TestValue::Any,
            negate: true,
        })
    }

    /// Appends a nested, non-conditional `patch`.
    #[must_use]
    pub fn patch(self, path: impl Into<String>, ops: impl Into<PatchDocument>) -> Self {
        self.patch_with(path, ops, false)
    }

    /// Appends a nested conditional `patch`.
    #[must_use]
    pub fn patch_if(self, path: impl Into<String>, ops: impl Into<PatchDocument>) -> Self {
        self.patch_with(path, ops, true)
    }

    /// Appends a nested `patch` with an explicit conditional flag.
    #[must_use]
    pub fn patch_with(
        self,
        path: impl Into<String>,
        ops: impl Into<PatchDocument>,
        conditional: bool,
    ) -> Self {
        self.push(PatchOp::Patch {
            path: path.into(),
            ops: ops.into(),
            conditional,
        })
    }

    /// Returns the number of operations accumulated so far.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if no operations were added.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Finishes the document.
    pub fn build(self) -> PatchDocument {
        PatchDocument::from_ops(self.ops)
    }
}

impl From<PatchBuilder> for PatchDocument {
    fn from(builder: PatchBuilder) -> Self {
        builder.build()
    }
}
