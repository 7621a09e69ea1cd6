//! Local evaluation of patch documents against JSON values.

use serde_json::{Map, Number, Value};

use super::{PatchDocument, PatchFailure, PatchOp};

/// A failure on its way up from a nested scope.
///
/// `path` collects operation indices innermost first and is reversed once the
/// failure reaches the top-level document.
struct Fault {
    path: Vec<usize>,
    assertion: bool,
    actual: Option<Value>,
    info: String,
}

impl Fault {
    fn conflict(info: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            assertion: false,
            actual: None,
            info: info.into(),
        }
    }
}

impl PatchDocument {
    /// Applies the document to `target`.
    ///
    /// On success every operation has been applied in order. On failure
    /// `target` is left untouched and the returned [`PatchFailure`] addresses
    /// the failing operation.
    ///
    /// A nested `patch` operates on the value at its path, with nested paths
    /// relative to it. When a `test` fails inside a conditional nested patch,
    /// the innermost enclosing conditional scope is skipped and application
    /// continues after it. Any other failure aborts the whole document.
    pub fn apply(&self, target: &mut Value) -> Result<(), PatchFailure> {
        let mut working = target.clone();
        match apply_ops(self, &mut working) {
            Ok(()) => {
                *target = working;
                Ok(())
            }
            Err(mut fault) => {
                fault.path.reverse();
                let (op_index, nested_path) = match fault.path.split_first() {
                    Some((first, rest)) => (*first, rest.to_vec()),
                    None => (0, Vec::new()),
                };
                let op = self.ops[op_index].clone();
                Err(PatchFailure::new(
                    op_index,
                    op,
                    nested_path,
                    fault.actual,
                    fault.info,
                ))
            }
        }
    }
}

fn apply_ops(document: &PatchDocument, target: &mut Value) -> Result<(), Fault> {
    for (index, op) in document.iter().enumerate() {
        apply_op(op, target).map_err(|mut fault| {
            fault.path.push(index);
            fault
        })?;
    }
    Ok(())
}

fn apply_op(op: &PatchOp, target: &mut Value) -> Result<(), Fault> {
    match op {
        PatchOp::Add { path, value } => add(target, &parse_pointer(path)?, value.clone()),
        PatchOp::Remove { path } => remove(target, &parse_pointer(path)?).map(drop),
        PatchOp::Replace { path, value } => {
            let tokens = parse_pointer(path)?;
            let slot = lookup_mut(target, &tokens)
                .ok_or_else(|| Fault::conflict(format!("path {} does not exist", path)))?;
            *slot = value.clone();
            Ok(())
        }
        PatchOp::Move { from, path } => {
            if from == path {
                return Ok(());
            }
            if path.starts_with(from.as_str()) && path[from.len()..].starts_with('/') {
                return Err(Fault::conflict(format!(
                    "cannot move {} into its own child {}",
                    from, path
                )));
            }
            let source = parse_pointer(from)?;
            let value = remove(target, &source)?;
            add(target, &parse_pointer(path)?, value)
        }
        PatchOp::Copy { from, path } => {
            let source = parse_pointer(from)?;
            let value = lookup(target, &source)
                .cloned()
                .ok_or_else(|| Fault::conflict(format!("path {} does not exist", from)))?;
            add(target, &parse_pointer(path)?, value)
        }
        PatchOp::Inc { path, amount } => {
            let tokens = parse_pointer(path)?;
            let slot = lookup_mut(target, &tokens)
                .ok_or_else(|| Fault::conflict(format!("path {} does not exist", path)))?;
            let current = match slot {
                Value::Number(number) => number.clone(),
                _ => return Err(Fault::conflict(format!("value at {} is not a number", path))),
            };
            let amount = amount.clone().unwrap_or_else(|| Number::from(1));
            *slot = Value::Number(increment(&current, &amount).ok_or_else(|| {
                Fault::conflict(format!("increment at {} is out of range", path))
            })?);
            Ok(())
        }
        PatchOp::Init { path, value } => {
            let tokens = parse_pointer(path)?;
            if lookup(target, &tokens).is_some() {
                return Ok(());
            }
            add(target, &tokens, value.clone())
        }
        PatchOp::Merge { path, value } => {
            let tokens = parse_pointer(path)?;
            match lookup_mut(target, &tokens) {
                Some(slot) => {
                    merge(slot, value);
                    Ok(())
                }
                None => {
                    let mut fresh = Value::Null;
                    merge(&mut fresh, value);
                    add(target, &tokens, fresh)
                }
            }
        }
        PatchOp::Test {
            path,
            value,
            negate,
        } => {
            let tokens = parse_pointer(path)?;
            let actual = lookup(target, &tokens);
            if value.matches(actual) != *negate {
                return Ok(());
            }
            Err(Fault {
                path: Vec::new(),
                assertion: true,
                actual: actual.cloned(),
                info: format!("test at {} did not hold", path),
            })
        }
        PatchOp::Patch {
            path,
            ops,
            conditional,
        } => {
            let tokens = parse_pointer(path)?;
            let mut scope = lookup(target, &tokens)
                .cloned()
                .ok_or_else(|| Fault::conflict(format!("path {} does not exist", path)))?;
            match apply_ops(ops, &mut scope) {
                Ok(()) => {
                    if let Some(slot) = lookup_mut(target, &tokens) {
                        *slot = scope;
                    }
                    Ok(())
                }
                Err(fault) if *conditional && fault.assertion => Ok(()),
                Err(fault) => Err(fault),
            }
        }
    }
}

fn increment(current: &Number, amount: &Number) -> Option<Number> {
    if let (Some(a), Some(b)) = (current.as_i64(), amount.as_i64()) {
        return a.checked_add(b).map(Number::from);
    }
    let sum = current.as_f64()? + amount.as_f64()?;
    Number::from_f64(sum)
}

/// RFC 7386 merge of `patch` into `target`.
fn merge(target: &mut Value, patch: &Value) {
    let Value::Object(entries) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(existing) = target {
        for (key, value) in entries {
            if value.is_null() {
                existing.remove(key);
            } else {
                merge(existing.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// Parses a JSON pointer. `""` and `"/"` both address the root.
fn parse_pointer(path: &str) -> Result<Vec<String>, Fault> {
    if path.is_empty() || path == "/" {
        return Ok(Vec::new());
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Err(Fault::conflict(format!("invalid path {:?}", path)));
    };
    Ok(rest
        .split('/')
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect())
}

fn array_index(token: &str, len: usize) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    token.parse::<usize>().ok().filter(|&index| index < len)
}

fn lookup<'a>(target: &'a Value, tokens: &[String]) -> Option<&'a Value> {
    tokens.iter().try_fold(target, |current, token| match current {
        Value::Object(map) => map.get(token),
        Value::Array(items) => array_index(token, items.len()).map(|index| &items[index]),
        _ => None,
    })
}

fn lookup_mut<'a>(target: &'a mut Value, tokens: &[String]) -> Option<&'a mut Value> {
    tokens.iter().try_fold(target, |current, token| match current {
        Value::Object(map) => map.get_mut(token),
        Value::Array(items) => {
            let len = items.len();
            array_index(token, len).map(move |index| &mut items[index])
        }
        _ => None,
    })
}

fn add(target: &mut Value, tokens: &[String], value: Value) -> Result<(), Fault> {
    let Some((last, parent)) = tokens.split_last() else {
        *target = value;
        return Ok(());
    };
    let container = lookup_mut(target, parent)
        .ok_or_else(|| Fault::conflict(format!("parent of /{} does not exist", tokens.join("/"))))?;
    match container {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            if last == "-" {
                items.push(value);
                return Ok(());
            }
            // Inserting at `len` appends.
            let index = array_index(last, items.len() + 1)
                .ok_or_else(|| Fault::conflict(format!("invalid array index {:?}", last)))?;
            items.insert(index, value);
            Ok(())
        }
        _ => Err(Fault::conflict(format!(
            "parent of /{} is not a container",
            tokens.join("/")
        ))),
    }
}

fn remove(target: &mut Value, tokens: &[String]) -> Result<Value, Fault> {
    let Some((last, parent)) = tokens.split_last() else {
        return Err(Fault::conflict("cannot remove the document root"));
    };
    let missing = || Fault::conflict(format!("path /{} does not exist", tokens.join("/")));
    match lookup_mut(target, parent).ok_or_else(missing)? {
        Value::Object(map) => map.remove(last).ok_or_else(missing),
        Value::Array(items) => {
            let index = array_index(last, items.len()).ok_or_else(missing)?;
            Ok(items.remove(index))
        }
        _ => Err(missing()),
    }
}
