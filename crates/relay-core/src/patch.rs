//! Path-addressed patch encoding.
//!
//! A nested JSON value is flattened into one [`Patch`] per scalar leaf. The
//! client applies each patch to a result tree rooted at [`ROOT`]:
//! `Set` replaces the value at the address, `Append` concatenates onto the
//! string already there.
//!
//! Ordering is depth-first and follows the value's own iteration order
//! (object insertion order, then array index order). Empty objects and
//! arrays produce no patches.

use serde_json::Value;

/// Root of the client-side result tree.
pub const ROOT: &str = "payload";

/// How a patch is applied at its address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchMode {
    Set,
    Append,
}

impl PatchMode {
    pub fn from_accumulate(accumulate: bool) -> Self {
        if accumulate {
            Self::Append
        } else {
            Self::Set
        }
    }
}

/// A single scalar write at an addressed location.
#[derive(Clone, Debug, PartialEq)]
pub struct Patch {
    pub path: String,
    pub mode: PatchMode,
    pub value: Value,
}

impl Patch {
    pub fn set(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            mode: PatchMode::Set,
            value: value.into(),
        }
    }

    pub fn append(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            mode: PatchMode::Append,
            value: value.into(),
        }
    }
}

/// Address of response part `index`: `payload[index]`.
pub fn part_path(index: usize) -> String {
    index_path(ROOT, index)
}

/// `base.key`
pub fn child_path(base: &str, key: &str) -> String {
    format!("{base}.{key}")
}

/// `base[index]`
pub fn index_path(base: &str, index: usize) -> String {
    format!("{base}[{index}]")
}

/// Flatten `value` under `base`, handing each patch to `emit` as it is produced.
///
/// `accumulate` is propagated through objects only. Array elements are always
/// encoded with `accumulate = false`, so each element's leaves are `Set`.
pub fn encode<F>(value: &Value, base: &str, accumulate: bool, emit: &mut F)
where
    F: FnMut(Patch),
{
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                encode(item, &index_path(base, i), false, emit);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                encode(item, &child_path(base, key), accumulate, emit);
            }
        }
        scalar => emit(Patch {
            path: base.to_string(),
            mode: PatchMode::from_accumulate(accumulate),
            value: scalar.clone(),
        }),
    }
}

/// Collect the patches for `value` into a vector.
pub fn encode_to_vec(value: &Value, base: &str, accumulate: bool) -> Vec<Patch> {
    let mut patches = Vec::new();
    encode(value, base, accumulate, &mut |p| patches.push(p));
    patches
}
