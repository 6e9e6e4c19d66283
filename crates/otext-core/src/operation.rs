//! Operation model - the three edit primitives and the normalized list that
//! carries them.
//!
//! An [`OperationList`] never holds two adjacent operations of the same kind:
//! appending a `Retain` after a `Retain` sums the counts, appending an
//! `Insert` after an `Insert` concatenates the text. It also never holds a
//! zero-count retain/delete or an empty insert.

use crate::error::{OtError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One atomic edit primitive.
///
/// Lengths are counted in `char`s, never in bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Skip `n` characters of the source unchanged.
    Retain(usize),
    /// Write text at the cursor without consuming source characters.
    Insert(String),
    /// Remove `n` characters of the source at the cursor.
    Delete(usize),
}

/// The tag of an [`Operation`], used to dispatch the pairwise rule tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Retain,
    Insert,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Retain => write!(f, "retain"),
            OperationKind::Insert => write!(f, "insert"),
            OperationKind::Delete => write!(f, "delete"),
        }
    }
}

impl Operation {
    /// Checked `Retain` constructor.
    pub fn retain(count: usize) -> Result<Self> {
        Self::Retain(count).validated()
    }

    /// Checked `Insert` constructor.
    pub fn insert(text: impl Into<String>) -> Result<Self> {
        Self::Insert(text.into()).validated()
    }

    /// Checked `Delete` constructor.
    pub fn delete(count: usize) -> Result<Self> {
        Self::Delete(count).validated()
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Retain(_) => OperationKind::Retain,
            Operation::Insert(_) => OperationKind::Insert,
            Operation::Delete(_) => OperationKind::Delete,
        }
    }

    /// Count for retain/delete, character length of the text for insert.
    pub fn len(&self) -> usize {
        match self {
            Operation::Retain(n) | Operation::Delete(n) => *n,
            Operation::Insert(text) => char_len(text),
        }
    }

    /// True for a zero-length operation, which is never valid inside a list.
    pub fn is_empty(&self) -> bool {
        match self {
            Operation::Retain(n) | Operation::Delete(n) => *n == 0,
            Operation::Insert(text) => text.is_empty(),
        }
    }

    /// Reject zero counts and empty inserts.
    pub fn validate(&self) -> Result<()> {
        match self {
            Operation::Retain(0) => Err(OtError::InvalidOperation(
                "retain count must be positive".to_string(),
            )),
            Operation::Delete(0) => Err(OtError::InvalidOperation(
                "delete count must be positive".to_string(),
            )),
            Operation::Insert(text) if text.is_empty() => Err(OtError::InvalidOperation(
                "insert text must not be empty".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Characters of the source consumed when applied.
    pub fn source_len(&self) -> usize {
        match self {
            Operation::Retain(n) | Operation::Delete(n) => *n,
            Operation::Insert(_) => 0,
        }
    }

    /// Characters present in the output after applying.
    pub fn target_len(&self) -> usize {
        match self {
            Operation::Retain(n) => *n,
            Operation::Insert(text) => char_len(text),
            Operation::Delete(_) => 0,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Retain(n) => write!(f, "retain({})", n),
            Operation::Insert(text) => write!(f, "insert({:?})", text),
            Operation::Delete(n) => write!(f, "delete({})", n),
        }
    }
}

/// An ordered, normalized sequence of operations describing one edit.
///
/// Any suffix of the source not covered by retains/deletes is implicitly
/// retained, so a list does not need to reach the end of the text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Operation>", into = "Vec<Operation>")]
pub struct OperationList {
    ops: Vec<Operation>,
}

impl OperationList {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Fluent retain; a zero count adds nothing.
    pub fn retain(mut self, count: usize) -> Self {
        self.append(Operation::Retain(count));
        self
    }

    /// Fluent insert; empty text adds nothing.
    pub fn insert(mut self, text: impl Into<String>) -> Self {
        self.append(Operation::Insert(text.into()));
        self
    }

    /// Fluent delete; a zero count adds nothing.
    pub fn delete(mut self, count: usize) -> Self {
        self.append(Operation::Delete(count));
        self
    }

    /// Validate and append an operation, merging it into the last entry when
    /// the kinds match.
    pub fn push(&mut self, op: Operation) -> Result<()> {
        op.validate()?;
        self.append(op);
        Ok(())
    }

    /// Merge-on-append without validation; zero-length operations vanish.
    pub(crate) fn append(&mut self, op: Operation) {
        if op.is_empty() {
            return;
        }
        match (self.ops.last_mut(), &op) {
            (Some(Operation::Retain(n)), Operation::Retain(m)) => {
                *n += *m;
                return;
            }
            (Some(Operation::Delete(n)), Operation::Delete(m)) => {
                *n += *m;
                return;
            }
            (Some(Operation::Insert(s)), Operation::Insert(t)) => {
                s.push_str(t);
                return;
            }
            _ => {}
        }
        self.ops.push(op);
    }

    pub(crate) fn append_all(&mut self, ops: impl IntoIterator<Item = Operation>) {
        for op in ops {
            self.append(op);
        }
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.ops.iter()
    }

    pub fn as_slice(&self) -> &[Operation] {
        &self.ops
    }

    pub fn into_vec(self) -> Vec<Operation> {
        self.ops
    }

    /// Characters of the source covered by retains and deletes.
    pub fn source_len(&self) -> usize {
        self.ops.iter().map(Operation::source_len).sum()
    }

    /// Characters the covered span turns into (retains plus inserts).
    pub fn target_len(&self) -> usize {
        self.ops.iter().map(Operation::target_len).sum()
    }

    /// True when applying the list cannot change any text.
    pub fn is_noop(&self) -> bool {
        self.ops.iter().all(|op| matches!(op, Operation::Retain(_)))
    }
}

impl TryFrom<Vec<Operation>> for OperationList {
    type Error = OtError;

    fn try_from(ops: Vec<Operation>) -> Result<Self> {
        let mut list = OperationList::new();
        for op in ops {
            list.push(op)?;
        }
        Ok(list)
    }
}

impl From<OperationList> for Vec<Operation> {
    fn from(list: OperationList) -> Self {
        list.ops
    }
}

impl IntoIterator for OperationList {
    type Item = Operation;
    type IntoIter = std::vec::IntoIter<Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a OperationList {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

impl fmt::Display for OperationList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", op)?;
        }
        write!(f, "]")
    }
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split `text` after `n` characters.
pub(crate) fn split_chars(text: &str, n: usize) -> (&str, &str) {
    let at = text
        .char_indices()
        .nth(n)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    text.split_at(at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_constructors() {
        assert!(Operation::retain(3).is_ok());
        assert!(Operation::insert("a").is_ok());
        assert!(Operation::delete(1).is_ok());

        assert!(matches!(
            Operation::retain(0),
            Err(OtError::InvalidOperation(_))
        ));
        assert!(matches!(
            Operation::delete(0),
            Err(OtError::InvalidOperation(_))
        ));
        assert!(matches!(
            Operation::insert(""),
            Err(OtError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_push_merges_same_kind() {
        let mut list = OperationList::new();
        list.push(Operation::Retain(2)).unwrap();
        list.push(Operation::Retain(3)).unwrap();
        list.push(Operation::Insert("ab".into())).unwrap();
        list.push(Operation::Insert("c".into())).unwrap();
        list.push(Operation::Delete(1)).unwrap();
        list.push(Operation::Delete(4)).unwrap();

        assert_eq!(
            list.as_slice(),
            &[
                Operation::Retain(5),
                Operation::Insert("abc".into()),
                Operation::Delete(5),
            ]
        );
    }

    #[test]
    fn test_push_rejects_malformed() {
        let mut list = OperationList::new().retain(1);
        assert!(list.push(Operation::Delete(0)).is_err());
        assert!(list.push(Operation::Insert(String::new())).is_err());
        // Failed pushes leave the list untouched
        assert_eq!(list.as_slice(), &[Operation::Retain(1)]);
    }

    #[test]
    fn test_builder_drops_zero_length() {
        let list = OperationList::new().retain(0).insert("").delete(0).retain(2);
        assert_eq!(list.as_slice(), &[Operation::Retain(2)]);
    }

    #[test]
    fn test_lengths_count_chars() {
        let list = OperationList::new().retain(2).insert("héllo").delete(3);
        assert_eq!(list.source_len(), 5);
        assert_eq!(list.target_len(), 7);
        assert_eq!(Operation::Insert("日本".into()).len(), 2);
    }

    #[test]
    fn test_try_from_vec() {
        let list = OperationList::try_from(vec![
            Operation::Retain(1),
            Operation::Retain(1),
            Operation::Insert("x".into()),
        ])
        .unwrap();
        assert_eq!(
            list.as_slice(),
            &[Operation::Retain(2), Operation::Insert("x".into())]
        );

        let bad = OperationList::try_from(vec![Operation::Retain(1), Operation::Delete(0)]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_serde_rejects_malformed_lists() {
        let json = r#"[{"retain":5},{"insert":","}]"#;
        let list: OperationList = serde_json::from_str(json).unwrap();
        assert_eq!(list, OperationList::new().retain(5).insert(","));

        let bad = r#"[{"insert":""}]"#;
        assert!(serde_json::from_str::<OperationList>(bad).is_err());
    }

    #[test]
    fn test_noop_detection() {
        assert!(OperationList::new().is_noop());
        assert!(OperationList::new().retain(4).is_noop());
        assert!(!OperationList::new().retain(4).delete(1).is_noop());
    }

    #[test]
    fn test_display() {
        let list = OperationList::new().retain(5).insert(",").delete(1);
        assert_eq!(list.to_string(), r#"[retain(5), insert(","), delete(1)]"#);
    }

    #[test]
    fn test_split_chars() {
        assert_eq!(split_chars("héllo", 2), ("hé", "llo"));
        assert_eq!(split_chars("ab", 5), ("ab", ""));
        assert_eq!(split_chars("ab", 0), ("", "ab"));
    }
}
