//! Single-edit diff used at the editor boundary.
//!
//! Editors hand over a `(previous, current)` pair per change notification.
//! Those notifications carry one contiguous change, so a shared-prefix and
//! shared-suffix scan is enough; several disjoint edits in one notification
//! come out as one wider replacement.

use crate::operation::OperationList;

/// Build the operation list turning `previous` into `current`.
///
/// The list is `[Retain(prefix)?, Delete(removed)?, Insert(added)?]`; the
/// unchanged suffix is left implicit. Equal inputs give an empty list.
pub fn diff(previous: &str, current: &str) -> OperationList {
    let before: Vec<char> = previous.chars().collect();
    let after: Vec<char> = current.chars().collect();

    let prefix = before
        .iter()
        .zip(after.iter())
        .take_while(|(a, b)| a == b)
        .count();

    // The suffix may not reach back into the shared prefix.
    let max_suffix = before.len().min(after.len()) - prefix;
    let suffix = before
        .iter()
        .rev()
        .zip(after.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let removed = before.len() - prefix - suffix;
    let added: String = after[prefix..after.len() - suffix].iter().collect();

    OperationList::new()
        .retain(prefix)
        .delete(removed)
        .insert(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::apply;

    #[test]
    fn test_diff_insert() {
        let ops = diff("hello world", "hello, world");
        assert_eq!(ops, OperationList::new().retain(5).insert(","));
        assert_eq!(apply("hello world", &ops).unwrap(), "hello, world");
    }

    #[test]
    fn test_diff_delete() {
        let ops = diff("abcdef", "af");
        assert_eq!(ops, OperationList::new().retain(1).delete(4));
    }

    #[test]
    fn test_diff_replace() {
        let ops = diff("the cat sat", "the dog sat");
        assert_eq!(ops, OperationList::new().retain(4).delete(3).insert("dog"));
        assert_eq!(apply("the cat sat", &ops).unwrap(), "the dog sat");
    }

    #[test]
    fn test_diff_repeated_characters() {
        // Prefix and suffix overlap candidates: "aaa" -> "aaaa"
        let ops = diff("aaa", "aaaa");
        assert_eq!(ops, OperationList::new().retain(3).insert("a"));
        assert_eq!(apply("aaa", &ops).unwrap(), "aaaa");
    }

    #[test]
    fn test_diff_equal_is_empty() {
        assert!(diff("same", "same").is_empty());
        assert!(diff("", "").is_empty());
    }

    #[test]
    fn test_diff_from_and_to_empty() {
        assert_eq!(diff("", "new"), OperationList::new().insert("new"));
        assert_eq!(diff("old", ""), OperationList::new().delete(3));
    }

    #[test]
    fn test_diff_multibyte() {
        let ops = diff("naïve café", "naïve cafés");
        assert_eq!(ops, OperationList::new().retain(10).insert("s"));
        assert_eq!(apply("naïve café", &ops).unwrap(), "naïve cafés");
    }
}
