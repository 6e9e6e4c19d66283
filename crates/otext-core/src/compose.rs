//! Compose - folding two sequential operation lists into one.
//!
//! `compose(ops1, ops2)` satisfies
//! `apply(apply(s, ops1), ops2) == apply(s, compose(ops1, ops2))`.
//!
//! The merge loop mirrors [`crate::transform`]: one pending slot per side,
//! a pairwise rule per `(kind1, kind2)`, leftovers re-queued. Here the slots
//! meet on the *intermediate* text, i.e. the output of `ops1` which is also
//! the input of `ops2`.

use crate::operation::{char_len, split_chars, Operation, OperationList};

/// Result of composing one operation from each side.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComposeStep {
    pub rest1: Option<Operation>,
    pub rest2: Option<Operation>,
    pub composed: Vec<Operation>,
}

/// The 3x3 pairwise compose table.
pub fn compose_pair(op1: Operation, op2: Operation) -> ComposeStep {
    use Operation::{Delete, Insert, Retain};

    match (op1, op2) {
        // op2 writes at the front of whatever op1 produced here, so its text
        // goes first. Ahead of a delete too: [Insert, Delete] is the order
        // catch-up transforms expect.
        (op1, Insert(b)) => ComposeStep {
            rest1: Some(op1),
            rest2: None,
            composed: vec![Insert(b)],
        },
        // Deleted by op1: op2 never saw these characters.
        (Delete(n), op2) => ComposeStep {
            rest1: None,
            rest2: Some(op2),
            composed: vec![Delete(n)],
        },
        (Insert(a), Retain(m)) => {
            let len_a = char_len(&a);
            let (kept, rest) = split_chars(&a, m);
            ComposeStep {
                rest1: (!rest.is_empty()).then(|| Insert(rest.to_string())),
                rest2: (m > len_a).then(|| Retain(m - len_a)),
                composed: vec![Insert(kept.to_string())],
            }
        }
        // Freshly inserted text deleted again: both cancel.
        (Insert(a), Delete(m)) => {
            let len_a = char_len(&a);
            let (_, rest) = split_chars(&a, m);
            ComposeStep {
                rest1: (!rest.is_empty()).then(|| Insert(rest.to_string())),
                rest2: (m > len_a).then(|| Delete(m - len_a)),
                composed: Vec::new(),
            }
        }
        (Retain(n), Retain(m)) => ComposeStep {
            rest1: (n > m).then(|| Retain(n - m)),
            rest2: (m > n).then(|| Retain(m - n)),
            composed: vec![Retain(n.min(m))],
        },
        (Retain(n), Delete(m)) => ComposeStep {
            rest1: (n > m).then(|| Retain(n - m)),
            rest2: (m > n).then(|| Delete(m - n)),
            composed: vec![Delete(n.min(m))],
        },
    }
}

/// Compose two sequential operation lists into one equivalent list.
///
/// `ops2` must be valid against the output of `ops1`; the driver itself does
/// not check this, a mismatch surfaces when the result is applied.
pub fn compose(ops1: &OperationList, ops2: &OperationList) -> OperationList {
    let mut iter1 = ops1.iter().cloned();
    let mut iter2 = ops2.iter().cloned();
    let mut slot1: Option<Operation> = None;
    let mut slot2: Option<Operation> = None;
    let mut result = OperationList::new();

    loop {
        let op1 = slot1.take().or_else(|| iter1.next());
        let op2 = slot2.take().or_else(|| iter2.next());

        match (op1, op2) {
            (None, None) => break,
            (None, Some(op2)) => {
                result.append(op2);
                result.append_all(iter2.by_ref());
                break;
            }
            (Some(op1), None) => {
                result.append(op1);
                result.append_all(iter1.by_ref());
                break;
            }
            (Some(op1), Some(op2)) => {
                let step = compose_pair(op1, op2);
                slot1 = step.rest1;
                slot2 = step.rest2;
                result.append_all(step.composed);
            }
        }
    }

    result
}
