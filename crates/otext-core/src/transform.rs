//! Transform - reconciling two concurrent operation lists.
//!
//! `transform(ops1, ops2)` returns `(ops2', ops1')` such that
//!
//! ```text
//! apply(apply(s, ops1), ops2') == apply(apply(s, ops2), ops1')
//! ```
//!
//! `ops1` is the side that wins ties: when both lists insert at the same
//! offset, the text of `ops1` ends up first in both converged results.
//!
//! The driver walks both lists with one pending slot per side. On every step
//! it hands the two current operations, which start at the same offset of the
//! common base text, to [`transform_pair`]; whatever a side did not consume is
//! put back into its slot for the next step.

use crate::operation::{char_len, Operation, OperationList};

/// Result of transforming one operation from each side.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransformStep {
    /// Unconsumed remainder of the first operation.
    pub rest1: Option<Operation>,
    /// Unconsumed remainder of the second operation.
    pub rest2: Option<Operation>,
    /// Output for `ops2'` (applied after `ops1`).
    pub transformed2: Vec<Operation>,
    /// Output for `ops1'` (applied after `ops2`).
    pub transformed1: Vec<Operation>,
}

/// The 3x3 pairwise transform table.
///
/// Both operations begin at the same base offset. A side is only consumed as
/// far as the other side's base span reaches, so the two slots stay aligned
/// on the base text after every step.
pub fn transform_pair(op1: Operation, op2: Operation) -> TransformStep {
    use Operation::{Delete, Insert, Retain};

    match (op1, op2) {
        // Tie: op1's text goes first on both sides.
        (Insert(a), Insert(b)) => {
            let (len_a, len_b) = (char_len(&a), char_len(&b));
            TransformStep {
                rest1: None,
                rest2: None,
                transformed2: vec![Retain(len_a), Insert(b)],
                transformed1: vec![Insert(a), Retain(len_b)],
            }
        }
        // op1 inserts before whatever op2 does here; op2 waits.
        (Insert(a), op2) => TransformStep {
            rest1: None,
            rest2: Some(op2),
            transformed2: vec![Retain(char_len(&a))],
            transformed1: vec![Insert(a)],
        },
        // op2 inserts before whatever op1 does here; op1 waits.
        (op1, Insert(b)) => {
            let len_b = char_len(&b);
            TransformStep {
                rest1: Some(op1),
                rest2: None,
                transformed2: vec![Insert(b)],
                transformed1: vec![Retain(len_b)],
            }
        }
        // Untouched on both sides: keep offsets aligned with an explicit retain.
        (Retain(n), Retain(m)) => {
            let (rest1, rest2) = leftovers(n, m, Retain, Retain);
            let common = n.min(m);
            TransformStep {
                rest1,
                rest2,
                transformed2: vec![Retain(common)],
                transformed1: vec![Retain(common)],
            }
        }
        // op2 deletes what op1 kept; the span no longer exists for op1'.
        (Retain(n), Delete(m)) => {
            let (rest1, rest2) = leftovers(n, m, Retain, Delete);
            TransformStep {
                rest1,
                rest2,
                transformed2: vec![Delete(n.min(m))],
                transformed1: Vec::new(),
            }
        }
        (Delete(n), Retain(m)) => {
            let (rest1, rest2) = leftovers(n, m, Delete, Retain);
            TransformStep {
                rest1,
                rest2,
                transformed2: Vec::new(),
                transformed1: vec![Delete(n.min(m))],
            }
        }
        // Both deleted the overlap already.
        (Delete(n), Delete(m)) => {
            let (rest1, rest2) = leftovers(n, m, Delete, Delete);
            TransformStep {
                rest1,
                rest2,
                transformed2: Vec::new(),
                transformed1: Vec::new(),
            }
        }
    }
}

/// Carry the longer side's excess over `min(n, m)` back into its slot.
fn leftovers(
    n: usize,
    m: usize,
    rest1: fn(usize) -> Operation,
    rest2: fn(usize) -> Operation,
) -> (Option<Operation>, Option<Operation>) {
    if n > m {
        (Some(rest1(n - m)), None)
    } else if m > n {
        (None, Some(rest2(m - n)))
    } else {
        (None, None)
    }
}

/// Transform two concurrent operation lists against each other.
///
/// Returns `(ops2', ops1')`. The driver needs no knowledge of the base text:
/// once one side runs out, the other side's remainder operates on the
/// implicitly retained tail and is copied verbatim.
pub fn transform(ops1: &OperationList, ops2: &OperationList) -> (OperationList, OperationList) {
    let mut iter1 = ops1.iter().cloned();
    let mut iter2 = ops2.iter().cloned();
    let mut slot1: Option<Operation> = None;
    let mut slot2: Option<Operation> = None;
    let mut transformed2 = OperationList::new();
    let mut transformed1 = OperationList::new();

    loop {
        let op1 = slot1.take().or_else(|| iter1.next());
        let op2 = slot2.take().or_else(|| iter2.next());

        match (op1, op2) {
            (None, None) => break,
            (None, Some(op2)) => {
                transformed2.append(op2);
                transformed2.append_all(iter2.by_ref());
                break;
            }
            (Some(op1), None) => {
                transformed1.append(op1);
                transformed1.append_all(iter1.by_ref());
                break;
            }
            (Some(op1), Some(op2)) => {
                let step = transform_pair(op1, op2);
                slot1 = step.rest1;
                slot2 = step.rest2;
                transformed2.append_all(step.transformed2);
                transformed1.append_all(step.transformed1);
            }
        }
    }

    (transformed2, transformed1)
}
