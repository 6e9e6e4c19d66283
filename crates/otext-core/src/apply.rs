//! Apply engine - runs an operation list against a base string.

use crate::error::{OtError, Result};
use crate::operation::{Operation, OperationList};

/// Apply `ops` to `source` and return the edited text.
///
/// A single cursor walks the source: retains copy characters, deletes skip
/// them and inserts write new text without moving the cursor. Whatever is
/// left of the source after the last operation is copied unchanged.
///
/// Fails with [`OtError::MalformedOperationList`] when a retain or delete runs
/// past the end of `source`. The source is only borrowed, so a failure leaves
/// nothing half-applied.
pub fn apply(source: &str, ops: &OperationList) -> Result<String> {
    let source_len = source.chars().count();
    let mut chars = source.chars();
    let mut output = String::with_capacity(source.len() + ops.target_len());
    let mut cursor = 0usize;

    for op in ops {
        match op {
            Operation::Retain(n) => {
                check_bounds("retain", cursor, *n, source_len)?;
                output.extend(chars.by_ref().take(*n));
                cursor += n;
            }
            Operation::Delete(n) => {
                check_bounds("delete", cursor, *n, source_len)?;
                chars.by_ref().take(*n).for_each(drop);
                cursor += n;
            }
            Operation::Insert(text) => output.push_str(text),
        }
    }

    output.extend(chars);
    Ok(output)
}

fn check_bounds(kind: &'static str, offset: usize, len: usize, source_len: usize) -> Result<()> {
    if offset + len > source_len {
        return Err(OtError::MalformedOperationList {
            kind,
            offset,
            len,
            source_len,
        });
    }
    Ok(())
}
