//! # Domain Invariants
//!
//! Checks run on every block loaded from storage and after every mutation
//! before it is persisted. A block loaded in violation is quarantined, never
//! repaired.

use super::entities::{Block, BlockId};
use super::errors::LedgerError;

/// Invariant: capacity is positive.
pub fn invariant_positive_capacity(block: &Block) -> Result<(), LedgerError> {
    if block.capacity == 0 {
        return Err(LedgerError::corruption(&block.id, "capacity is zero"));
    }
    Ok(())
}

/// Invariant: `0 <= cursor <= capacity`.
pub fn invariant_cursor_bounds(block: &Block) -> Result<(), LedgerError> {
    if block.cursor > block.capacity {
        return Err(LedgerError::corruption(
            &block.id,
            format!(
                "cursor {} exceeds capacity {}",
                block.cursor, block.capacity
            ),
        ));
    }
    Ok(())
}

/// Invariant: journal entries reference distinct slots below the cursor, and
/// `len(journal) <= cursor`.
pub fn invariant_journal_consistent(block: &Block) -> Result<(), LedgerError> {
    let len = block.journal.len();
    if len > block.cursor as usize {
        return Err(LedgerError::corruption(
            &block.id,
            format!("journal has {} entries but cursor is {}", len, block.cursor),
        ));
    }

    if let Some(index) = block.journal.first_duplicate() {
        return Err(LedgerError::corruption(
            &block.id,
            format!("slot {} recorded twice", index),
        ));
    }

    if let Some(entry) = block.journal.iter().find(|e| e.index >= block.cursor) {
        return Err(LedgerError::corruption(
            &block.id,
            format!(
                "slot {} recorded at or beyond cursor {}",
                entry.index, block.cursor
            ),
        ));
    }

    Ok(())
}

/// Invariant: each recorded serial is the one the block's scheme renders.
pub fn invariant_serials_match(block: &Block) -> Result<(), LedgerError> {
    for entry in &block.journal {
        let expected = block.serial_for(entry.index);
        if entry.serial != expected {
            return Err(LedgerError::corruption(
                &block.id,
                format!(
                    "slot {} recorded as '{}', expected '{}'",
                    entry.index, entry.serial, expected
                ),
            ));
        }
    }
    Ok(())
}

/// Run every per-block invariant.
pub fn check_block(block: &Block) -> Result<(), LedgerError> {
    if block.id.as_str().is_empty() {
        return Err(LedgerError::LedgerCorruption {
            scope: "block".to_string(),
            reason: "empty block id".to_string(),
        });
    }
    invariant_positive_capacity(block)?;
    invariant_cursor_bounds(block)?;
    invariant_journal_consistent(block)?;
    invariant_serials_match(block)
}

/// Invariant: at most one block is active.
pub fn invariant_single_active<'a>(
    blocks: impl IntoIterator<Item = &'a Block>,
) -> Result<(), LedgerError> {
    let active: Vec<BlockId> = blocks
        .into_iter()
        .filter(|b| b.active)
        .map(|b| b.id.clone())
        .collect();

    if active.len() > 1 {
        return Err(LedgerError::MultipleActive { block_ids: active });
    }
    Ok(())
}
