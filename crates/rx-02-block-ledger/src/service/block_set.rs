//! In-memory image of the `rx_blocks_v1` collection.
//!
//! Values are decoded one by one: a block that parses but violates an
//! invariant is kept and quarantined; a value that does not parse at all is
//! carried through every write untouched so the ledger never erases data
//! it could not read.

use crate::domain::entities::{Block, BlockId};
use crate::domain::errors::LedgerError;
use crate::domain::invariants::check_block;
use crate::domain::value_objects::QuarantinedBlock;
use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub(crate) struct BlockSet {
    order: Vec<BlockId>,
    blocks: HashMap<BlockId, Block>,
    quarantine: HashMap<BlockId, String>,
    unreadable: Vec<serde_json::Value>,
}

impl BlockSet {
    /// Decode the persisted array. Only an unparseable top level is fatal.
    pub fn decode(bytes: Option<&[u8]>, key: &str) -> Result<Self, LedgerError> {
        let mut set = Self::default();
        let Some(bytes) = bytes else {
            return Ok(set);
        };

        let values: Vec<serde_json::Value> =
            serde_json::from_slice(bytes).map_err(|e| LedgerError::LedgerCorruption {
                scope: key.to_string(),
                reason: format!("not a JSON array of blocks: {}", e),
            })?;

        for value in values {
            let block: Block = match serde_json::from_value(value.clone()) {
                Ok(block) => block,
                Err(e) => {
                    tracing::warn!("[rx-02] Unreadable entry in {} kept as-is: {}", key, e);
                    set.unreadable.push(value);
                    continue;
                }
            };

            if set.blocks.contains_key(&block.id) {
                tracing::warn!(
                    block_id = %block.id,
                    "[rx-02] Duplicate block id in {}; later entry kept as-is",
                    key
                );
                set.unreadable.push(value);
                continue;
            }

            if let Err(e) = check_block(&block) {
                tracing::error!(block_id = %block.id, "[rx-02] Quarantined block: {}", e);
                set.quarantine.insert(block.id.clone(), quarantine_reason(e));
            }

            set.order.push(block.id.clone());
            set.blocks.insert(block.id.clone(), block);
        }

        Ok(set)
    }

    /// Encode blocks in order, followed by unreadable entries.
    pub fn encode(&self) -> Result<Vec<u8>, LedgerError> {
        let mut values = Vec::with_capacity(self.order.len() + self.unreadable.len());
        for block in self.iter() {
            values.push(serde_json::to_value(block)?);
        }
        values.extend(self.unreadable.iter().cloned());
        Ok(serde_json::to_vec(&values)?)
    }

    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn get_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.blocks.contains_key(id)
    }

    /// Insert as the newest block.
    pub fn insert_front(&mut self, block: Block) {
        self.order.insert(0, block.id.clone());
        self.blocks.insert(block.id.clone(), block);
    }

    pub fn remove(&mut self, id: &BlockId) -> Option<Block> {
        let block = self.blocks.remove(id)?;
        self.order.retain(|b| b != id);
        self.quarantine.remove(id);
        Some(block)
    }

    /// Blocks newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.order.iter().filter_map(|id| self.blocks.get(id))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Block> {
        self.blocks.values_mut()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn quarantine_reason(&self, id: &BlockId) -> Option<&str> {
        self.quarantine.get(id).map(String::as_str)
    }

    pub fn quarantined(&self) -> Vec<QuarantinedBlock> {
        self.order
            .iter()
            .filter_map(|id| {
                self.quarantine.get(id).map(|reason| QuarantinedBlock {
                    block_id: id.clone(),
                    reason: reason.clone(),
                })
            })
            .collect()
    }

    pub fn unreadable_count(&self) -> usize {
        self.unreadable.len()
    }
}

fn quarantine_reason(err: LedgerError) -> String {
    match err {
        LedgerError::LedgerCorruption { reason, .. } => reason,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_block;

    const KEY: &str = "rx_blocks_v1";

    #[test]
    fn test_missing_value_is_empty() {
        let set = BlockSet::decode(None, KEY).unwrap();
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_invalid_top_level_is_corruption() {
        let err = BlockSet::decode(Some(b"{not json"), KEY).unwrap_err();
        assert!(matches!(err, LedgerError::LedgerCorruption { scope, .. } if scope == KEY));
    }

    #[test]
    fn test_order_preserved_through_encode() {
        let a = sample_block("A", 3);
        let b = sample_block("B", 3);
        let mut set = BlockSet::default();
        set.insert_front(a.clone());
        set.insert_front(b.clone());

        let bytes = set.encode().unwrap();
        let decoded = BlockSet::decode(Some(&bytes), KEY).unwrap();
        let ids: Vec<_> = decoded.iter().map(|blk| blk.id.clone()).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[test]
    fn test_violating_block_is_quarantined_not_repaired() {
        let mut bad = sample_block("BAD", 3);
        bad.cursor = 7;
        let good = sample_block("OK", 3);
        let bytes = serde_json::to_vec(&vec![&bad, &good]).unwrap();

        let set = BlockSet::decode(Some(&bytes), KEY).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.quarantine_reason(&bad.id).is_some());
        assert!(set.quarantine_reason(&good.id).is_none());
        assert_eq!(set.get(&bad.id).map(|b| b.cursor), Some(7));
    }

    #[test]
    fn test_unreadable_entries_survive_rewrite() {
        let good = sample_block("OK", 3);
        let json = serde_json::json!([good, {"id": "blk_broken", "capacity": "many"}]);
        let bytes = serde_json::to_vec(&json).unwrap();

        let set = BlockSet::decode(Some(&bytes), KEY).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.unreadable_count(), 1);

        let rewritten: serde_json::Value = serde_json::from_slice(&set.encode().unwrap()).unwrap();
        assert_eq!(rewritten.as_array().map(Vec::len), Some(2));
        assert_eq!(rewritten[1]["id"], "blk_broken");
    }

    #[test]
    fn test_duplicate_id_keeps_first() {
        let block = sample_block("A", 3);
        let mut twin = block.clone();
        twin.label = "twin".to_string();
        let bytes = serde_json::to_vec(&vec![&block, &twin]).unwrap();

        let set = BlockSet::decode(Some(&bytes), KEY).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&block.id).map(|b| b.label.as_str()), Some("A.pdf"));
        assert_eq!(set.unreadable_count(), 1);
    }

    #[test]
    fn test_remove_clears_quarantine() {
        let mut bad = sample_block("BAD", 3);
        bad.capacity = 0;
        let bytes = serde_json::to_vec(&vec![&bad]).unwrap();
        let mut set = BlockSet::decode(Some(&bytes), KEY).unwrap();

        assert_eq!(set.quarantined().len(), 1);
        assert!(set.remove(&bad.id).is_some());
        assert!(set.quarantined().is_empty());
        assert!(!set.contains(&bad.id));
    }
}
