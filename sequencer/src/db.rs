//! The world-state view public execution reads from and writes to.

use std::collections::HashMap;
use std::future::Future;

use l2_common::hash::compute_public_data_tree_leaf_slot;
use l2_common::{ContractAddress, Fr};
use tracing::trace;

/// Public storage with a two-level undo log.
///
/// Writes land in an uncommitted layer. [`checkpoint`](Self::checkpoint)
/// freezes them so a later [`rollback_to_checkpoint`](Self::rollback_to_checkpoint)
/// only drops what came after. [`commit`](Self::commit) makes everything
/// permanent and [`rollback_to_commit`](Self::rollback_to_commit) drops
/// everything since the last commit.
pub trait PublicStateDb {
    fn storage_read(
        &self,
        contract: ContractAddress,
        slot: Fr,
    ) -> impl Future<Output = anyhow::Result<Fr>> + Send;

    /// Returns the leaf slot the value was written to.
    fn storage_write(
        &mut self,
        contract: ContractAddress,
        slot: Fr,
        value: Fr,
    ) -> impl Future<Output = anyhow::Result<Fr>> + Send;

    fn checkpoint(&mut self) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn rollback_to_checkpoint(&mut self) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn commit(&mut self) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn rollback_to_commit(&mut self) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// [`PublicStateDb`] over a map of leaf slots.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPublicStateDb {
    committed: HashMap<Fr, Fr>,
    checkpointed: HashMap<Fr, Fr>,
    uncommitted: HashMap<Fr, Fr>,
}

impl InMemoryPublicStateDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds committed storage.
    pub fn with_storage(mut self, contract: ContractAddress, slot: Fr, value: Fr) -> Self {
        self.committed
            .insert(compute_public_data_tree_leaf_slot(contract, slot), value);
        self
    }

    fn read(&self, leaf_slot: &Fr) -> Fr {
        self.uncommitted
            .get(leaf_slot)
            .or_else(|| self.checkpointed.get(leaf_slot))
            .or_else(|| self.committed.get(leaf_slot))
            .copied()
            .unwrap_or_default()
    }

    /// Value of a slot as of the last commit.
    pub fn committed_value(&self, contract: ContractAddress, slot: Fr) -> Fr {
        let leaf_slot = compute_public_data_tree_leaf_slot(contract, slot);
        self.committed.get(&leaf_slot).copied().unwrap_or_default()
    }
}

impl PublicStateDb for InMemoryPublicStateDb {
    async fn storage_read(&self, contract: ContractAddress, slot: Fr) -> anyhow::Result<Fr> {
        Ok(self.read(&compute_public_data_tree_leaf_slot(contract, slot)))
    }

    async fn storage_write(
        &mut self,
        contract: ContractAddress,
        slot: Fr,
        value: Fr,
    ) -> anyhow::Result<Fr> {
        let leaf_slot = compute_public_data_tree_leaf_slot(contract, slot);
        trace!(%contract, %slot, %value, "storage write");
        self.uncommitted.insert(leaf_slot, value);
        Ok(leaf_slot)
    }

    async fn checkpoint(&mut self) -> anyhow::Result<()> {
        self.checkpointed.extend(self.uncommitted.drain());
        Ok(())
    }

    async fn rollback_to_checkpoint(&mut self) -> anyhow::Result<()> {
        self.uncommitted.clear();
        Ok(())
    }

    async fn commit(&mut self) -> anyhow::Result<()> {
        self.committed.extend(self.checkpointed.drain());
        self.committed.extend(self.uncommitted.drain());
        Ok(())
    }

    async fn rollback_to_commit(&mut self) -> anyhow::Result<()> {
        self.checkpointed.clear();
        self.uncommitted.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;
    use l2_common::fr;

    use super::*;

    const CONTRACT: ContractAddress = ContractAddress::ZERO;

    #[tokio::test]
    async fn reads_see_the_newest_layer() {
        let mut db = InMemoryPublicStateDb::new().with_storage(CONTRACT, fr(1), fr(10));
        check!(db.storage_read(CONTRACT, fr(1)).await.unwrap() == fr(10));

        db.storage_write(CONTRACT, fr(1), fr(11)).await.unwrap();
        db.checkpoint().await.unwrap();
        db.storage_write(CONTRACT, fr(1), fr(12)).await.unwrap();
        check!(db.storage_read(CONTRACT, fr(1)).await.unwrap() == fr(12));

        db.rollback_to_checkpoint().await.unwrap();
        check!(db.storage_read(CONTRACT, fr(1)).await.unwrap() == fr(11));
        check!(db.committed_value(CONTRACT, fr(1)) == fr(10));
    }

    #[tokio::test]
    async fn rollback_to_commit_drops_checkpointed_writes() {
        let mut db = InMemoryPublicStateDb::new();
        db.storage_write(CONTRACT, fr(2), fr(5)).await.unwrap();
        db.checkpoint().await.unwrap();
        db.rollback_to_commit().await.unwrap();
        check!(db.storage_read(CONTRACT, fr(2)).await.unwrap() == Fr::zero());
    }

    #[tokio::test]
    async fn commit_keeps_the_latest_write() {
        let mut db = InMemoryPublicStateDb::new();
        db.storage_write(CONTRACT, fr(3), fr(1)).await.unwrap();
        db.checkpoint().await.unwrap();
        let leaf_slot = db.storage_write(CONTRACT, fr(3), fr(2)).await.unwrap();
        db.commit().await.unwrap();

        check!(leaf_slot == compute_public_data_tree_leaf_slot(CONTRACT, fr(3)));
        check!(db.committed_value(CONTRACT, fr(3)) == fr(2));
    }
}
