//! Publication ledger
//!
//! Remembers the source of every toot that actually went out, keyed by the
//! status id the server assigned to it, so replies asking for the source can
//! be answered later.

use tracing::debug;

use crate::error::{LedgerError, Result};
use crate::store::{Store, StoreTx};
use crate::types::{PublicationRecord, Source};

pub const LEDGER_COLLECTION: &str = "ledger";

/// Result of [`PublicationLedger::mark_used`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The record flipped from unused to used
    Marked,
    /// The record was already used; nothing changed
    AlreadyUsed,
}

/// Result of [`PublicationLedger::begin_disclosure`].
pub enum Disclosure {
    /// No toot was published under this id
    Unknown,
    /// The source was already sent
    AlreadyDisclosed,
    /// The record is unused and held until the claim completes or drops
    Pending(PendingDisclosure),
}

/// An unused ledger record held under the ledger's write lock.
///
/// Other disclosures of any id wait until this one completes or is dropped.
/// Dropping it leaves the record unused.
pub struct PendingDisclosure {
    tx: StoreTx,
    external_id: String,
    record: PublicationRecord,
}

impl PendingDisclosure {
    pub fn source(&self) -> &Source {
        &self.record.source
    }

    /// Flag the record as used and release the lock.
    pub async fn complete(mut self) -> Result<()> {
        self.record.used = true;
        self.tx.put(&self.external_id, &self.record).await?;
        self.tx.commit().await?;

        debug!(external_id = %self.external_id, "Marked publication as answered");
        Ok(())
    }
}

#[derive(Clone)]
pub struct PublicationLedger {
    store: Store,
}

impl PublicationLedger {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Record that `external_id` was published with `source`.
    ///
    /// Append-only: an id that is already recorded is rejected with
    /// [`LedgerError::AlreadyRecorded`] and the existing record is kept.
    pub async fn record(&self, external_id: &str, source: &Source) -> Result<()> {
        let record = PublicationRecord::new(source.clone());

        if !self
            .store
            .insert_new(LEDGER_COLLECTION, external_id, &record)
            .await?
        {
            return Err(LedgerError::AlreadyRecorded(external_id.to_string()).into());
        }

        debug!(external_id = %external_id, source = %source, "Recorded publication");
        Ok(())
    }

    pub async fn lookup(&self, external_id: &str) -> Result<Option<PublicationRecord>> {
        Ok(self.store.get(LEDGER_COLLECTION, external_id).await?)
    }

    /// Flag the source of `external_id` as disclosed.
    ///
    /// Safe to repeat: a record that is already used is left untouched.
    pub async fn mark_used(&self, external_id: &str) -> Result<MarkOutcome> {
        let mut tx = self.store.transaction(LEDGER_COLLECTION).await?;

        let Some(mut record) = tx.get::<PublicationRecord>(external_id).await? else {
            return Err(LedgerError::UnknownId(external_id.to_string()).into());
        };

        if record.used {
            return Ok(MarkOutcome::AlreadyUsed);
        }

        record.used = true;
        tx.put(external_id, &record).await?;
        tx.commit().await?;

        debug!(external_id = %external_id, "Marked publication as answered");
        Ok(MarkOutcome::Marked)
    }

    /// Take the ledger lock and check whether the source of `external_id`
    /// may still be sent.
    ///
    /// While the returned claim is pending no other disclosure can read the
    /// record, so two listeners never both see it unused.
    pub async fn begin_disclosure(&self, external_id: &str) -> Result<Disclosure> {
        let mut tx = self.store.transaction(LEDGER_COLLECTION).await?;

        let Some(record) = tx.get::<PublicationRecord>(external_id).await? else {
            return Ok(Disclosure::Unknown);
        };

        if record.used {
            return Ok(Disclosure::AlreadyDisclosed);
        }

        Ok(Disclosure::Pending(PendingDisclosure {
            tx,
            external_id: external_id.to_string(),
            record,
        }))
    }

    /// Ids of every recorded publication.
    pub async fn ids(&self) -> Result<Vec<String>> {
        Ok(self.store.list_keys(LEDGER_COLLECTION).await?)
    }
}
