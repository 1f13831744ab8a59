//! insoledger-store-memory
//!
//! Thread-safe in-memory implementation of the core `LedgerStore` trait.
//! Serves as the injected test double the engine design calls for, and as
//! a seeding-friendly backend for embedding callers.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use uuid::Uuid;

use insoledger_core::{CoreError, EntryFilter, LedgerStore};
use insoledger_domain::{
    AuditLogEntry, ClassificationRule, Counterparty, InsolvencyEffect, LedgerEntry,
};

#[derive(Default)]
struct Inner {
    entries: HashMap<Uuid, LedgerEntry>,
    rules: HashMap<Uuid, ClassificationRule>,
    effects: HashMap<Uuid, InsolvencyEffect>,
    counterparties: HashMap<Uuid, Counterparty>,
    audit: Vec<AuditLogEntry>,
}

/// In-memory ledger store. A single `RwLock` over the maps makes every
/// `update_entry` call atomic at single-entry granularity.
#[derive(Default)]
pub struct MemoryLedgerStore {
    inner: RwLock<Inner>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a classification rule.
    pub fn put_rule(&self, rule: ClassificationRule) -> Result<(), CoreError> {
        self.write()?.rules.insert(rule.id, rule);
        Ok(())
    }

    /// Inserts or replaces an insolvency effect; replacing is how tests and
    /// callers model editing an effect before re-transfer.
    pub fn put_effect(&self, effect: InsolvencyEffect) -> Result<(), CoreError> {
        self.write()?.effects.insert(effect.id, effect);
        Ok(())
    }

    pub fn put_counterparty(&self, counterparty: Counterparty) -> Result<(), CoreError> {
        self.write()?
            .counterparties
            .insert(counterparty.id, counterparty);
        Ok(())
    }

    pub fn entry_count(&self) -> Result<usize, CoreError> {
        Ok(self.read()?.entries.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, CoreError> {
        self.inner
            .read()
            .map_err(|_| CoreError::Storage("ledger store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, CoreError> {
        self.inner
            .write()
            .map_err(|_| CoreError::Storage("ledger store lock poisoned".into()))
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn insert_entry(&self, entry: LedgerEntry) -> Result<(), CoreError> {
        let mut inner = self.write()?;
        if inner.entries.contains_key(&entry.id) {
            return Err(CoreError::Storage(format!(
                "duplicate entry id {}",
                entry.id
            )));
        }
        inner.entries.insert(entry.id, entry);
        Ok(())
    }

    fn entry(&self, id: Uuid) -> Result<LedgerEntry, CoreError> {
        self.read()?
            .entries
            .get(&id)
            .cloned()
            .ok_or(CoreError::EntryNotFound(id))
    }

    fn entries(&self, case_id: Uuid, filter: &EntryFilter) -> Result<Vec<LedgerEntry>, CoreError> {
        let inner = self.read()?;
        let mut rows: Vec<LedgerEntry> = inner
            .entries
            .values()
            .filter(|entry| entry.case_id == case_id && filter.matches(entry))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.transaction_date
                .cmp(&b.transaction_date)
                .then(a.id.cmp(&b.id))
        });
        Ok(rows)
    }

    fn update_entry(
        &self,
        id: Uuid,
        apply: &mut dyn FnMut(&mut LedgerEntry),
    ) -> Result<LedgerEntry, CoreError> {
        let mut inner = self.write()?;
        let entry = inner
            .entries
            .get_mut(&id)
            .ok_or(CoreError::EntryNotFound(id))?;
        apply(entry);
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    fn delete_entry(&self, id: Uuid) -> Result<(), CoreError> {
        self.write()?
            .entries
            .remove(&id)
            .map(|_| ())
            .ok_or(CoreError::EntryNotFound(id))
    }

    fn entries_for_effect(&self, effect_id: Uuid) -> Result<Vec<LedgerEntry>, CoreError> {
        let inner = self.read()?;
        let mut rows: Vec<LedgerEntry> = inner
            .entries
            .values()
            .filter(|entry| entry.source_effect_id == Some(effect_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.transaction_date
                .cmp(&b.transaction_date)
                .then(a.id.cmp(&b.id))
        });
        Ok(rows)
    }

    fn rules(&self, case_id: Uuid) -> Result<Vec<ClassificationRule>, CoreError> {
        let inner = self.read()?;
        let mut rules: Vec<ClassificationRule> = inner
            .rules
            .values()
            .filter(|rule| rule.case_id == case_id)
            .cloned()
            .collect();
        rules.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.name.cmp(&b.name)));
        Ok(rules)
    }

    fn effect(&self, id: Uuid) -> Result<InsolvencyEffect, CoreError> {
        self.read()?
            .effects
            .get(&id)
            .cloned()
            .ok_or(CoreError::EffectNotFound(id))
    }

    fn counterparty(&self, id: Uuid) -> Result<Option<Counterparty>, CoreError> {
        Ok(self.read()?.counterparties.get(&id).cloned())
    }

    fn append_audit(&self, row: AuditLogEntry) -> Result<(), CoreError> {
        self.write()?.audit.push(row);
        Ok(())
    }

    fn audit_for_entry(&self, entry_id: Uuid) -> Result<Vec<AuditLogEntry>, CoreError> {
        let inner = self.read()?;
        let mut rows: Vec<AuditLogEntry> = inner
            .audit
            .iter()
            .filter(|row| row.entry_id == entry_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(rows)
    }

    fn audit_for_case(&self, case_id: Uuid) -> Result<Vec<AuditLogEntry>, CoreError> {
        let inner = self.read()?;
        let mut rows: Vec<AuditLogEntry> = inner
            .audit
            .iter()
            .filter(|row| row.case_id == case_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(rows)
    }
}
