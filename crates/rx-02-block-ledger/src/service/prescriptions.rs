//! Prescription log backed by `prescriptions_v1`, newest record first.

use super::persistence;
use crate::domain::entities::{Prescription, PrescriptionId};
use crate::domain::errors::LedgerError;
use crate::domain::value_objects::LedgerConfig;
use crate::ports::inbound::PrescriptionLogApi;
use crate::ports::outbound::KeyValueStore;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
struct Records {
    items: Vec<Prescription>,
    unreadable: Vec<serde_json::Value>,
}

impl Records {
    fn decode(bytes: Option<&[u8]>, key: &str) -> Result<Self, LedgerError> {
        let mut records = Self::default();
        let Some(bytes) = bytes else {
            return Ok(records);
        };
        let values: Vec<serde_json::Value> =
            serde_json::from_slice(bytes).map_err(|e| LedgerError::LedgerCorruption {
                scope: key.to_string(),
                reason: format!("not a JSON array of prescriptions: {}", e),
            })?;

        for value in values {
            match serde_json::from_value::<Prescription>(value.clone()) {
                Ok(p) => records.items.push(p),
                Err(e) => {
                    tracing::warn!("[rx-02] Unreadable record in {} kept as-is: {}", key, e);
                    records.unreadable.push(value);
                }
            }
        }
        Ok(records)
    }

    fn encode(&self) -> Result<Vec<u8>, LedgerError> {
        let mut values = Vec::with_capacity(self.items.len() + self.unreadable.len());
        for p in &self.items {
            values.push(serde_json::to_value(p)?);
        }
        values.extend(self.unreadable.iter().cloned());
        Ok(serde_json::to_vec(&values)?)
    }
}

/// Persisted history of issued prescriptions.
pub struct PrescriptionLog<KV: KeyValueStore> {
    kv: Arc<KV>,
    config: LedgerConfig,
    records: RwLock<Records>,
}

impl<KV: KeyValueStore> PrescriptionLog<KV> {
    /// Load the log from storage.
    pub async fn open(kv: Arc<KV>, config: LedgerConfig) -> Result<Self, LedgerError> {
        let bytes = persistence::load(kv.as_ref(), &config.prescriptions_key, &config).await?;
        let records = Records::decode(bytes.as_deref(), &config.prescriptions_key)?;
        tracing::info!(
            records = records.items.len(),
            "[rx-02] Prescription log loaded from {}",
            config.prescriptions_key
        );
        Ok(Self {
            kv,
            config,
            records: RwLock::new(records),
        })
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.records.read().await.items.len()
    }

    /// True when nothing has been issued.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Records issued on `date` (UTC).
    pub async fn issued_on(&self, date: NaiveDate) -> usize {
        self.records
            .read()
            .await
            .items
            .iter()
            .filter(|p| p.issued_at.date_naive() == date)
            .count()
    }
}

#[async_trait]
impl<KV: KeyValueStore> PrescriptionLogApi for PrescriptionLog<KV> {
    async fn record(&self, prescription: Prescription) -> Result<(), LedgerError> {
        let mut records = self.records.write().await;
        let mut next = records.clone();
        let id = prescription.id.clone();
        next.items.insert(0, prescription);

        let bytes = next.encode()?;
        persistence::store(
            self.kv.as_ref(),
            &self.config.prescriptions_key,
            &bytes,
            &self.config,
        )
        .await?;

        *records = next;
        tracing::debug!(prescription_id = %id, "[rx-02] Prescription recorded");
        Ok(())
    }

    async fn get(&self, id: &PrescriptionId) -> Result<Prescription, LedgerError> {
        self.records
            .read()
            .await
            .items
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| LedgerError::PrescriptionNotFound { id: id.clone() })
    }

    async fn list(&self) -> Vec<Prescription> {
        self.records.read().await.items.clone()
    }

    async fn search(&self, query: &str) -> Vec<Prescription> {
        let needle = query.trim().to_lowercase();
        let records = self.records.read().await;
        if needle.is_empty() {
            return records.items.clone();
        }
        records
            .items
            .iter()
            .filter(|p| {
                p.patient.patient_name.to_lowercase().contains(&needle)
                    || p.serial.to_lowercase().contains(&needle)
                    || p.patient.medication.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }
}
