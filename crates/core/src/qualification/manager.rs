//! Lookup, creation and assignment of qualifications.

use std::sync::Arc;

use tracing::{info, warn};

use crate::provider::ProviderError;

use super::{
    AssignmentFailure, AssignmentReport, NewQualification, QualificationBackend,
    QualificationRecord,
};

/// Manages qualification state on one marketplace.
pub struct QualificationStateManager {
    backend: Arc<dyn QualificationBackend>,
}

impl QualificationStateManager {
    pub fn new(backend: Arc<dyn QualificationBackend>) -> Self {
        Self { backend }
    }

    /// Find a qualification by exact name.
    ///
    /// The marketplace only offers fuzzy search, so the exact match is done
    /// here over the full listing.
    pub async fn lookup_by_name(
        &self,
        name: &str,
    ) -> Result<Option<QualificationRecord>, ProviderError> {
        let found = self
            .backend
            .list_qualification_types(name)
            .await?
            .into_iter()
            .find(|q| q.name == name);
        Ok(found)
    }

    /// Return the qualification called `name`, creating it if needed.
    pub async fn create_if_absent(
        &self,
        name: &str,
        description: &str,
        keywords: &[String],
    ) -> Result<QualificationRecord, ProviderError> {
        if let Some(existing) = self.lookup_by_name(name).await? {
            info!("Reusing qualification '{}' ({})", name, existing.id);
            return Ok(existing);
        }

        info!("No qualification exists for '{}', creating one", name);
        let created = self
            .backend
            .create_qualification_type(&NewQualification {
                name: name.to_string(),
                description: description.to_string(),
                keywords: keywords.to_vec(),
            })
            .await?;
        info!("Created qualification '{}' ({})", name, created.id);
        Ok(created)
    }

    /// Assign a qualification to each worker in turn.
    ///
    /// A failed assignment is recorded and the remaining workers are still
    /// processed.
    pub async fn assign_to_workers(
        &self,
        qualification_id: &str,
        worker_ids: &[String],
        notify: bool,
    ) -> AssignmentReport {
        let mut report = AssignmentReport {
            qualification_id: qualification_id.to_string(),
            ..AssignmentReport::default()
        };

        for worker in worker_ids {
            match self
                .backend
                .associate_with_worker(qualification_id, worker, notify)
                .await
            {
                Ok(()) => {
                    info!("Assigned qualification {} to {}", qualification_id, worker);
                    report.succeeded.push(worker.clone());
                }
                Err(e) => {
                    warn!(
                        "Failed to assign qualification {} to {}: {}",
                        qualification_id, worker, e
                    );
                    report.failed.push(AssignmentFailure {
                        worker_id: worker.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Create a one-off qualification and grant it to `workers`.
    ///
    /// Never reuses an existing record: `stamp` makes the name unique.
    pub async fn create_compensation_gate(
        &self,
        workers: &[String],
        stamp: &str,
    ) -> Result<(QualificationRecord, AssignmentReport), ProviderError> {
        let spec = NewQualification {
            name: format!("Compensation {}", stamp),
            description: format!(
                "Qualification for a compensation HIT for the following worker(s): {}",
                workers.join(",")
            ),
            keywords: std::iter::once("compensation".to_string())
                .chain(workers.iter().cloned())
                .collect(),
        };

        let mut record = self.backend.create_qualification_type(&spec).await?;
        info!("Created compensation qualification {}", record.id);

        let report = self.assign_to_workers(&record.id, workers, true).await;
        record
            .assigned_workers
            .extend(report.succeeded.iter().cloned());

        Ok((record, report))
    }
}
