//! Technician assignments on maintenance jobs.
//!
//! Rows are keyed by `(maintenance_id, technician_id)` and carry no payload.
//! Reassignment swaps the technician side of the key: every precondition is
//! checked first, then the old row is deleted and the new one inserted inside
//! the same transaction.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, ModelTrait, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    db::DbPool,
    entities::{maintenance_technician, technician},
    errors::ServiceError,
    services::{maintenance, non_empty, technicians},
};

#[derive(Debug, Clone, Deserialize)]
pub struct ReassignTechnicianInput {
    pub new_technician_id: i32,
}

/// A technician assigned to a maintenance job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignedTechnician {
    pub maintenance_id: i32,
    #[serde(flatten)]
    pub technician: technician::Model,
}

async fn find_assignment<C: ConnectionTrait>(
    conn: &C,
    maintenance_id: i32,
    technician_id: i32,
) -> Result<Option<maintenance_technician::Model>, ServiceError> {
    Ok(
        maintenance_technician::Entity::find_by_id((maintenance_id, technician_id))
            .one(conn)
            .await?,
    )
}

fn duplicate(maintenance_id: i32, technician_id: i32) -> ServiceError {
    ServiceError::Conflict(format!(
        "Technician {} is already assigned to maintenance {}",
        technician_id, maintenance_id
    ))
}

fn missing(maintenance_id: i32, technician_id: i32) -> ServiceError {
    ServiceError::NotFound(format!(
        "Technician {} is not assigned to maintenance {}",
        technician_id, maintenance_id
    ))
}

/// A lost race on the composite key reports the same conflict as the
/// pre-check.
fn classify_insert(err: DbErr, maintenance_id: i32, technician_id: i32) -> ServiceError {
    match ServiceError::from_write(
        err,
        format!(
            "Maintenance {} or technician {} does not exist",
            maintenance_id, technician_id
        ),
    ) {
        ServiceError::Conflict(_) => duplicate(maintenance_id, technician_id),
        other => other,
    }
}

/// Service for technician assignments
#[derive(Clone)]
pub struct MaintenanceTechnicianService {
    db_pool: Arc<DbPool>,
}

impl MaintenanceTechnicianService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Assigns a technician to a maintenance job
    #[instrument(skip(self))]
    pub async fn assign(
        &self,
        maintenance_id: i32,
        technician_id: i32,
    ) -> Result<maintenance_technician::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        maintenance::require(&txn, maintenance_id).await?;
        technicians::require(&txn, technician_id).await?;

        if find_assignment(&txn, maintenance_id, technician_id)
            .await?
            .is_some()
        {
            warn!(maintenance_id, technician_id, "assignment already exists");
            return Err(duplicate(maintenance_id, technician_id));
        }

        let created = maintenance_technician::ActiveModel {
            maintenance_id: Set(maintenance_id),
            technician_id: Set(technician_id),
        }
        .insert(&txn)
        .await
        .map_err(|e| classify_insert(e, maintenance_id, technician_id))?;

        txn.commit().await?;
        info!(maintenance_id, technician_id, "technician assigned");
        Ok(created)
    }

    /// Technicians assigned to a maintenance job
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        maintenance_id: i32,
    ) -> Result<Vec<AssignedTechnician>, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let job = maintenance::require(&txn, maintenance_id).await?;
        let rows = job
            .find_related(maintenance_technician::Entity)
            .find_also_related(technician::Entity)
            .order_by_asc(maintenance_technician::Column::TechnicianId)
            .all(&txn)
            .await?;
        txn.commit().await?;

        let assigned = rows
            .into_iter()
            .filter_map(|(row, technician)| {
                technician.map(|technician| AssignedTechnician {
                    maintenance_id: row.maintenance_id,
                    technician,
                })
            })
            .collect();
        non_empty(assigned, || {
            format!("Maintenance {} has no technicians assigned", maintenance_id)
        })
    }

    /// Moves an assignment from `old_technician_id` to another technician
    #[instrument(skip(self))]
    pub async fn reassign(
        &self,
        maintenance_id: i32,
        old_technician_id: i32,
        input: ReassignTechnicianInput,
    ) -> Result<maintenance_technician::Model, ServiceError> {
        let new_technician_id = input.new_technician_id;
        let txn = self.db_pool.begin().await?;

        maintenance::require(&txn, maintenance_id).await?;
        let existing = find_assignment(&txn, maintenance_id, old_technician_id)
            .await?
            .ok_or_else(|| missing(maintenance_id, old_technician_id))?;
        technicians::require(&txn, new_technician_id).await?;

        if old_technician_id == new_technician_id {
            debug!(maintenance_id, old_technician_id, "reassignment is a no-op");
            return Ok(existing);
        }

        if find_assignment(&txn, maintenance_id, new_technician_id)
            .await?
            .is_some()
        {
            warn!(maintenance_id, new_technician_id, "target assignment exists");
            return Err(duplicate(maintenance_id, new_technician_id));
        }

        existing.delete(&txn).await?;
        let created = maintenance_technician::ActiveModel {
            maintenance_id: Set(maintenance_id),
            technician_id: Set(new_technician_id),
        }
        .insert(&txn)
        .await
        .map_err(|e| classify_insert(e, maintenance_id, new_technician_id))?;

        txn.commit().await?;
        info!(
            maintenance_id,
            old_technician_id, new_technician_id, "technician reassigned"
        );
        Ok(created)
    }

    /// Removes an assignment
    #[instrument(skip(self))]
    pub async fn remove(&self, maintenance_id: i32, technician_id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let existing = find_assignment(&txn, maintenance_id, technician_id)
            .await?
            .ok_or_else(|| missing(maintenance_id, technician_id))?;

        existing.delete(&txn).await?;
        txn.commit().await?;
        info!(maintenance_id, technician_id, "technician unassigned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, db};
    use assert_matches::assert_matches;

    async fn bare_pool() -> DbPool {
        let mut cfg = AppConfig::new("sqlite::memory:".into(), "test".into());
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.auto_migrate = true;
        db::connect(&cfg).await.unwrap()
    }

    fn row(maintenance_id: i32, technician_id: i32) -> maintenance_technician::ActiveModel {
        maintenance_technician::ActiveModel {
            maintenance_id: Set(maintenance_id),
            technician_id: Set(technician_id),
        }
    }

    #[tokio::test]
    async fn insert_failures_map_to_assignment_errors() {
        let pool = bare_pool().await;

        let err = row(1, 2).insert(&pool).await.unwrap_err();
        assert_matches!(classify_insert(err, 1, 2), ServiceError::NotFound(msg)
            if msg == "Maintenance 1 or technician 2 does not exist");

        pool.execute_unprepared("PRAGMA foreign_keys = OFF")
            .await
            .unwrap();
        row(1, 2).insert(&pool).await.unwrap();
        let err = row(1, 2).insert(&pool).await.unwrap_err();
        assert_matches!(classify_insert(err, 1, 2), ServiceError::Conflict(msg)
            if msg == "Technician 2 is already assigned to maintenance 1");
    }
}
