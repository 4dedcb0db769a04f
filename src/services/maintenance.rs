use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, IntoActiveModel,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use strum::{Display, EnumString};
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        maintenance::{self, MaintenanceKind},
        maintenance_technician, technician,
    },
    errors::ServiceError,
    services::{
        ensure_range, non_empty, orders,
        search::{self, Page, SearchLimits, SearchParams, Searchable},
        stage,
    },
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMaintenanceInput {
    pub kind: MaintenanceKind,
    #[validate(length(min = 1))]
    pub description: String,
    pub opened_at: DateTime<Utc>,
    #[validate(range(min = 0.0))]
    pub price: f64,
    pub order_id: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateMaintenanceInput {
    pub order_id: Option<i32>,
    pub kind: Option<MaintenanceKind>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MaintenanceSortField {
    #[default]
    Description,
}

impl Searchable for maintenance::Model {
    type SortField = MaintenanceSortField;

    fn search_text(&self) -> Vec<&str> {
        vec![&self.description]
    }

    fn sort_text(&self, field: MaintenanceSortField) -> &str {
        match field {
            MaintenanceSortField::Description => &self.description,
        }
    }
}

pub(crate) async fn require<C: ConnectionTrait>(
    conn: &C,
    maintenance_id: i32,
) -> Result<maintenance::Model, ServiceError> {
    maintenance::Entity::find_by_id(maintenance_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Maintenance {} does not exist", maintenance_id))
        })
}

/// Service for managing maintenance jobs
#[derive(Clone)]
pub struct MaintenanceService {
    db_pool: Arc<DbPool>,
    limits: SearchLimits,
}

impl MaintenanceService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            db_pool,
            limits: SearchLimits::default(),
        }
    }

    pub fn with_search_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Opens a maintenance job on an existing order
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        input: CreateMaintenanceInput,
    ) -> Result<maintenance::Model, ServiceError> {
        input.validate()?;
        let txn = self.db_pool.begin().await?;
        orders::require(&txn, input.order_id).await?;

        let order_id = input.order_id;
        let created = maintenance::ActiveModel {
            kind: Set(input.kind),
            description: Set(input.description),
            opened_at: Set(input.opened_at),
            closed_at: Set(None),
            price: Set(input.price),
            order_id: Set(input.order_id),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            ServiceError::from_write(e, format!("Order {} does not exist", order_id))
        })?;

        txn.commit().await?;
        info!(maintenance_id = created.id, order_id, "maintenance created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, maintenance_id: i32) -> Result<maintenance::Model, ServiceError> {
        require(&*self.db_pool, maintenance_id).await
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<maintenance::Model>, ServiceError> {
        let jobs = maintenance::Entity::find()
            .order_by_asc(maintenance::Column::Id)
            .all(&*self.db_pool)
            .await?;
        non_empty(jobs, || "No maintenance jobs found".to_string())
    }

    /// Searches maintenance jobs by description
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        params: SearchParams<MaintenanceSortField>,
    ) -> Result<Page<maintenance::Model>, ServiceError> {
        let snapshot = maintenance::Entity::find()
            .order_by_asc(maintenance::Column::Id)
            .all(&*self.db_pool)
            .await?;
        Ok(search::search(snapshot, &params, &self.limits))
    }

    #[instrument(skip(self))]
    pub async fn list_by_kind(
        &self,
        kind: MaintenanceKind,
    ) -> Result<Vec<maintenance::Model>, ServiceError> {
        let jobs = maintenance::Entity::find()
            .filter(maintenance::Column::Kind.eq(kind))
            .order_by_asc(maintenance::Column::Id)
            .all(&*self.db_pool)
            .await?;
        non_empty(jobs, || format!("No {} maintenance jobs found", kind))
    }

    /// Maintenance jobs belonging to an order
    #[instrument(skip(self))]
    pub async fn list_for_order(
        &self,
        order_id: i32,
    ) -> Result<Vec<maintenance::Model>, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let order = orders::require(&txn, order_id).await?;
        let jobs = order
            .find_related(maintenance::Entity)
            .order_by_asc(maintenance::Column::Id)
            .all(&txn)
            .await?;
        txn.commit().await?;
        non_empty(jobs, || format!("Order {} has no maintenance jobs", order_id))
    }

    /// Jobs opened or closed within `[start, end]`
    #[instrument(skip(self))]
    pub async fn list_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<maintenance::Model>, ServiceError> {
        ensure_range(start, end)?;
        let jobs = maintenance::Entity::find()
            .filter(
                Condition::any()
                    .add(maintenance::Column::OpenedAt.between(start, end))
                    .add(maintenance::Column::ClosedAt.between(start, end)),
            )
            .order_by_asc(maintenance::Column::Id)
            .all(&*self.db_pool)
            .await?;
        non_empty(jobs, || "No maintenance jobs in that date range".to_string())
    }

    /// Technicians assigned to a maintenance job
    #[instrument(skip(self))]
    pub async fn list_technicians(
        &self,
        maintenance_id: i32,
    ) -> Result<Vec<technician::Model>, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let job = require(&txn, maintenance_id).await?;
        let technicians = job
            .find_related(technician::Entity)
            .order_by_asc(technician::Column::Id)
            .all(&txn)
            .await?;
        txn.commit().await?;
        non_empty(technicians, || {
            format!("Maintenance {} has no technicians assigned", maintenance_id)
        })
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        maintenance_id: i32,
        input: UpdateMaintenanceInput,
    ) -> Result<maintenance::Model, ServiceError> {
        input.validate()?;
        let txn = self.db_pool.begin().await?;
        let current = require(&txn, maintenance_id).await?;

        if let Some(order_id) = input.order_id.filter(|id| *id != current.order_id) {
            orders::require(&txn, order_id).await?;
        }

        let mut active = current.clone().into_active_model();
        let mut changed = false;
        changed |= stage(input.order_id, &current.order_id, |v| {
            active.order_id = Set(v)
        });
        changed |= stage(input.kind, &current.kind, |v| active.kind = Set(v));
        changed |= stage(input.description, &current.description, |v| {
            active.description = Set(v)
        });
        changed |= stage(input.opened_at, &current.opened_at, |v| {
            active.opened_at = Set(v)
        });
        changed |= stage(input.closed_at.map(Some), &current.closed_at, |v| {
            active.closed_at = Set(v)
        });
        changed |= stage(input.price, &current.price, |v| active.price = Set(v));

        if !changed {
            debug!(maintenance_id, "update carried no changes");
            return Ok(current);
        }

        let updated = active.update(&txn).await?;
        txn.commit().await?;
        info!(maintenance_id, "maintenance updated");
        Ok(updated)
    }

    /// Deletes a job with no technicians assigned
    #[instrument(skip(self))]
    pub async fn delete(&self, maintenance_id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let job = require(&txn, maintenance_id).await?;

        let assignments = job
            .find_related(maintenance_technician::Entity)
            .count(&txn)
            .await?;
        if assignments > 0 {
            warn!(maintenance_id, assignments, "maintenance still has technicians");
            return Err(ServiceError::Conflict(format!(
                "Maintenance {} still has {} technician(s) assigned",
                maintenance_id, assignments
            )));
        }

        job.delete(&txn).await?;
        txn.commit().await?;
        info!(maintenance_id, "maintenance deleted");
        Ok(())
    }
}
