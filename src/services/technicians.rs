use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait, PaginatorTrait,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use strum::{Display, EnumString};
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{maintenance, maintenance_technician, technician},
    errors::ServiceError,
    services::{
        non_empty,
        search::{self, Page, SearchLimits, SearchParams, Searchable},
        stage,
    },
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTechnicianInput {
    pub id: i32,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub surname: String,
    #[validate(length(min = 1))]
    pub specialty: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTechnicianInput {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub surname: Option<String>,
    #[validate(length(min = 1))]
    pub specialty: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TechnicianSortField {
    Name,
    #[default]
    Surname,
    Specialty,
}

impl Searchable for technician::Model {
    type SortField = TechnicianSortField;

    fn search_text(&self) -> Vec<&str> {
        vec![&self.name, &self.surname, &self.specialty]
    }

    fn sort_text(&self, field: TechnicianSortField) -> &str {
        match field {
            TechnicianSortField::Name => &self.name,
            TechnicianSortField::Surname => &self.surname,
            TechnicianSortField::Specialty => &self.specialty,
        }
    }
}

pub(crate) async fn require<C: ConnectionTrait>(
    conn: &C,
    technician_id: i32,
) -> Result<technician::Model, ServiceError> {
    technician::Entity::find_by_id(technician_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Technician {} does not exist", technician_id))
        })
}

/// Service for managing technicians
#[derive(Clone)]
pub struct TechnicianService {
    db_pool: Arc<DbPool>,
    limits: SearchLimits,
}

impl TechnicianService {
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

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        input: CreateTechnicianInput,
    ) -> Result<technician::Model, ServiceError> {
        input.validate()?;
        let txn = self.db_pool.begin().await?;

        let technician_id = input.id;
        if technician::Entity::find_by_id(technician_id)
            .one(&txn)
            .await?
            .is_some()
        {
            warn!(technician_id, "technician already exists");
            return Err(ServiceError::Conflict(format!(
                "Technician {} already exists",
                technician_id
            )));
        }

        let created = technician::ActiveModel {
            id: Set(input.id),
            name: Set(input.name),
            surname: Set(input.surname),
            specialty: Set(input.specialty),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            ServiceError::from_write(e, format!("Technician {} already exists", technician_id))
        })?;

        txn.commit().await?;
        info!(technician_id, "technician created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, technician_id: i32) -> Result<technician::Model, ServiceError> {
        require(&*self.db_pool, technician_id).await
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<technician::Model>, ServiceError> {
        let technicians = technician::Entity::find()
            .order_by_asc(technician::Column::Id)
            .all(&*self.db_pool)
            .await?;
        non_empty(technicians, || "No technicians found".to_string())
    }

    /// Searches technicians by name, surname or specialty
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        params: SearchParams<TechnicianSortField>,
    ) -> Result<Page<technician::Model>, ServiceError> {
        let snapshot = technician::Entity::find()
            .order_by_asc(technician::Column::Id)
            .all(&*self.db_pool)
            .await?;
        Ok(search::search(snapshot, &params, &self.limits))
    }

    /// Maintenance jobs the technician is assigned to
    #[instrument(skip(self))]
    pub async fn list_maintenance(
        &self,
        technician_id: i32,
    ) -> Result<Vec<maintenance::Model>, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let technician = require(&txn, technician_id).await?;
        let jobs = technician
            .find_related(maintenance::Entity)
            .order_by_asc(maintenance::Column::Id)
            .all(&txn)
            .await?;
        txn.commit().await?;
        non_empty(jobs, || {
            format!("Technician {} is not assigned to any maintenance", technician_id)
        })
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        technician_id: i32,
        input: UpdateTechnicianInput,
    ) -> Result<technician::Model, ServiceError> {
        input.validate()?;
        let txn = self.db_pool.begin().await?;
        let current = require(&txn, technician_id).await?;

        let mut active = current.clone().into_active_model();
        let mut changed = false;
        changed |= stage(input.name, &current.name, |v| active.name = Set(v));
        changed |= stage(input.surname, &current.surname, |v| active.surname = Set(v));
        changed |= stage(input.specialty, &current.specialty, |v| {
            active.specialty = Set(v)
        });

        if !changed {
            debug!(technician_id, "update carried no changes");
            return Ok(current);
        }

        let updated = active.update(&txn).await?;
        txn.commit().await?;
        info!(technician_id, "technician updated");
        Ok(updated)
    }

    /// Deletes a technician with no maintenance assignments
    #[instrument(skip(self))]
    pub async fn delete(&self, technician_id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let technician = require(&txn, technician_id).await?;

        let assignments = technician
            .find_related(maintenance_technician::Entity)
            .count(&txn)
            .await?;
        if assignments > 0 {
            warn!(technician_id, assignments, "technician still assigned");
            return Err(ServiceError::Conflict(format!(
                "Technician {} is still assigned to {} maintenance job(s)",
                technician_id, assignments
            )));
        }

        technician.delete(&txn).await?;
        txn.commit().await?;
        info!(technician_id, "technician deleted");
        Ok(())
    }
}
