use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, LoaderTrait,
    ModelTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, info, instrument};

use crate::{
    db::DbPool,
    entities::{maintenance, maintenance_technician, order, sale, sale_article},
    errors::ServiceError,
    services::{clients, ensure_range, non_empty, stage},
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderInput {
    /// Defaults to the current time
    pub opened_at: Option<DateTime<Utc>>,
    pub client_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrderInput {
    pub opened_at: Option<DateTime<Utc>>,
    pub client_id: Option<i64>,
}

/// An order with the maintenance jobs and sales it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: order::Model,
    pub maintenance: Vec<maintenance::Model>,
    pub sales: Vec<sale::Model>,
}

impl OrderDetails {
    pub fn kind(&self) -> Option<OrderKind> {
        match (self.maintenance.is_empty(), self.sales.is_empty()) {
            (true, false) => Some(OrderKind::SalesOnly),
            (false, true) => Some(OrderKind::MaintenanceOnly),
            (false, false) => Some(OrderKind::MaintenanceWithSales),
            (true, true) => None,
        }
    }
}

/// Classification of an order by what it contains. Empty orders have none.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OrderKind {
    SalesOnly,
    MaintenanceOnly,
    MaintenanceWithSales,
}

pub(crate) async fn require<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
) -> Result<order::Model, ServiceError> {
    order::Entity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} does not exist", order_id)))
}

async fn with_children<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<order::Model>,
) -> Result<Vec<OrderDetails>, ServiceError> {
    let jobs = orders
        .load_many(
            maintenance::Entity::find().order_by_asc(maintenance::Column::Id),
            conn,
        )
        .await?;
    let sales = orders
        .load_many(sale::Entity::find().order_by_asc(sale::Column::Id), conn)
        .await?;

    Ok(orders
        .into_iter()
        .zip(jobs)
        .zip(sales)
        .map(|((order, maintenance), sales)| OrderDetails {
            order,
            maintenance,
            sales,
        })
        .collect())
}

/// Service for managing orders
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Opens an order for an existing client
    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateOrderInput) -> Result<order::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        clients::require(&txn, input.client_id).await?;

        let created = order::ActiveModel {
            opened_at: Set(input.opened_at.unwrap_or_else(Utc::now)),
            client_id: Set(input.client_id),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            ServiceError::from_write(e, format!("Client {} does not exist", input.client_id))
        })?;

        txn.commit().await?;
        info!(order_id = created.id, client_id = created.client_id, "order created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, order_id: i32) -> Result<OrderDetails, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let order = require(&txn, order_id).await?;
        let mut details = with_children(&txn, vec![order]).await?;
        txn.commit().await?;
        details
            .pop()
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} does not exist", order_id)))
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<OrderDetails>, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let orders = order::Entity::find()
            .order_by_asc(order::Column::Id)
            .all(&txn)
            .await?;
        let details = with_children(&txn, orders).await?;
        txn.commit().await?;
        non_empty(details, || "No orders found".to_string())
    }

    /// Orders of the given kind
    #[instrument(skip(self))]
    pub async fn list_by_kind(&self, kind: OrderKind) -> Result<Vec<OrderDetails>, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let orders = order::Entity::find()
            .order_by_asc(order::Column::Id)
            .all(&txn)
            .await?;
        let details = with_children(&txn, orders).await?;
        txn.commit().await?;

        let matching = details
            .into_iter()
            .filter(|d| d.kind() == Some(kind))
            .collect();
        non_empty(matching, || format!("No orders of kind {}", kind))
    }

    /// Orders opened within `[start, end]`
    #[instrument(skip(self))]
    pub async fn list_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<OrderDetails>, ServiceError> {
        ensure_range(start, end)?;
        let txn = self.db_pool.begin().await?;
        let orders = order::Entity::find()
            .filter(order::Column::OpenedAt.between(start, end))
            .order_by_asc(order::Column::Id)
            .all(&txn)
            .await?;
        let details = with_children(&txn, orders).await?;
        txn.commit().await?;
        non_empty(details, || "No orders in that date range".to_string())
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        order_id: i32,
        input: UpdateOrderInput,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let current = require(&txn, order_id).await?;

        if let Some(client_id) = input.client_id.filter(|id| *id != current.client_id) {
            clients::require(&txn, client_id).await?;
        }

        let mut active = current.clone().into_active_model();
        let mut changed = false;
        changed |= stage(input.opened_at, &current.opened_at, |v| {
            active.opened_at = Set(v)
        });
        changed |= stage(input.client_id, &current.client_id, |v| {
            active.client_id = Set(v)
        });

        if !changed {
            debug!(order_id, "update carried no changes");
            return Ok(current);
        }

        let updated = active.update(&txn).await?;
        txn.commit().await?;
        info!(order_id, client_id = updated.client_id, "order updated");
        Ok(updated)
    }

    /// Deletes an order together with its maintenance jobs, sales and their
    /// association rows
    #[instrument(skip(self))]
    pub async fn delete(&self, order_id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let order = require(&txn, order_id).await?;

        let job_ids: Vec<i32> = order
            .find_related(maintenance::Entity)
            .all(&txn)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();
        let sale_ids: Vec<i32> = order
            .find_related(sale::Entity)
            .all(&txn)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        let assignments = maintenance_technician::Entity::delete_many()
            .filter(maintenance_technician::Column::MaintenanceId.is_in(job_ids.clone()))
            .exec(&txn)
            .await?
            .rows_affected;
        let lines = sale_article::Entity::delete_many()
            .filter(sale_article::Column::SaleId.is_in(sale_ids.clone()))
            .exec(&txn)
            .await?
            .rows_affected;
        maintenance::Entity::delete_many()
            .filter(maintenance::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        sale::Entity::delete_many()
            .filter(sale::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        order.delete(&txn).await?;

        txn.commit().await?;
        info!(
            order_id,
            maintenance = job_ids.len(),
            sales = sale_ids.len(),
            assignments,
            lines,
            "order deleted"
        );
        Ok(())
    }
}
