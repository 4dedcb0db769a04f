use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    db::DbPool,
    entities::{article, sale, sale_article},
    errors::ServiceError,
    services::{ensure_range, non_empty, orders, stage},
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSaleInput {
    pub sold_at: DateTime<Utc>,
    pub order_id: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSaleInput {
    pub sold_at: Option<DateTime<Utc>>,
    pub order_id: Option<i32>,
}

/// An article on a sale, with the quantity and frozen line price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleLine {
    #[serde(flatten)]
    pub article: article::Model,
    pub quantity: i32,
    pub recorded_price: f64,
}

pub(crate) async fn require<C: ConnectionTrait>(
    conn: &C,
    sale_id: i32,
) -> Result<sale::Model, ServiceError> {
    sale::Entity::find_by_id(sale_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Sale {} does not exist", sale_id)))
}

/// Service for managing sales
#[derive(Clone)]
pub struct SaleService {
    db_pool: Arc<DbPool>,
}

impl SaleService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Records a sale on an existing order
    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateSaleInput) -> Result<sale::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        orders::require(&txn, input.order_id).await?;

        let order_id = input.order_id;
        let created = sale::ActiveModel {
            sold_at: Set(input.sold_at),
            order_id: Set(input.order_id),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            ServiceError::from_write(e, format!("Order {} does not exist", order_id))
        })?;

        txn.commit().await?;
        info!(sale_id = created.id, order_id, "sale created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, sale_id: i32) -> Result<sale::Model, ServiceError> {
        require(&*self.db_pool, sale_id).await
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<sale::Model>, ServiceError> {
        let sales = sale::Entity::find()
            .order_by_asc(sale::Column::Id)
            .all(&*self.db_pool)
            .await?;
        non_empty(sales, || "No sales found".to_string())
    }

    /// Sales dated within `[start, end]`
    #[instrument(skip(self))]
    pub async fn list_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<sale::Model>, ServiceError> {
        ensure_range(start, end)?;
        let sales = sale::Entity::find()
            .filter(sale::Column::SoldAt.between(start, end))
            .order_by_asc(sale::Column::Id)
            .all(&*self.db_pool)
            .await?;
        non_empty(sales, || "No sales in that date range".to_string())
    }

    /// Articles on a sale with their quantities and recorded prices
    #[instrument(skip(self))]
    pub async fn list_articles(&self, sale_id: i32) -> Result<Vec<SaleLine>, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let sale = require(&txn, sale_id).await?;

        let rows = sale
            .find_related(sale_article::Entity)
            .find_also_related(article::Entity)
            .order_by_asc(sale_article::Column::ArticleId)
            .all(&txn)
            .await?;
        txn.commit().await?;

        let lines = rows
            .into_iter()
            .filter_map(|(line, article)| {
                article.map(|article| SaleLine {
                    article,
                    quantity: line.quantity,
                    recorded_price: line.recorded_price,
                })
            })
            .collect();
        non_empty(lines, || format!("Sale {} has no articles", sale_id))
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        sale_id: i32,
        input: UpdateSaleInput,
    ) -> Result<sale::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let current = require(&txn, sale_id).await?;

        if let Some(order_id) = input.order_id.filter(|id| *id != current.order_id) {
            orders::require(&txn, order_id).await?;
        }

        let mut active = current.clone().into_active_model();
        let mut changed = false;
        changed |= stage(input.sold_at, &current.sold_at, |v| active.sold_at = Set(v));
        changed |= stage(input.order_id, &current.order_id, |v| {
            active.order_id = Set(v)
        });

        if !changed {
            debug!(sale_id, "update carried no changes");
            return Ok(current);
        }

        let updated = active.update(&txn).await?;
        txn.commit().await?;
        info!(sale_id, order_id = updated.order_id, "sale updated");
        Ok(updated)
    }

    /// Deletes a sale with no articles on it
    #[instrument(skip(self))]
    pub async fn delete(&self, sale_id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let sale = require(&txn, sale_id).await?;

        let lines = sale
            .find_related(sale_article::Entity)
            .count(&txn)
            .await?;
        if lines > 0 {
            warn!(sale_id, lines, "sale still has articles");
            return Err(ServiceError::Conflict(format!(
                "Sale {} still has {} article(s)",
                sale_id, lines
            )));
        }

        sale.delete(&txn).await?;
        txn.commit().await?;
        info!(sale_id, "sale deleted");
        Ok(())
    }
}
