//! Articles sold on a sale.
//!
//! Each row is keyed by `(sale_id, article_id)` and stores the quantity and
//! the line price frozen when the row was written. The frozen price only
//! changes when the quantity changes without an explicit override, or when
//! the caller supplies an override.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel, ModelTrait, Set,
    TransactionTrait,
};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::{
    db::DbPool,
    entities::sale_article,
    errors::ServiceError,
    services::{
        articles, pricing, sales,
        sales::{SaleLine, SaleService},
    },
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AssignArticleInput {
    pub sale_id: i32,
    pub article_id: i32,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

/// Partial update of a line. Changing `sale_id` or `article_id` moves the
/// line to a new key.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSaleArticleInput {
    pub sale_id: Option<i32>,
    pub article_id: Option<i32>,
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    pub recorded_price: Option<f64>,
}

impl UpdateSaleArticleInput {
    fn is_empty(&self) -> bool {
        self.sale_id.is_none()
            && self.article_id.is_none()
            && self.quantity.is_none()
            && self.recorded_price.is_none()
    }
}

async fn find_line<C: ConnectionTrait>(
    conn: &C,
    sale_id: i32,
    article_id: i32,
) -> Result<Option<sale_article::Model>, ServiceError> {
    Ok(sale_article::Entity::find_by_id((sale_id, article_id))
        .one(conn)
        .await?)
}

fn duplicate(sale_id: i32, article_id: i32) -> ServiceError {
    ServiceError::Conflict(format!(
        "Article {} is already on sale {}",
        article_id, sale_id
    ))
}

fn missing(sale_id: i32, article_id: i32) -> ServiceError {
    ServiceError::NotFound(format!(
        "Article {} is not on sale {}",
        article_id, sale_id
    ))
}

fn classify_insert(err: DbErr, sale_id: i32, article_id: i32) -> ServiceError {
    match ServiceError::from_write(
        err,
        format!("Sale {} or article {} does not exist", sale_id, article_id),
    ) {
        ServiceError::Conflict(_) => duplicate(sale_id, article_id),
        other => other,
    }
}

/// Service for sale lines
#[derive(Clone)]
pub struct SaleArticleService {
    db_pool: Arc<DbPool>,
}

impl SaleArticleService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Adds an in-stock article to a sale, freezing its line price
    #[instrument(skip(self))]
    pub async fn assign(
        &self,
        input: AssignArticleInput,
    ) -> Result<sale_article::Model, ServiceError> {
        input.validate()?;
        let AssignArticleInput {
            sale_id,
            article_id,
            quantity,
        } = input;

        let txn = self.db_pool.begin().await?;
        sales::require(&txn, sale_id).await?;
        let article = articles::require(&txn, article_id).await?;
        articles::ensure_in_stock(&article)?;

        if find_line(&txn, sale_id, article_id).await?.is_some() {
            warn!(sale_id, article_id, "sale line already exists");
            return Err(duplicate(sale_id, article_id));
        }

        let recorded_price = pricing::compute_price(article.price, quantity)?;
        let created = sale_article::ActiveModel {
            sale_id: Set(sale_id),
            article_id: Set(article_id),
            quantity: Set(quantity),
            recorded_price: Set(recorded_price),
        }
        .insert(&txn)
        .await
        .map_err(|e| classify_insert(e, sale_id, article_id))?;

        txn.commit().await?;
        info!(sale_id, article_id, quantity, recorded_price, "article added to sale");
        Ok(created)
    }

    /// Articles on a sale with quantities and frozen prices
    #[instrument(skip(self))]
    pub async fn list(&self, sale_id: i32) -> Result<Vec<SaleLine>, ServiceError> {
        SaleService::new(self.db_pool.clone())
            .list_articles(sale_id)
            .await
    }

    /// Updates a line in place, or moves it to a new `(sale, article)` key
    #[instrument(skip(self))]
    pub async fn reassign(
        &self,
        sale_id: i32,
        article_id: i32,
        input: UpdateSaleArticleInput,
    ) -> Result<sale_article::Model, ServiceError> {
        input.validate()?;
        let txn = self.db_pool.begin().await?;
        let current = find_line(&txn, sale_id, article_id)
            .await?
            .ok_or_else(|| missing(sale_id, article_id))?;

        if input.is_empty() {
            return Ok(current);
        }

        let new_sale_id = input.sale_id.unwrap_or(sale_id);
        let new_article_id = input.article_id.unwrap_or(article_id);

        if (new_sale_id, new_article_id) == (sale_id, article_id) {
            let mut active = current.clone().into_active_model();
            let mut changed = false;

            if let Some(quantity) = input.quantity.filter(|q| *q != current.quantity) {
                active.quantity = Set(quantity);
                changed = true;
                if input.recorded_price.is_none() {
                    let article = articles::require(&txn, article_id).await?;
                    active.recorded_price = Set(pricing::compute_price(article.price, quantity)?);
                }
            }
            if let Some(price) = input.recorded_price.filter(|p| *p != current.recorded_price) {
                active.recorded_price = Set(price);
                changed = true;
            }

            if !changed {
                debug!(sale_id, article_id, "update carried no changes");
                return Ok(current);
            }

            let updated = active.update(&txn).await?;
            txn.commit().await?;
            info!(
                sale_id,
                article_id,
                quantity = updated.quantity,
                recorded_price = updated.recorded_price,
                "sale line updated"
            );
            return Ok(updated);
        }

        if find_line(&txn, new_sale_id, new_article_id).await?.is_some() {
            warn!(new_sale_id, new_article_id, "target sale line exists");
            return Err(duplicate(new_sale_id, new_article_id));
        }
        sales::require(&txn, new_sale_id).await?;
        let new_article = articles::require(&txn, new_article_id).await?;
        articles::ensure_in_stock(&new_article)?;

        let quantity = input.quantity.unwrap_or(current.quantity);
        let recorded_price =
            pricing::resolve_price(input.recorded_price, new_article.price, quantity)?;

        current.delete(&txn).await?;
        let moved = sale_article::ActiveModel {
            sale_id: Set(new_sale_id),
            article_id: Set(new_article_id),
            quantity: Set(quantity),
            recorded_price: Set(recorded_price),
        }
        .insert(&txn)
        .await
        .map_err(|e| classify_insert(e, new_sale_id, new_article_id))?;

        txn.commit().await?;
        info!(
            sale_id,
            article_id, new_sale_id, new_article_id, quantity, recorded_price, "sale line moved"
        );
        Ok(moved)
    }

    /// Removes a line from a sale
    #[instrument(skip(self))]
    pub async fn remove(&self, sale_id: i32, article_id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let line = find_line(&txn, sale_id, article_id)
            .await?
            .ok_or_else(|| missing(sale_id, article_id))?;

        line.delete(&txn).await?;
        txn.commit().await?;
        info!(sale_id, article_id, "article removed from sale");
        Ok(())
    }
}
