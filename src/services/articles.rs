use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{article, sale, sale_article},
    errors::ServiceError,
    services::{
        non_empty,
        search::{self, Page, SearchLimits, SearchParams, Searchable},
        stage,
    },
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateArticleInput {
    pub id: i32,
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[serde(default)]
    pub in_stock: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateArticleInput {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    pub in_stock: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ArticleSortField {
    #[default]
    Name,
    Description,
}

impl Searchable for article::Model {
    type SortField = ArticleSortField;

    fn search_text(&self) -> Vec<&str> {
        vec![&self.name, self.description.as_deref().unwrap_or("")]
    }

    fn sort_text(&self, field: ArticleSortField) -> &str {
        match field {
            ArticleSortField::Name => &self.name,
            ArticleSortField::Description => self.description.as_deref().unwrap_or(""),
        }
    }
}

/// A sale that includes the article, with the line it was sold on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleSale {
    pub sale: sale::Model,
    pub line: sale_article::Model,
}

pub(crate) async fn require<C: ConnectionTrait>(
    conn: &C,
    article_id: i32,
) -> Result<article::Model, ServiceError> {
    article::Entity::find_by_id(article_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Article {} does not exist", article_id)))
}

/// Rejects articles that cannot be sold.
pub(crate) fn ensure_in_stock(article: &article::Model) -> Result<(), ServiceError> {
    if !article.in_stock {
        warn!(article_id = article.id, "article out of stock");
        return Err(ServiceError::Conflict(format!(
            "Article {} is out of stock",
            article.id
        )));
    }
    Ok(())
}

/// Service for managing articles
#[derive(Clone)]
pub struct ArticleService {
    db_pool: Arc<DbPool>,
    limits: SearchLimits,
}

impl ArticleService {
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

    /// Creates a new article
    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateArticleInput) -> Result<article::Model, ServiceError> {
        input.validate()?;
        let txn = self.db_pool.begin().await?;

        let article_id = input.id;
        if article::Entity::find_by_id(article_id)
            .one(&txn)
            .await?
            .is_some()
        {
            warn!(article_id, "article already exists");
            return Err(ServiceError::Conflict(format!(
                "Article {} already exists",
                article_id
            )));
        }

        let created = article::ActiveModel {
            id: Set(input.id),
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            in_stock: Set(input.in_stock),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            ServiceError::from_write(e, format!("Article {} already exists", article_id))
        })?;

        txn.commit().await?;
        info!(article_id, "article created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, article_id: i32) -> Result<article::Model, ServiceError> {
        require(&*self.db_pool, article_id).await
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<article::Model>, ServiceError> {
        let articles = article::Entity::find()
            .order_by_asc(article::Column::Id)
            .all(&*self.db_pool)
            .await?;
        non_empty(articles, || "No articles found".to_string())
    }

    /// Searches articles by name or description
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        params: SearchParams<ArticleSortField>,
    ) -> Result<Page<article::Model>, ServiceError> {
        let snapshot = article::Entity::find()
            .order_by_asc(article::Column::Id)
            .all(&*self.db_pool)
            .await?;
        Ok(search::search(snapshot, &params, &self.limits))
    }

    /// Articles whose availability flag equals `in_stock`
    #[instrument(skip(self))]
    pub async fn list_by_availability(
        &self,
        in_stock: bool,
    ) -> Result<Vec<article::Model>, ServiceError> {
        let articles = article::Entity::find()
            .filter(article::Column::InStock.eq(in_stock))
            .order_by_asc(article::Column::Id)
            .all(&*self.db_pool)
            .await?;
        non_empty(articles, || {
            let label = if in_stock { "in stock" } else { "out of stock" };
            format!("No articles {}", label)
        })
    }

    /// Sales the article appears on
    #[instrument(skip(self))]
    pub async fn list_sales(&self, article_id: i32) -> Result<Vec<ArticleSale>, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let article = require(&txn, article_id).await?;

        let rows = article
            .find_related(sale_article::Entity)
            .find_also_related(sale::Entity)
            .order_by_asc(sale_article::Column::SaleId)
            .all(&txn)
            .await?;
        txn.commit().await?;

        let sales = rows
            .into_iter()
            .filter_map(|(line, sale)| sale.map(|sale| ArticleSale { sale, line }))
            .collect();
        non_empty(sales, || format!("Article {} has not been sold", article_id))
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        article_id: i32,
        input: UpdateArticleInput,
    ) -> Result<article::Model, ServiceError> {
        input.validate()?;
        let txn = self.db_pool.begin().await?;
        let current = require(&txn, article_id).await?;

        let mut active = current.clone().into_active_model();
        let mut changed = false;
        changed |= stage(input.name, &current.name, |v| active.name = Set(v));
        changed |= stage(input.description.map(Some), &current.description, |v| {
            active.description = Set(v)
        });
        changed |= stage(input.price, &current.price, |v| active.price = Set(v));
        changed |= stage(input.in_stock, &current.in_stock, |v| active.in_stock = Set(v));

        if !changed {
            debug!(article_id, "update carried no changes");
            return Ok(current);
        }

        // Existing line items keep their frozen price.
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        info!(article_id, "article updated");
        Ok(updated)
    }

    /// Deletes an article that has never been sold
    #[instrument(skip(self))]
    pub async fn delete(&self, article_id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let article = require(&txn, article_id).await?;

        let lines = article
            .find_related(sale_article::Entity)
            .count(&txn)
            .await?;
        if lines > 0 {
            warn!(article_id, lines, "article still on sales");
            return Err(ServiceError::Conflict(format!(
                "Article {} is still on {} sale(s)",
                article_id, lines
            )));
        }

        article.delete(&txn).await?;
        txn.commit().await?;
        info!(article_id, "article deleted");
        Ok(())
    }
}
