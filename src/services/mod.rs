use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{config::AppConfig, db::DbPool, errors::ServiceError};

// Shared building blocks
pub mod pricing;
pub mod search;

// Entity stores
pub mod articles;
pub mod clients;
pub mod maintenance;
pub mod orders;
pub mod sales;
pub mod technicians;

// Association managers
pub mod maintenance_technicians;
pub mod sale_articles;

use self::{
    articles::ArticleService, clients::ClientService, maintenance::MaintenanceService,
    maintenance_technicians::MaintenanceTechnicianService, orders::OrderService,
    sale_articles::SaleArticleService, sales::SaleService, search::SearchLimits,
    technicians::TechnicianService,
};

/// Every service, built over one shared connection pool.
#[derive(Clone)]
pub struct AppServices {
    pub clients: ClientService,
    pub orders: OrderService,
    pub technicians: TechnicianService,
    pub articles: ArticleService,
    pub maintenance: MaintenanceService,
    pub sales: SaleService,
    pub maintenance_technicians: MaintenanceTechnicianService,
    pub sale_articles: SaleArticleService,
    db_pool: Arc<DbPool>,
}

impl AppServices {
    /// Creates all services with the default search page sizes
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self::with_search_limits(db_pool, SearchLimits::default())
    }

    /// Creates all services using the page sizes from `config`
    pub fn from_config(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        Self::with_search_limits(db_pool, SearchLimits::from(config))
    }

    pub fn with_search_limits(db_pool: Arc<DbPool>, limits: SearchLimits) -> Self {
        Self {
            clients: ClientService::new(db_pool.clone()).with_search_limits(limits),
            orders: OrderService::new(db_pool.clone()),
            technicians: TechnicianService::new(db_pool.clone()).with_search_limits(limits),
            articles: ArticleService::new(db_pool.clone()).with_search_limits(limits),
            maintenance: MaintenanceService::new(db_pool.clone()).with_search_limits(limits),
            sales: SaleService::new(db_pool.clone()),
            maintenance_technicians: MaintenanceTechnicianService::new(db_pool.clone()),
            sale_articles: SaleArticleService::new(db_pool.clone()),
            db_pool,
        }
    }

    /// Gets a reference to the database pool
    pub fn db_pool(&self) -> &Arc<DbPool> {
        &self.db_pool
    }
}

/// Empty listings are reported as not-found.
pub(crate) fn non_empty<T>(
    items: Vec<T>,
    message: impl FnOnce() -> String,
) -> Result<Vec<T>, ServiceError> {
    if items.is_empty() {
        Err(ServiceError::NotFound(message()))
    } else {
        Ok(items)
    }
}

pub(crate) fn ensure_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ServiceError> {
    if start > end {
        return Err(ServiceError::InvalidInput(format!(
            "Start date {} is after end date {}",
            start.to_rfc3339(),
            end.to_rfc3339()
        )));
    }
    Ok(())
}

/// Applies `new` to `slot` when it is supplied and differs from `current`.
/// Returns whether a change was staged.
pub(crate) fn stage<T, F>(new: Option<T>, current: &T, apply: F) -> bool
where
    T: PartialEq,
    F: FnOnce(T),
{
    match new {
        Some(value) if &value != current => {
            apply(value);
            true
        }
        _ => false,
    }
}
