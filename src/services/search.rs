//! In-memory filter, sort and pagination shared by every entity listing.
//!
//! The engine is a pure function over a snapshot. Records are matched by a
//! case-insensitive substring test against a fixed per-entity field list,
//! ordered by one whitelisted field compared case-insensitively, and then
//! sliced. Sorting is stable in both directions: records whose sort keys are
//! equal keep the order they had in the snapshot.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::config::AppConfig;

/// Sort direction.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// A record the engine can filter and order.
///
/// `SortField` is a closed enum per entity, so only whitelisted fields can be
/// requested. Absent optional text projects to the empty string.
pub trait Searchable {
    type SortField: Copy + Default + Debug;

    /// Text fields checked by the substring filter, in a fixed order.
    fn search_text(&self) -> Vec<&str>;

    /// String representation of `field` used for ordering.
    fn sort_text(&self, field: Self::SortField) -> &str;
}

/// Caller-supplied search arguments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams<F> {
    pub query: Option<String>,
    #[serde(default)]
    pub sort_by: F,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default)]
    pub offset: u64,
    pub limit: Option<u64>,
}

impl<F: Default> SearchParams<F> {
    pub fn query(q: impl Into<String>) -> Self {
        Self {
            query: Some(q.into()),
            ..Default::default()
        }
    }

    pub fn sorted(sort_by: F, order: SortOrder) -> Self {
        Self {
            sort_by,
            order,
            ..Default::default()
        }
    }

    pub fn with_page(mut self, offset: u64, limit: u64) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

/// Page-size policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub default_limit: u64,
    pub max_limit: u64,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl From<&AppConfig> for SearchLimits {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            default_limit: cfg.search_default_limit,
            max_limit: cfg.search_max_limit,
        }
    }
}

impl SearchLimits {
    /// Resolves the effective page size, clamped to `[1, max_limit]`.
    pub fn effective(&self, requested: Option<u64>) -> u64 {
        let max = self.max_limit.max(1);
        requested.unwrap_or(self.default_limit).clamp(1, max)
    }
}

/// One page of results plus the post-filter, pre-pagination count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Filters, sorts and paginates `records`.
///
/// An offset past the end yields an empty page whose `total` still reports
/// the filtered count.
pub fn search<T: Searchable>(
    records: Vec<T>,
    params: &SearchParams<T::SortField>,
    limits: &SearchLimits,
) -> Page<T> {
    let needle = params
        .query
        .as_deref()
        .map(str::to_lowercase)
        .filter(|q| !q.is_empty());

    let mut keyed: Vec<(String, T)> = records
        .into_iter()
        .filter(|record| match &needle {
            Some(q) => record
                .search_text()
                .iter()
                .any(|text| text.to_lowercase().contains(q.as_str())),
            None => true,
        })
        .map(|record| (record.sort_text(params.sort_by).to_lowercase(), record))
        .collect();

    match params.order {
        SortOrder::Asc => keyed.sort_by(|a, b| a.0.cmp(&b.0)),
        SortOrder::Desc => keyed.sort_by(|a, b| b.0.cmp(&a.0)),
    }

    let total = keyed.len() as u64;
    let limit = limits.effective(params.limit);
    let offset = usize::try_from(params.offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);

    let items = keyed
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|(_, record)| record)
        .collect();

    Page { items, total }
}
