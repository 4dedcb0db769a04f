use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Maintenance job attached to an order.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "maintenance")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub kind: MaintenanceKind,
    pub description: String,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    #[sea_orm(column_type = "Double")]
    pub price: f64,
    pub order_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    #[sea_orm(has_many = "super::maintenance_technician::Entity")]
    Assignments,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::maintenance_technician::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl Related<super::technician::Entity> for Entity {
    fn to() -> RelationDef {
        super::maintenance_technician::Relation::Technician.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::maintenance_technician::Relation::Maintenance.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Maintenance job type
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MaintenanceKind {
    #[sea_orm(string_value = "corrective")]
    Corrective,
    #[sea_orm(string_value = "preventive")]
    Preventive,
}
