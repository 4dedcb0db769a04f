use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sellable article. `price` is the current unit price; line items freeze
/// their own copy when they are created.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "articles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "Double")]
    pub price: f64,
    pub in_stock: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale_article::Entity")]
    SaleLines,
}

impl Related<super::sale_article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleLines.def()
    }
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        super::sale_article::Relation::Sale.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::sale_article::Relation::Article.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
