use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Line item of a sale. `recorded_price` is the frozen line total.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sale_articles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub sale_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub article_id: i32,
    pub quantity: i32,
    #[sea_orm(column_type = "Double")]
    pub recorded_price: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sale::Entity",
        from = "Column::SaleId",
        to = "super::sale::Column::Id"
    )]
    Sale,
    #[sea_orm(
        belongs_to = "super::article::Entity",
        from = "Column::ArticleId",
        to = "super::article::Column::Id"
    )]
    Article,
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sale.def()
    }
}

impl Related<super::article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Article.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
