use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "technicians")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub name: String,
    pub surname: String,
    pub specialty: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::maintenance_technician::Entity")]
    Assignments,
}

impl Related<super::maintenance_technician::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl Related<super::maintenance::Entity> for Entity {
    fn to() -> RelationDef {
        super::maintenance_technician::Relation::Maintenance.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::maintenance_technician::Relation::Technician.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
