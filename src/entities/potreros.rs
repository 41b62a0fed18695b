use sea_orm::entity::prelude::*;

/// Paddocks within a farm.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "potreros")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub finca_id: i32,

    pub name: String,

    pub area_hectares: Option<f64>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::fincas::Entity",
        from = "Column::FincaId",
        to = "super::fincas::Column::Id"
    )]
    Finca,
}

impl Related<super::fincas::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Finca.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
