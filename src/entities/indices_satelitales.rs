use sea_orm::entity::prelude::*;

/// Satellite vegetation index catalog (NDVI, NDWI, ...).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "indices_satelitales")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Short identifier, e.g. "NDVI". Unique.
    #[sea_orm(unique)]
    pub code: String,

    pub name: String,

    pub description: Option<String>,

    pub formula: Option<String>,

    pub active: bool,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::umbrales_indice::Entity")]
    Umbrales,
}

impl Related<super::umbrales_indice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Umbrales.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
