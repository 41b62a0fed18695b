use sea_orm::entity::prelude::*;

/// Threshold bands for an index, optionally scoped to a region.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "umbrales_indice")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub indice_id: i32,

    /// When null, the band applies everywhere.
    pub region_id: Option<i32>,

    /// Band label, e.g. "bajo", "medio", "alto".
    pub label: String,

    pub min_value: f64,

    pub max_value: f64,

    /// Display color as a hex string.
    pub color: Option<String>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::indices_satelitales::Entity",
        from = "Column::IndiceId",
        to = "super::indices_satelitales::Column::Id"
    )]
    Indice,
    #[sea_orm(
        belongs_to = "super::regiones_umbral::Entity",
        from = "Column::RegionId",
        to = "super::regiones_umbral::Column::Id"
    )]
    Region,
}

impl Related<super::indices_satelitales::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Indice.def()
    }
}

impl Related<super::regiones_umbral::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Region.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
