use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "fincas")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    pub owner: Option<String>,

    pub location: Option<String>,

    pub area_hectares: Option<f64>,

    /// Admin responsible for this farm, if assigned.
    pub admin_id: Option<i32>,

    pub active: bool,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::potreros::Entity")]
    Potreros,
}

impl Related<super::potreros::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Potreros.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
