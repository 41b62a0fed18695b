use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "pending_confirmations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub email: String,

    /// Zero-padded 6-digit numeric code.
    pub code: String,

    /// Opaque 64-char hex token for link-based verification.
    #[sea_orm(unique)]
    pub token: String,

    /// REGISTER or RESET_PASSWORD.
    pub kind: String,

    pub expires_at: DateTimeUtc,

    /// Wrong-code submissions against this row.
    pub attempts: i32,

    pub completed: bool,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
