use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::usuarios;

#[derive(Debug, Clone)]
pub struct NewUsuario {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUsuario {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Option<String>>,
    pub active: Option<bool>,
}

/// Platform users (the farm-facing accounts, not backend admins).
pub struct UsuarioRepository {
    conn: DatabaseConnection,
}

impl UsuarioRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<usuarios::Model>> {
        usuarios::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user")
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count = usuarios::Entity::find()
            .filter(usuarios::Column::Email.eq(email))
            .count(&self.conn)
            .await
            .context("Failed to count users by email")?;
        Ok(count > 0)
    }

    pub async fn create(&self, input: NewUsuario) -> Result<usuarios::Model> {
        let now = Utc::now();

        let active = usuarios::ActiveModel {
            name: Set(input.name),
            email: Set(input.email),
            phone: Set(input.phone),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active.insert(&self.conn).await.context("Failed to insert user")
    }

    pub async fn update(&self, id: i32, input: UpdateUsuario) -> Result<Option<usuarios::Model>> {
        let Some(user) = usuarios::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut model: usuarios::ActiveModel = user.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(email) = input.email {
            model.email = Set(email);
        }
        if let Some(phone) = input.phone {
            model.phone = Set(phone);
        }
        if let Some(active_flag) = input.active {
            model.active = Set(active_flag);
        }
        model.updated_at = Set(Utc::now());

        Ok(Some(model.update(&self.conn).await?))
    }

    pub async fn set_active(&self, id: i32, active_flag: bool) -> Result<bool> {
        let Some(user) = usuarios::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(false);
        };

        let mut model: usuarios::ActiveModel = user.into();
        model.active = Set(active_flag);
        model.updated_at = Set(Utc::now());
        model.update(&self.conn).await?;
        Ok(true)
    }

    /// Flips the active flag for a batch of ids. Returns how many rows
    /// actually changed; unknown ids are skipped silently.
    pub async fn bulk_set_active(&self, ids: &[i32], active_flag: bool) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = usuarios::Entity::update_many()
            .col_expr(usuarios::Column::Active, Expr::value(active_flag))
            .col_expr(usuarios::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(usuarios::Column::Id.is_in(ids.iter().copied()))
            .exec(&self.conn)
            .await
            .context("Failed to bulk-update user status")?;

        Ok(result.rows_affected)
    }

    pub async fn list(
        &self,
        page: u64,
        page_size: u64,
        search: Option<String>,
    ) -> Result<(Vec<usuarios::Model>, u64)> {
        let mut query = usuarios::Entity::find();
        if let Some(term) = search {
            query = query.filter(
                usuarios::Column::Name
                    .contains(&term)
                    .or(usuarios::Column::Email.contains(&term)),
            );
        }

        let paginator = query
            .order_by_asc(usuarios::Column::Id)
            .paginate(&self.conn, page_size);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((rows, total))
    }

    pub async fn count_active(&self) -> Result<u64> {
        usuarios::Entity::find()
            .filter(usuarios::Column::Active.eq(true))
            .count(&self.conn)
            .await
            .context("Failed to count users")
    }
}
