use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::indices_satelitales;

#[derive(Debug, Clone)]
pub struct NewIndice {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub formula: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateIndice {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub formula: Option<Option<String>>,
    pub active: Option<bool>,
}

/// Satellite index catalog. Codes are immutable once created; only the
/// descriptive fields and the active flag can change.
pub struct IndiceRepository {
    conn: DatabaseConnection,
}

impl IndiceRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<indices_satelitales::Model>> {
        indices_satelitales::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query index")
    }

    pub async fn code_exists(&self, code: &str) -> Result<bool> {
        let count = indices_satelitales::Entity::find()
            .filter(indices_satelitales::Column::Code.eq(code))
            .count(&self.conn)
            .await
            .context("Failed to count indices by code")?;
        Ok(count > 0)
    }

    pub async fn create(&self, input: NewIndice) -> Result<indices_satelitales::Model> {
        let now = Utc::now();

        let active = indices_satelitales::ActiveModel {
            code: Set(input.code),
            name: Set(input.name),
            description: Set(input.description),
            formula: Set(input.formula),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert index")
    }

    pub async fn update(
        &self,
        id: i32,
        input: UpdateIndice,
    ) -> Result<Option<indices_satelitales::Model>> {
        let Some(indice) = indices_satelitales::Entity::find_by_id(id)
            .one(&self.conn)
            .await?
        else {
            return Ok(None);
        };

        let mut model: indices_satelitales::ActiveModel = indice.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(description) = input.description {
            model.description = Set(description);
        }
        if let Some(formula) = input.formula {
            model.formula = Set(formula);
        }
        if let Some(active_flag) = input.active {
            model.active = Set(active_flag);
        }
        model.updated_at = Set(Utc::now());

        Ok(Some(model.update(&self.conn).await?))
    }

    pub async fn set_active(&self, id: i32, active_flag: bool) -> Result<bool> {
        let Some(indice) = indices_satelitales::Entity::find_by_id(id)
            .one(&self.conn)
            .await?
        else {
            return Ok(false);
        };

        let mut model: indices_satelitales::ActiveModel = indice.into();
        model.active = Set(active_flag);
        model.updated_at = Set(Utc::now());
        model.update(&self.conn).await?;
        Ok(true)
    }

    pub async fn list(
        &self,
        page: u64,
        page_size: u64,
        search: Option<String>,
    ) -> Result<(Vec<indices_satelitales::Model>, u64)> {
        let mut query = indices_satelitales::Entity::find();
        if let Some(term) = search {
            query = query.filter(
                indices_satelitales::Column::Code
                    .contains(&term)
                    .or(indices_satelitales::Column::Name.contains(&term)),
            );
        }

        let paginator = query
            .order_by_asc(indices_satelitales::Column::Id)
            .paginate(&self.conn, page_size);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((rows, total))
    }

    pub async fn count_active(&self) -> Result<u64> {
        indices_satelitales::Entity::find()
            .filter(indices_satelitales::Column::Active.eq(true))
            .count(&self.conn)
            .await
            .context("Failed to count indices")
    }
}
