use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

use crate::entities::{regiones_umbral, umbrales_indice};

#[derive(Debug, Clone)]
pub struct NewRegion {
    pub name: String,
    pub description: Option<String>,
    pub geometry: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRegion {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub geometry: Option<String>,
}

/// Named GeoJSON regions that threshold bands can be scoped to.
pub struct RegionRepository {
    conn: DatabaseConnection,
}

impl RegionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<regiones_umbral::Model>> {
        regiones_umbral::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query region")
    }

    pub async fn create(&self, input: NewRegion) -> Result<regiones_umbral::Model> {
        let now = Utc::now();

        let active = regiones_umbral::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            geometry: Set(input.geometry),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert region")
    }

    pub async fn update(
        &self,
        id: i32,
        input: UpdateRegion,
    ) -> Result<Option<regiones_umbral::Model>> {
        let Some(region) = regiones_umbral::Entity::find_by_id(id).one(&self.conn).await?
        else {
            return Ok(None);
        };

        let mut model: regiones_umbral::ActiveModel = region.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(description) = input.description {
            model.description = Set(description);
        }
        if let Some(geometry) = input.geometry {
            model.geometry = Set(geometry);
        }
        model.updated_at = Set(Utc::now());

        Ok(Some(model.update(&self.conn).await?))
    }

    /// Deletes the region together with any threshold bands scoped to it.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let txn = self.conn.begin().await?;

        umbrales_indice::Entity::delete_many()
            .filter(umbrales_indice::Column::RegionId.eq(id))
            .exec(&txn)
            .await
            .context("Failed to delete region thresholds")?;

        let result = regiones_umbral::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .context("Failed to delete region")?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn list(
        &self,
        page: u64,
        page_size: u64,
        search: Option<String>,
    ) -> Result<(Vec<regiones_umbral::Model>, u64)> {
        let mut query = regiones_umbral::Entity::find();
        if let Some(term) = search {
            query = query.filter(regiones_umbral::Column::Name.contains(&term));
        }

        let paginator = query
            .order_by_asc(regiones_umbral::Column::Id)
            .paginate(&self.conn, page_size);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((rows, total))
    }
}
