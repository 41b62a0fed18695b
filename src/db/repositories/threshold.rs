use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::umbrales_indice;

#[derive(Debug, Clone)]
pub struct NewThreshold {
    pub indice_id: i32,
    pub region_id: Option<i32>,
    pub label: String,
    pub min_value: f64,
    pub max_value: f64,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateThreshold {
    pub region_id: Option<Option<i32>>,
    pub label: Option<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub color: Option<Option<String>>,
}

/// Threshold bands scoping index values to severity labels.
pub struct ThresholdRepository {
    conn: DatabaseConnection,
}

impl ThresholdRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<umbrales_indice::Model>> {
        umbrales_indice::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query threshold")
    }

    pub async fn create(&self, input: NewThreshold) -> Result<umbrales_indice::Model> {
        let now = Utc::now();

        let active = umbrales_indice::ActiveModel {
            indice_id: Set(input.indice_id),
            region_id: Set(input.region_id),
            label: Set(input.label),
            min_value: Set(input.min_value),
            max_value: Set(input.max_value),
            color: Set(input.color),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert threshold")
    }

    pub async fn update(
        &self,
        id: i32,
        input: UpdateThreshold,
    ) -> Result<Option<umbrales_indice::Model>> {
        let Some(threshold) = umbrales_indice::Entity::find_by_id(id).one(&self.conn).await?
        else {
            return Ok(None);
        };

        let mut model: umbrales_indice::ActiveModel = threshold.into();
        if let Some(region_id) = input.region_id {
            model.region_id = Set(region_id);
        }
        if let Some(label) = input.label {
            model.label = Set(label);
        }
        if let Some(min_value) = input.min_value {
            model.min_value = Set(min_value);
        }
        if let Some(max_value) = input.max_value {
            model.max_value = Set(max_value);
        }
        if let Some(color) = input.color {
            model.color = Set(color);
        }
        model.updated_at = Set(Utc::now());

        Ok(Some(model.update(&self.conn).await?))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = umbrales_indice::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete threshold")?;

        Ok(result.rows_affected > 0)
    }

    /// All bands for an index, ordered by their lower bound so clients
    /// can render the scale directly.
    pub async fn list_for_indice(
        &self,
        indice_id: i32,
        region_id: Option<i32>,
    ) -> Result<Vec<umbrales_indice::Model>> {
        let mut query = umbrales_indice::Entity::find()
            .filter(umbrales_indice::Column::IndiceId.eq(indice_id));
        if let Some(region_id) = region_id {
            query = query.filter(umbrales_indice::Column::RegionId.eq(region_id));
        }

        query
            .order_by_asc(umbrales_indice::Column::MinValue)
            .all(&self.conn)
            .await
            .context("Failed to list thresholds")
    }

    /// Removes all bands scoped to a region, used when the region goes away.
    pub async fn delete_for_region(&self, region_id: i32) -> Result<u64> {
        let result = umbrales_indice::Entity::delete_many()
            .filter(umbrales_indice::Column::RegionId.eq(region_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete region thresholds")?;

        Ok(result.rows_affected)
    }
}
