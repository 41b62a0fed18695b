use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

use crate::entities::{fincas, potreros};

#[derive(Debug, Clone)]
pub struct NewFarm {
    pub name: String,
    pub owner: Option<String>,
    pub location: Option<String>,
    pub area_hectares: Option<f64>,
    pub admin_id: Option<i32>,
}

/// Partial update; `None` leaves the column untouched. Nested options
/// distinguish "don't change" from "set to null".
#[derive(Debug, Clone, Default)]
pub struct UpdateFarm {
    pub name: Option<String>,
    pub owner: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub area_hectares: Option<Option<f64>>,
    pub admin_id: Option<Option<i32>>,
    pub active: Option<bool>,
}

pub struct FarmRepository {
    conn: DatabaseConnection,
}

impl FarmRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<fincas::Model>> {
        fincas::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query farm")
    }

    pub async fn create(&self, input: NewFarm) -> Result<fincas::Model> {
        let now = Utc::now();

        let active = fincas::ActiveModel {
            name: Set(input.name),
            owner: Set(input.owner),
            location: Set(input.location),
            area_hectares: Set(input.area_hectares),
            admin_id: Set(input.admin_id),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active.insert(&self.conn).await.context("Failed to insert farm")
    }

    pub async fn update(&self, id: i32, input: UpdateFarm) -> Result<Option<fincas::Model>> {
        let Some(farm) = fincas::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut model: fincas::ActiveModel = farm.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(owner) = input.owner {
            model.owner = Set(owner);
        }
        if let Some(location) = input.location {
            model.location = Set(location);
        }
        if let Some(area) = input.area_hectares {
            model.area_hectares = Set(area);
        }
        if let Some(admin_id) = input.admin_id {
            model.admin_id = Set(admin_id);
        }
        if let Some(active_flag) = input.active {
            model.active = Set(active_flag);
        }
        model.updated_at = Set(Utc::now());

        Ok(Some(model.update(&self.conn).await?))
    }

    /// Soft-deletes the farm and hard-deletes its paddocks in one
    /// transaction. Returns false when the farm does not exist.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let Some(farm) = fincas::Entity::find_by_id(id).one(&txn).await? else {
            txn.rollback().await?;
            return Ok(false);
        };

        potreros::Entity::delete_many()
            .filter(potreros::Column::FincaId.eq(id))
            .exec(&txn)
            .await
            .context("Failed to delete farm paddocks")?;

        let mut model: fincas::ActiveModel = farm.into();
        model.active = Set(false);
        model.updated_at = Set(Utc::now());
        model.update(&txn).await?;

        txn.commit().await?;
        Ok(true)
    }

    pub async fn list(
        &self,
        page: u64,
        page_size: u64,
        search: Option<String>,
        admin_id: Option<i32>,
    ) -> Result<(Vec<fincas::Model>, u64)> {
        let mut query = fincas::Entity::find();
        if let Some(term) = search {
            query = query.filter(
                fincas::Column::Name
                    .contains(&term)
                    .or(fincas::Column::Owner.contains(&term)),
            );
        }
        if let Some(admin_id) = admin_id {
            query = query.filter(fincas::Column::AdminId.eq(admin_id));
        }

        let paginator = query
            .order_by_asc(fincas::Column::Id)
            .paginate(&self.conn, page_size);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((rows, total))
    }

    pub async fn count_active(&self) -> Result<u64> {
        fincas::Entity::find()
            .filter(fincas::Column::Active.eq(true))
            .count(&self.conn)
            .await
            .context("Failed to count farms")
    }

    pub async fn list_paddocks(&self, finca_id: i32) -> Result<Vec<potreros::Model>> {
        potreros::Entity::find()
            .filter(potreros::Column::FincaId.eq(finca_id))
            .order_by_asc(potreros::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list paddocks")
    }

    pub async fn create_paddock(
        &self,
        finca_id: i32,
        name: String,
        area_hectares: Option<f64>,
    ) -> Result<potreros::Model> {
        let active = potreros::ActiveModel {
            finca_id: Set(finca_id),
            name: Set(name),
            area_hectares: Set(area_hectares),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert paddock")
    }

    /// Deletes a paddock, scoped to its farm so ids from other farms
    /// cannot be removed through the wrong route.
    pub async fn delete_paddock(&self, finca_id: i32, paddock_id: i32) -> Result<bool> {
        let result = potreros::Entity::delete_many()
            .filter(potreros::Column::Id.eq(paddock_id))
            .filter(potreros::Column::FincaId.eq(finca_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete paddock")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count_paddocks(&self) -> Result<u64> {
        potreros::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count paddocks")
    }
}
