use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::proveedores;

#[derive(Debug, Clone)]
pub struct NewProvider {
    pub name: String,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub service_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProvider {
    pub name: Option<String>,
    pub contact_email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub service_type: Option<Option<String>>,
    pub active: Option<bool>,
}

pub struct ProviderRepository {
    conn: DatabaseConnection,
}

impl ProviderRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<proveedores::Model>> {
        proveedores::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query provider")
    }

    pub async fn create(&self, input: NewProvider) -> Result<proveedores::Model> {
        let now = Utc::now();

        let active = proveedores::ActiveModel {
            name: Set(input.name),
            contact_email: Set(input.contact_email),
            phone: Set(input.phone),
            service_type: Set(input.service_type),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert provider")
    }

    pub async fn update(
        &self,
        id: i32,
        input: UpdateProvider,
    ) -> Result<Option<proveedores::Model>> {
        let Some(provider) = proveedores::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut model: proveedores::ActiveModel = provider.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(contact_email) = input.contact_email {
            model.contact_email = Set(contact_email);
        }
        if let Some(phone) = input.phone {
            model.phone = Set(phone);
        }
        if let Some(service_type) = input.service_type {
            model.service_type = Set(service_type);
        }
        if let Some(active_flag) = input.active {
            model.active = Set(active_flag);
        }
        model.updated_at = Set(Utc::now());

        Ok(Some(model.update(&self.conn).await?))
    }

    pub async fn set_active(&self, id: i32, active_flag: bool) -> Result<bool> {
        let Some(provider) = proveedores::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(false);
        };

        let mut model: proveedores::ActiveModel = provider.into();
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
    ) -> Result<(Vec<proveedores::Model>, u64)> {
        let mut query = proveedores::Entity::find();
        if let Some(term) = search {
            query = query.filter(proveedores::Column::Name.contains(&term));
        }

        let paginator = query
            .order_by_asc(proveedores::Column::Id)
            .paginate(&self.conn, page_size);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((rows, total))
    }

    pub async fn count_active(&self) -> Result<u64> {
        proveedores::Entity::find()
            .filter(proveedores::Column::Active.eq(true))
            .count(&self.conn)
            .await
            .context("Failed to count providers")
    }
}
