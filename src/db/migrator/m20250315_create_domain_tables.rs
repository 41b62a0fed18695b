use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

use crate::entities::{
    fincas, indices_satelitales, potreros, proveedores, regiones_umbral, umbrales_indice, usuarios,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(usuarios::Entity)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(fincas::Entity)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(potreros::Entity)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(proveedores::Entity)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(indices_satelitales::Entity)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(regiones_umbral::Entity)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(umbrales_indice::Entity)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Seed the standard index catalog
        let now = chrono::Utc::now();

        let insert = sea_orm_migration::sea_query::Query::insert()
            .into_table(indices_satelitales::Entity)
            .columns([
                indices_satelitales::Column::Code,
                indices_satelitales::Column::Name,
                indices_satelitales::Column::Description,
                indices_satelitales::Column::Formula,
                indices_satelitales::Column::Active,
                indices_satelitales::Column::CreatedAt,
                indices_satelitales::Column::UpdatedAt,
            ])
            .values_panic([
                "NDVI".into(),
                "Normalized Difference Vegetation Index".into(),
                "Vegetation vigor".into(),
                "(NIR - RED) / (NIR + RED)".into(),
                true.into(),
                now.into(),
                now.into(),
            ])
            .values_panic([
                "NDWI".into(),
                "Normalized Difference Water Index".into(),
                "Water content".into(),
                "(GREEN - NIR) / (GREEN + NIR)".into(),
                true.into(),
                now.into(),
                now.into(),
            ])
            .values_panic([
                "SAVI".into(),
                "Soil Adjusted Vegetation Index".into(),
                "Vegetation vigor corrected for soil brightness".into(),
                "((NIR - RED) / (NIR + RED + 0.5)) * 1.5".into(),
                true.into(),
                now.into(),
                now.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(umbrales_indice::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(regiones_umbral::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(indices_satelitales::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(proveedores::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(potreros::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(fincas::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(usuarios::Entity).to_owned())
            .await?;

        Ok(())
    }
}
