//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs. Composite unique keys that the entity macros cannot express are added
//! as separate indexes.

use crate::entities::{
    Booking, BookingLineItem, Cart, InvoiceCounter, Payment, PriceTier, Rating, Service,
    price_tier, rating,
};
use crate::errors::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema,
    sea_query::Index,
};
use std::path::Path;

/// Database used when neither config.toml nor `DATABASE_URL` sets one.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/facility_booking.sqlite?mode=rwc";

/// Establishes a connection to the database at `database_url`.
///
/// For file-backed `SQLite` URLs the parent directory is created first so a fresh
/// checkout can start without preparing `data/` by hand.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(parent) = sqlite_file_path(database_url).and_then(Path::parent) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut options = ConnectOptions::new(database_url);
    options.sqlx_logging(false);

    tracing::info!(url = %database_url, "Connecting to database");
    Database::connect(options).await.map_err(Into::into)
}

fn sqlite_file_path(database_url: &str) -> Option<&Path> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next()?;
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Some(Path::new(path))
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;
    Ok(())
}

/// Creates all tables and indexes, skipping the ones that already exist.
///
/// Tables are created parents first so foreign keys always point at an
/// existing table.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, Service).await?;
    create_table(db, &schema, PriceTier).await?;
    create_table(db, &schema, Booking).await?;
    create_table(db, &schema, BookingLineItem).await?;
    create_table(db, &schema, Payment).await?;
    create_table(db, &schema, Cart).await?;
    create_table(db, &schema, Rating).await?;
    create_table(db, &schema, InvoiceCounter).await?;

    let tier_key = Index::create()
        .if_not_exists()
        .name("idx_price_tiers_service_customer_type")
        .table(PriceTier)
        .col(price_tier::Column::ServiceId)
        .col(price_tier::Column::CustomerType)
        .unique()
        .to_owned();
    let rating_key = Index::create()
        .if_not_exists()
        .name("idx_ratings_service_user")
        .table(Rating)
        .col(rating::Column::ServiceId)
        .col(rating::Column::UserId)
        .unique()
        .to_owned();

    db.execute(builder.build(&tier_key)).await?;
    db.execute(builder.build(&rating_key)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::invoice::is_unique_violation,
        entities::{rating as rating_entity, service},
        test_utils::*,
    };
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, QuerySelect, Set};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = setup_test_db().await?;

        // Test that tables exist by querying them
        let _: Vec<service::Model> = Service::find().limit(1).all(&db).await?;
        let _ = PriceTier::find().limit(1).all(&db).await?;
        let _ = Booking::find().limit(1).all(&db).await?;
        let _ = BookingLineItem::find().limit(1).all(&db).await?;
        let _ = Payment::find().limit(1).all(&db).await?;
        let _ = Cart::find().limit(1).all(&db).await?;
        let _ = Rating::find().limit(1).all(&db).await?;
        let _ = InvoiceCounter::find().limit(1).all(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_repeatable() -> Result<()> {
        let db = setup_test_db().await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_rating_pair_is_unique() -> Result<()> {
        let db = setup_test_db().await?;
        let service = create_test_service(&db, "Hall", 1_000).await?;

        let row = || rating_entity::ActiveModel {
            service_id: Set(service.id),
            user_id: Set(TEST_USER_ID),
            rating: Set(4),
            review: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        row().insert(&db).await?;
        let err = row().insert(&db).await.err();
        assert!(err.as_ref().is_some_and(is_unique_violation));
        Ok(())
    }

    #[test]
    fn test_sqlite_file_path() {
        assert_eq!(
            sqlite_file_path("sqlite://data/app.sqlite?mode=rwc"),
            Some(Path::new("data/app.sqlite"))
        );
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("postgres://localhost/app"), None);
    }

    #[tokio::test]
    async fn test_create_connection_in_memory() -> Result<()> {
        let db = create_connection("sqlite::memory:").await?;
        db.ping().await?;
        Ok(())
    }
}
