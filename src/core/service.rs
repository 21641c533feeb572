//! Service catalog business logic.
//!
//! Creates, updates, looks up and retires bookable services together with their
//! per-customer-type price tiers. Tiers are never patched: an update deletes the
//! service's tiers and inserts the new set inside the same transaction.

use crate::{
    core::status::CustomerType,
    entities::{BookingLineItem, PriceTier, Service, booking_line_item, price_tier, service},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};

const MAX_NAME_LEN: usize = 200;
const SLUG_SUFFIX_LEN: usize = 5;

/// Price for one customer type, as submitted by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPrice {
    /// Customer type this price applies to
    pub customer_type: CustomerType,
    /// Price per day
    pub price: i64,
}

/// Editable fields of a service, used for both creation and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInput {
    /// Display name
    pub name: String,
    /// Owning organizational unit
    pub unit: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Flat price per day
    #[serde(default)]
    pub base_price: i64,
    /// Whether `prices` replaces `base_price`
    #[serde(default)]
    pub is_price_per_type: bool,
    /// Whether the service can be booked
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Tier prices, only stored when `is_price_per_type` is set
    #[serde(default)]
    pub prices: Vec<TierPrice>,
}

const fn default_active() -> bool {
    true
}

/// What [`delete_service`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteOutcome {
    /// The row is gone
    Deleted,
    /// Bookings reference the service, so it was only deactivated
    Deactivated,
}

/// Builds a URL slug from a display name: lowercase ASCII alphanumerics joined
/// by single dashes.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn unique_slug(name: &str) -> String {
    let suffix: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(SLUG_SUFFIX_LEN)
        .collect();
    let base = slugify(name);
    if base.is_empty() {
        suffix
    } else {
        format!("{base}-{suffix}")
    }
}

fn validate_input(input: &ServiceInput) -> Result<()> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(Error::validation("name", "service name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::validation(
            "name",
            format!("service name cannot exceed {MAX_NAME_LEN} characters"),
        ));
    }
    if input.unit.trim().is_empty() {
        return Err(Error::validation("unit", "unit cannot be empty"));
    }
    if input.base_price < 0 {
        return Err(Error::validation("base_price", "price cannot be negative"));
    }
    for (i, tier) in input.prices.iter().enumerate() {
        if tier.price < 0 {
            return Err(Error::validation("price", "price cannot be negative"));
        }
        if input.prices[..i]
            .iter()
            .any(|t| t.customer_type == tier.customer_type)
        {
            return Err(Error::validation(
                "customer_type",
                format!("duplicate price for customer type '{}'", tier.customer_type),
            ));
        }
    }
    Ok(())
}

async fn insert_tiers<C>(conn: &C, service_id: i64, input: &ServiceInput) -> Result<()>
where
    C: ConnectionTrait,
{
    if !input.is_price_per_type {
        return Ok(());
    }
    // Zero-priced rows are treated as blank form entries.
    for tier in input.prices.iter().filter(|t| t.price > 0) {
        price_tier::ActiveModel {
            service_id: Set(service_id),
            customer_type: Set(tier.customer_type.as_str().to_string()),
            price: Set(tier.price),
            ..Default::default()
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

/// Creates a service and its price tiers in one transaction.
///
/// The slug is derived from the name plus a short random suffix so that two
/// services with the same name never collide.
pub async fn create_service(db: &DatabaseConnection, input: ServiceInput) -> Result<service::Model> {
    validate_input(&input)?;

    let now = chrono::Utc::now();
    let txn = db.begin().await?;

    let created = service::ActiveModel {
        name: Set(input.name.trim().to_string()),
        slug: Set(unique_slug(&input.name)),
        unit: Set(input.unit.trim().to_string()),
        description: Set(input.description.clone()),
        base_price: Set(input.base_price),
        is_price_per_type: Set(input.is_price_per_type),
        is_active: Set(input.is_active),
        reservation_seq: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    insert_tiers(&txn, created.id, &input).await?;
    txn.commit().await?;

    tracing::info!(service_id = created.id, slug = %created.slug, "Created service");
    Ok(created)
}

/// Overwrites a service's fields and replaces its price tiers wholesale.
pub async fn update_service(
    db: &DatabaseConnection,
    service_id: i64,
    input: ServiceInput,
) -> Result<service::Model> {
    validate_input(&input)?;

    let txn = db.begin().await?;
    let existing = require_service(&txn, service_id).await?;

    let mut active: service::ActiveModel = existing.into();
    active.name = Set(input.name.trim().to_string());
    active.unit = Set(input.unit.trim().to_string());
    active.description = Set(input.description.clone());
    active.base_price = Set(input.base_price);
    active.is_price_per_type = Set(input.is_price_per_type);
    active.is_active = Set(input.is_active);
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&txn).await?;

    PriceTier::delete_many()
        .filter(price_tier::Column::ServiceId.eq(service_id))
        .exec(&txn)
        .await?;
    insert_tiers(&txn, service_id, &input).await?;

    txn.commit().await?;

    tracing::info!(service_id, "Updated service and replaced price tiers");
    Ok(updated)
}

/// Loads a service or fails with [`Error::ServiceNotFound`].
///
/// Generic over the connection so booking transactions can call it.
pub async fn require_service<C>(conn: &C, service_id: i64) -> Result<service::Model>
where
    C: ConnectionTrait,
{
    Service::find_by_id(service_id)
        .one(conn)
        .await?
        .ok_or_else(|| Error::ServiceNotFound {
            id: service_id.to_string(),
        })
}

/// Finds a service by id.
pub async fn get_service(
    db: &DatabaseConnection,
    service_id: i64,
) -> Result<Option<service::Model>> {
    Service::find_by_id(service_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a service by its slug.
pub async fn get_service_by_slug(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<Option<service::Model>> {
    Service::find()
        .filter(service::Column::Slug.eq(slug))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists active services, newest first.
pub async fn list_active_services(db: &DatabaseConnection) -> Result<Vec<service::Model>> {
    Service::find()
        .filter(service::Column::IsActive.eq(true))
        .order_by_desc(service::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Searches active services whose name or description contains `query`.
pub async fn search_services(
    db: &DatabaseConnection,
    query: &str,
) -> Result<Vec<service::Model>> {
    let query = query.trim();
    if query.is_empty() {
        return list_active_services(db).await;
    }

    Service::find()
        .filter(service::Column::IsActive.eq(true))
        .filter(
            Condition::any()
                .add(service::Column::Name.contains(query))
                .add(service::Column::Description.contains(query)),
        )
        .order_by_desc(service::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists the price tiers of a service in customer-type order.
pub async fn get_price_tiers(
    db: &DatabaseConnection,
    service_id: i64,
) -> Result<Vec<price_tier::Model>> {
    PriceTier::find()
        .filter(price_tier::Column::ServiceId.eq(service_id))
        .order_by_asc(price_tier::Column::CustomerType)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a service, or deactivates it when bookings still reference it.
pub async fn delete_service(db: &DatabaseConnection, service_id: i64) -> Result<DeleteOutcome> {
    let existing = require_service(db, service_id).await?;

    let referenced = BookingLineItem::find()
        .filter(booking_line_item::Column::ServiceId.eq(service_id))
        .count(db)
        .await?
        > 0;

    if referenced {
        let mut active: service::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(chrono::Utc::now());
        active.update(db).await?;
        tracing::info!(service_id, "Deactivated service with booking history");
        return Ok(DeleteOutcome::Deactivated);
    }

    existing.delete(db).await?;
    tracing::info!(service_id, "Deleted service");
    Ok(DeleteOutcome::Deleted)
}

/// Creates every seeded service whose name is not in the catalog yet.
///
/// Existing services are left untouched, so running the seed on every startup
/// is safe. Returns how many services were created.
pub async fn seed_services(db: &DatabaseConnection, seeds: &[ServiceInput]) -> Result<usize> {
    let mut created = 0;
    for seed in seeds {
        let exists = Service::find()
            .filter(service::Column::Name.eq(seed.name.trim()))
            .count(db)
            .await?
            > 0;
        if exists {
            tracing::debug!(name = %seed.name, "Seed service already present");
            continue;
        }
        create_service(db, seed.clone()).await?;
        created += 1;
    }

    if created > 0 {
        tracing::info!(created, "Seeded services from configuration");
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Main Auditorium"), "main-auditorium");
        assert_eq!(slugify("  Lab #3 (Chemistry) "), "lab-3-chemistry");
        assert_eq!(slugify("!!!"), "");
    }

    #[tokio::test]
    async fn test_create_service_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let mut input = flat_service_input("   ", 1000);
        let result = create_service(&db, input.clone()).await;
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "name"));

        input.name = "Hall".to_string();
        input.base_price = -5;
        let result = create_service(&db, input.clone()).await;
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "base_price"));

        input.base_price = 0;
        input.is_price_per_type = true;
        input.prices = vec![
            TierPrice {
                customer_type: CustomerType::Student,
                price: 10,
            },
            TierPrice {
                customer_type: CustomerType::Student,
                price: 20,
            },
        ];
        let result = create_service(&db, input).await;
        assert!(
            matches!(result, Err(Error::Validation { field, .. }) if field == "customer_type")
        );

        // Nothing was written
        assert_eq!(Service::find().count(&db).await?, 0);
        assert_eq!(PriceTier::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_service_generates_slug_and_tiers() -> Result<()> {
        let db = setup_test_db().await?;

        let service = create_tiered_service(&db, "Main Hall", &[
            (CustomerType::Student, 20_000),
            (CustomerType::General, 35_000),
        ])
        .await?;

        assert!(service.slug.starts_with("main-hall-"));
        assert_eq!(service.slug.len(), "main-hall-".len() + SLUG_SUFFIX_LEN);
        assert!(service.is_active);

        let tiers = get_price_tiers(&db, service.id).await?;
        assert_eq!(tiers.len(), 2);
        assert_eq!(tiers[0].customer_type, "general");
        assert_eq!(tiers[0].price, 35_000);

        let by_slug = get_service_by_slug(&db, &service.slug).await?.unwrap();
        assert_eq!(by_slug.id, service.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_service_replaces_tiers() -> Result<()> {
        let db = setup_test_db().await?;
        let service = create_tiered_service(&db, "Studio", &[
            (CustomerType::Student, 20_000),
            (CustomerType::General, 35_000),
        ])
        .await?;

        let mut input = flat_service_input("Studio B", 0);
        input.is_price_per_type = true;
        input.prices = vec![TierPrice {
            customer_type: CustomerType::Affiliate,
            price: 25_000,
        }];
        let updated = update_service(&db, service.id, input).await?;

        assert_eq!(updated.name, "Studio B");
        assert_eq!(updated.slug, service.slug);
        let tiers = get_price_tiers(&db, service.id).await?;
        assert_eq!(tiers.len(), 1);
        assert_eq!(tiers[0].customer_type, "affiliate");

        // Switching to flat pricing drops every tier
        update_service(&db, service.id, flat_service_input("Studio B", 40_000)).await?;
        assert!(get_price_tiers(&db, service.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_service() -> Result<()> {
        let db = setup_test_db().await?;
        let result = update_service(&db, 404, flat_service_input("Ghost", 1)).await;
        assert!(matches!(result, Err(Error::ServiceNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_priced_tiers_are_skipped() -> Result<()> {
        let db = setup_test_db().await?;
        let service = create_tiered_service(&db, "Court", &[
            (CustomerType::General, 0),
            (CustomerType::Student, 5_000),
        ])
        .await?;

        let tiers = get_price_tiers(&db, service.id).await?;
        assert_eq!(tiers.len(), 1);
        assert_eq!(tiers[0].customer_type, "student");
        Ok(())
    }

    #[tokio::test]
    async fn test_search_and_listing_skip_inactive() -> Result<()> {
        let db = setup_test_db().await?;
        let hall = create_test_service(&db, "Great Hall", 50_000).await?;
        let mut input = flat_service_input("Small Hall", 10_000);
        input.is_active = false;
        create_service(&db, input).await?;
        let lab = create_test_service(&db, "Computer Lab", 30_000).await?;

        let active = list_active_services(&db).await?;
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].id, lab.id);

        let found = search_services(&db, "Hall").await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, hall.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_service_without_bookings() -> Result<()> {
        let db = setup_test_db().await?;
        let service = create_test_service(&db, "Tent", 5_000).await?;

        assert_eq!(delete_service(&db, service.id).await?, DeleteOutcome::Deleted);
        assert!(get_service(&db, service.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_service_with_bookings_deactivates() -> Result<()> {
        let db = setup_test_db().await?;
        let service = create_test_service(&db, "Bus", 100_000).await?;
        create_test_booking(&db, service.id, date(2024, 3, 1), date(2024, 3, 2)).await?;

        assert_eq!(
            delete_service(&db, service.id).await?,
            DeleteOutcome::Deactivated
        );
        let kept = get_service(&db, service.id).await?.unwrap();
        assert!(!kept.is_active);
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_services_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let seeds = vec![
            flat_service_input("Main Hall", 500_000),
            flat_service_input("Sports Field", 150_000),
        ];

        assert_eq!(seed_services(&db, &seeds).await?, 2);
        assert_eq!(seed_services(&db, &seeds).await?, 0);
        assert_eq!(Service::find().count(&db).await?, 2);
        Ok(())
    }
}
