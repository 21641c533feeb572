//! Cart business logic and visitor identity.
//!
//! Every cart operation first resolves a [`CartOwner`] from the caller's
//! [`VisitorContext`]: the authenticated user when there is one, otherwise the
//! anonymous session token. The token is supplied by the caller (a cookie or a
//! header); when it is missing a fresh one is minted and handed back so the
//! caller can persist it for the rest of the visit.

use crate::{
    core::{
        availability::DateRange,
        booking::{BookingDetails, BookingOrigin, LineRequest, insert_booking,
            retry_on_invoice_collision},
        invoice::InvoiceGenerator,
        status::CustomerType,
    },
    entities::{Cart, cart},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What the caller knows about the current visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitorContext {
    /// Authenticated user, if any
    pub user_id: Option<i64>,
    /// Anonymous session token carried by the visitor, if any
    pub session_token: Option<String>,
}

/// Key that scopes cart rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum CartOwner {
    /// Authenticated user
    User(i64),
    /// Anonymous session token
    Session(String),
}

/// Outcome of [`resolve_cart_owner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOwner {
    /// Owner to scope cart rows by
    pub owner: CartOwner,
    /// Newly minted session token the caller must persist
    pub issued_token: Option<String>,
}

/// A service selection to put into the cart.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CartItemInput {
    /// Selected service
    pub service_id: i64,
    /// Customer type to price as
    pub customer_type: CustomerType,
    /// First requested day
    pub start_date: NaiveDate,
    /// Last requested day
    pub end_date: NaiveDate,
}

/// Resolves who owns the cart for this request.
///
/// An authenticated user always wins; the session token is then ignored.
#[must_use]
pub fn resolve_cart_owner(ctx: &VisitorContext) -> ResolvedOwner {
    if let Some(user_id) = ctx.user_id {
        return ResolvedOwner {
            owner: CartOwner::User(user_id),
            issued_token: None,
        };
    }

    match ctx
        .session_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        Some(token) => ResolvedOwner {
            owner: CartOwner::Session(token.to_string()),
            issued_token: None,
        },
        None => {
            let token = uuid::Uuid::new_v4().to_string();
            ResolvedOwner {
                owner: CartOwner::Session(token.clone()),
                issued_token: Some(token),
            }
        }
    }
}

fn owner_filter(owner: &CartOwner) -> sea_orm::Condition {
    match owner {
        CartOwner::User(id) => sea_orm::Condition::all().add(cart::Column::UserId.eq(*id)),
        CartOwner::Session(token) => sea_orm::Condition::all()
            .add(cart::Column::UserId.is_null())
            .add(cart::Column::SessionId.eq(token.as_str())),
    }
}

/// Lists the owner's cart rows in the order they were added.
pub async fn list_cart_items<C>(conn: &C, owner: &CartOwner) -> Result<Vec<cart::Model>>
where
    C: ConnectionTrait,
{
    Cart::find()
        .filter(owner_filter(owner))
        .order_by_asc(cart::Column::Id)
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Counts the owner's cart rows.
pub async fn count_cart_items(db: &DatabaseConnection, owner: &CartOwner) -> Result<u64> {
    Cart::find()
        .filter(owner_filter(owner))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Puts a service into the owner's cart, replacing an earlier selection of the
/// same service.
pub async fn add_to_cart(
    db: &DatabaseConnection,
    owner: &CartOwner,
    input: &CartItemInput,
) -> Result<cart::Model> {
    let range = DateRange::new(input.start_date, input.end_date)?;
    let service = crate::core::service::require_service(db, input.service_id).await?;
    if !service.is_active {
        return Err(Error::ServiceInactive { id: service.id });
    }

    let existing = Cart::find()
        .filter(owner_filter(owner))
        .filter(cart::Column::ServiceId.eq(input.service_id))
        .one(db)
        .await?;

    let saved = if let Some(row) = existing {
        let mut active: cart::ActiveModel = row.into();
        active.customer_type = Set(input.customer_type.as_str().to_string());
        active.start_date = Set(range.start());
        active.end_date = Set(range.end());
        active.qty = Set(range.days());
        active.update(db).await?
    } else {
        let (user_id, session_id) = match owner {
            CartOwner::User(id) => (Some(*id), None),
            CartOwner::Session(token) => (None, Some(token.clone())),
        };
        cart::ActiveModel {
            user_id: Set(user_id),
            session_id: Set(session_id),
            service_id: Set(input.service_id),
            customer_type: Set(input.customer_type.as_str().to_string()),
            start_date: Set(range.start()),
            end_date: Set(range.end()),
            qty: Set(range.days()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?
    };

    tracing::debug!(cart_id = saved.id, service_id = input.service_id, "Saved cart item");
    Ok(saved)
}

/// Removes one of the owner's cart rows.
pub async fn remove_cart_item(
    db: &DatabaseConnection,
    owner: &CartOwner,
    cart_id: i64,
) -> Result<()> {
    let deleted = Cart::delete_many()
        .filter(owner_filter(owner))
        .filter(cart::Column::Id.eq(cart_id))
        .exec(db)
        .await?;

    if deleted.rows_affected == 0 {
        return Err(Error::CartItemNotFound { id: cart_id });
    }
    Ok(())
}

/// Empties the owner's cart, returning how many rows were removed.
pub async fn clear_cart<C>(conn: &C, owner: &CartOwner) -> Result<u64>
where
    C: ConnectionTrait,
{
    let deleted = Cart::delete_many()
        .filter(owner_filter(owner))
        .exec(conn)
        .await?;
    Ok(deleted.rows_affected)
}

/// Moves an anonymous session's cart rows to a user after login.
///
/// When the user already has a row for the same service, the user's row is
/// kept and the session row is dropped. Returns how many rows moved.
pub async fn merge_session_cart(
    db: &DatabaseConnection,
    session_token: &str,
    user_id: i64,
) -> Result<u64> {
    let session = CartOwner::Session(session_token.to_string());
    let user = CartOwner::User(user_id);

    let txn = db.begin().await?;
    let taken: HashSet<i64> = list_cart_items(&txn, &user)
        .await?
        .into_iter()
        .map(|row| row.service_id)
        .collect();

    let mut moved = 0;
    for row in list_cart_items(&txn, &session).await? {
        if taken.contains(&row.service_id) {
            row.delete(&txn).await?;
            continue;
        }
        let mut active: cart::ActiveModel = row.into();
        active.user_id = Set(Some(user_id));
        active.session_id = Set(None);
        active.update(&txn).await?;
        moved += 1;
    }
    txn.commit().await?;

    tracing::info!(user_id, moved, "Merged session cart into user cart");
    Ok(moved)
}

/// Books everything in the owner's cart as a single booking and empties the cart.
///
/// Every row is availability-checked and priced again; if any row fails, the
/// booking is not written and the cart is left untouched.
pub async fn checkout_cart(
    db: &DatabaseConnection,
    invoices: &InvoiceGenerator,
    owner: &CartOwner,
) -> Result<BookingDetails> {
    let rows = list_cart_items(db, owner).await?;
    if rows.is_empty() {
        return Err(Error::validation("cart", "cart is empty"));
    }

    let lines = rows
        .iter()
        .map(|row| -> Result<LineRequest> {
            Ok(LineRequest {
                service_id: row.service_id,
                customer_type: row.customer_type.parse()?,
                range: DateRange::new(row.start_date, row.end_date)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let user_id = match owner {
        CartOwner::User(id) => Some(*id),
        CartOwner::Session(_) => None,
    };

    let lines = lines.as_slice();
    retry_on_invoice_collision(|| async move {
        let txn = db.begin().await?;
        let details = insert_booking(&txn, invoices, user_id, lines, BookingOrigin::Customer).await?;
        clear_cart(&txn, owner).await?;
        txn.commit().await?;
        Ok(details)
    })
    .await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{entities::Booking, test_utils::*};

    fn item(service_id: i64, start: NaiveDate, end: NaiveDate) -> CartItemInput {
        CartItemInput {
            service_id,
            customer_type: CustomerType::General,
            start_date: start,
            end_date: end,
        }
    }

    #[test]
    fn test_user_wins_over_session() {
        let resolved = resolve_cart_owner(&VisitorContext {
            user_id: Some(7),
            session_token: Some("abc".to_string()),
        });
        assert_eq!(resolved.owner, CartOwner::User(7));
        assert!(resolved.issued_token.is_none());
    }

    #[test]
    fn test_existing_session_token_is_reused() {
        let ctx = VisitorContext {
            user_id: None,
            session_token: Some("visitor-1".to_string()),
        };
        let first = resolve_cart_owner(&ctx);
        let second = resolve_cart_owner(&ctx);
        assert_eq!(first.owner, CartOwner::Session("visitor-1".to_string()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_token_is_minted_once() {
        let resolved = resolve_cart_owner(&VisitorContext::default());
        let token = resolved.issued_token.clone().unwrap();
        assert_eq!(resolved.owner, CartOwner::Session(token.clone()));

        // Threading the issued token through the next request keeps the owner
        let next = resolve_cart_owner(&VisitorContext {
            user_id: None,
            session_token: Some(token),
        });
        assert_eq!(next.owner, resolved.owner);
        assert!(next.issued_token.is_none());
    }

    #[tokio::test]
    async fn test_carts_are_scoped_by_owner() -> Result<()> {
        let db = setup_test_db().await?;
        let service = create_test_service(&db, "Hall", 50_000).await?;
        let visitor = CartOwner::Session("visitor".to_string());
        let other = CartOwner::Session("other".to_string());
        let user = CartOwner::User(TEST_USER_ID);

        add_to_cart(&db, &visitor, &item(service.id, date(2024, 1, 1), date(2024, 1, 2))).await?;
        add_to_cart(&db, &user, &item(service.id, date(2024, 2, 1), date(2024, 2, 2))).await?;

        assert_eq!(count_cart_items(&db, &visitor).await?, 1);
        assert_eq!(count_cart_items(&db, &user).await?, 1);
        assert_eq!(count_cart_items(&db, &other).await?, 0);

        let rows = list_cart_items(&db, &visitor).await?;
        assert_eq!(rows[0].session_id.as_deref(), Some("visitor"));
        assert_eq!(rows[0].qty, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_same_service_replaces_selection() -> Result<()> {
        let db = setup_test_db().await?;
        let service = create_test_service(&db, "Hall", 50_000).await?;
        let owner = CartOwner::User(TEST_USER_ID);

        let first =
            add_to_cart(&db, &owner, &item(service.id, date(2024, 1, 1), date(2024, 1, 2))).await?;
        let second =
            add_to_cart(&db, &owner, &item(service.id, date(2024, 1, 5), date(2024, 1, 9))).await?;

        assert_eq!(first.id, second.id);
        assert_eq!(second.qty, 5);
        assert_eq!(count_cart_items(&db, &owner).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_is_owner_scoped() -> Result<()> {
        let db = setup_test_db().await?;
        let service = create_test_service(&db, "Hall", 50_000).await?;
        let owner = CartOwner::Session("mine".to_string());
        let row =
            add_to_cart(&db, &owner, &item(service.id, date(2024, 1, 1), date(2024, 1, 2))).await?;

        let stranger = CartOwner::Session("theirs".to_string());
        let result = remove_cart_item(&db, &stranger, row.id).await;
        assert!(matches!(result, Err(Error::CartItemNotFound { .. })));

        remove_cart_item(&db, &owner, row.id).await?;
        assert_eq!(count_cart_items(&db, &owner).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_merge_session_cart_prefers_user_rows() -> Result<()> {
        let db = setup_test_db().await?;
        let hall = create_test_service(&db, "Hall", 50_000).await?;
        let lab = create_test_service(&db, "Lab", 20_000).await?;
        let session = CartOwner::Session("anon".to_string());
        let user = CartOwner::User(TEST_USER_ID);

        add_to_cart(&db, &session, &item(hall.id, date(2024, 1, 1), date(2024, 1, 2))).await?;
        add_to_cart(&db, &session, &item(lab.id, date(2024, 1, 3), date(2024, 1, 4))).await?;
        add_to_cart(&db, &user, &item(hall.id, date(2024, 3, 1), date(2024, 3, 1))).await?;

        let moved = merge_session_cart(&db, "anon", TEST_USER_ID).await?;
        assert_eq!(moved, 1);
        assert_eq!(count_cart_items(&db, &session).await?, 0);

        let rows = list_cart_items(&db, &user).await?;
        assert_eq!(rows.len(), 2);
        let hall_row = rows.iter().find(|r| r.service_id == hall.id).unwrap();
        assert_eq!(hall_row.start_date, date(2024, 3, 1));
        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_books_every_row_and_clears_cart() -> Result<()> {
        let db = setup_test_db().await?;
        let invoices = InvoiceGenerator::default();
        let hall = create_test_service(&db, "Hall", 50_000).await?;
        let lab = create_test_service(&db, "Lab", 20_000).await?;
        let owner = CartOwner::User(TEST_USER_ID);

        add_to_cart(&db, &owner, &item(hall.id, date(2024, 1, 1), date(2024, 1, 2))).await?;
        add_to_cart(&db, &owner, &item(lab.id, date(2024, 1, 1), date(2024, 1, 3))).await?;

        let details = checkout_cart(&db, &invoices, &owner).await?;
        assert_eq!(details.booking.user_id, Some(TEST_USER_ID));
        assert_eq!(details.line_items.len(), 2);
        assert_eq!(details.booking.total_amount, 2 * 50_000 + 3 * 20_000);
        assert_eq!(count_cart_items(&db, &owner).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_checkout_keeps_cart() -> Result<()> {
        let db = setup_test_db().await?;
        let invoices = InvoiceGenerator::default();
        let hall = create_test_service(&db, "Hall", 50_000).await?;
        let owner = CartOwner::Session("anon".to_string());

        add_to_cart(&db, &owner, &item(hall.id, date(2024, 1, 1), date(2024, 1, 5))).await?;
        create_test_booking(&db, hall.id, date(2024, 1, 4), date(2024, 1, 4)).await?;

        let result = checkout_cart(&db, &invoices, &owner).await;
        assert!(matches!(result, Err(Error::DateRangeUnavailable { .. })));
        assert_eq!(count_cart_items(&db, &owner).await?, 1);
        assert_eq!(Booking::find().count(&db).await?, 1);

        let empty = checkout_cart(&db, &invoices, &CartOwner::User(99)).await;
        assert!(matches!(empty, Err(Error::Validation { .. })));
        Ok(())
    }
}
