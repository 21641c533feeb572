//! Rating business logic and review statistics.
//!
//! A user holds at most one rating per service. [`rate`] is the first-time
//! path and refuses a second submission; [`store_rating`] replaces whatever the
//! user rated before; [`update_rating`] only touches an existing rating.

use crate::{
    core::status::BookingStatus,
    entities::{Booking, BookingLineItem, Rating, booking, booking_line_item, rating},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Longest review accepted by [`rate`].
pub const RATE_REVIEW_MAX_CHARS: usize = 255;
/// Longest review accepted by [`store_rating`] and [`update_rating`].
pub const STORE_REVIEW_MAX_CHARS: usize = 1000;

/// A star rating with an optional review.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RatingInput {
    /// Stars between 1 and 5
    pub rating: i32,
    /// Free-text review
    #[serde(default)]
    pub review: Option<String>,
}

/// Count and share of one star value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StarBucket {
    /// Star value, 5 down to 1
    pub stars: i32,
    /// Ratings with this value
    pub count: u64,
    /// Rounded share of all ratings, 0 to 100
    pub percentage: u32,
}

/// Aggregated ratings of one service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingStats {
    /// Mean star value, 0 when there are no ratings
    pub average: f64,
    /// Number of ratings
    pub total_count: u64,
    /// `average / 5 * 100`, rounded
    pub percentage: u32,
    /// One bucket per star value, 5 stars first
    pub breakdown: Vec<StarBucket>,
}

fn validate(input: &RatingInput, max_review_chars: usize) -> Result<Option<String>> {
    if !(1..=5).contains(&input.rating) {
        return Err(Error::validation("rating", "rating must be between 1 and 5"));
    }

    let review = input
        .review
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);
    if review
        .as_deref()
        .is_some_and(|r| r.chars().count() > max_review_chars)
    {
        return Err(Error::validation(
            "review",
            format!("review must be at most {max_review_chars} characters"),
        ));
    }
    Ok(review)
}

async fn find_rating<C>(conn: &C, service_id: i64, user_id: i64) -> Result<Option<rating::Model>>
where
    C: ConnectionTrait,
{
    Rating::find()
        .filter(rating::Column::ServiceId.eq(service_id))
        .filter(rating::Column::UserId.eq(user_id))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Records a user's first rating of a service.
///
/// # Errors
/// [`Error::AlreadyRated`] when the user has rated the service before.
pub async fn rate(
    db: &DatabaseConnection,
    service_id: i64,
    user_id: i64,
    input: &RatingInput,
) -> Result<rating::Model> {
    let review = validate(input, RATE_REVIEW_MAX_CHARS)?;

    let txn = db.begin().await?;
    crate::core::service::require_service(&txn, service_id).await?;
    if find_rating(&txn, service_id, user_id).await?.is_some() {
        return Err(Error::AlreadyRated {
            service_id,
            user_id,
        });
    }

    let created = insert_rating(&txn, service_id, user_id, input.rating, review).await?;
    txn.commit().await?;

    tracing::info!(target: "audit", service_id, user_id, rating = input.rating, "Rating created");
    Ok(created)
}

/// Inserts a first rating, reporting a lost race on the unique key as
/// [`Error::AlreadyRated`].
async fn insert_rating<C>(
    conn: &C,
    service_id: i64,
    user_id: i64,
    stars: i32,
    review: Option<String>,
) -> Result<rating::Model>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    rating::ActiveModel {
        service_id: Set(service_id),
        user_id: Set(user_id),
        rating: Set(stars),
        review: Set(review),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|e| {
        if crate::core::invoice::is_unique_violation(&e) {
            Error::AlreadyRated {
                service_id,
                user_id,
            }
        } else {
            e.into()
        }
    })
}

/// Runs `attempt` a second time when it lost the first-insert race.
async fn retry_after_rating_race<T, F, Fut>(mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match attempt().await {
        Err(Error::AlreadyRated {
            service_id,
            user_id,
        }) => {
            tracing::debug!(service_id, user_id, "Rating inserted concurrently, updating it");
            attempt().await
        }
        other => other,
    }
}

/// Creates the user's rating or replaces the existing one.
pub async fn store_rating(
    db: &DatabaseConnection,
    service_id: i64,
    user_id: i64,
    input: &RatingInput,
) -> Result<rating::Model> {
    let review = validate(input, STORE_REVIEW_MAX_CHARS)?;

    let saved = retry_after_rating_race(|| {
        let review = review.clone();
        async move {
            let txn = db.begin().await?;
            crate::core::service::require_service(&txn, service_id).await?;

            let saved = if let Some(existing) = find_rating(&txn, service_id, user_id).await? {
                let mut active: rating::ActiveModel = existing.into();
                active.rating = Set(input.rating);
                active.review = Set(review);
                active.updated_at = Set(Utc::now());
                active.update(&txn).await?
            } else {
                insert_rating(&txn, service_id, user_id, input.rating, review).await?
            };
            txn.commit().await?;
            Ok(saved)
        }
    })
    .await?;

    tracing::info!(target: "audit", service_id, user_id, rating = input.rating, "Rating stored");
    Ok(saved)
}

/// Changes an existing rating.
///
/// # Errors
/// [`Error::RatingNotFound`] when the user has not rated the service.
pub async fn update_rating(
    db: &DatabaseConnection,
    service_id: i64,
    user_id: i64,
    input: &RatingInput,
) -> Result<rating::Model> {
    let review = validate(input, STORE_REVIEW_MAX_CHARS)?;

    let existing = find_rating(db, service_id, user_id)
        .await?
        .ok_or(Error::RatingNotFound {
            service_id,
            user_id,
        })?;

    let mut active: rating::ActiveModel = existing.into();
    active.rating = Set(input.rating);
    active.review = Set(review);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    tracing::info!(target: "audit", service_id, user_id, rating = input.rating, "Rating updated");
    Ok(updated)
}

/// Deletes the user's rating of a service.
pub async fn delete_rating(db: &DatabaseConnection, service_id: i64, user_id: i64) -> Result<()> {
    let deleted = Rating::delete_many()
        .filter(rating::Column::ServiceId.eq(service_id))
        .filter(rating::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    if deleted.rows_affected == 0 {
        return Err(Error::RatingNotFound {
            service_id,
            user_id,
        });
    }

    tracing::info!(target: "audit", service_id, user_id, "Rating deleted");
    Ok(())
}

/// The user's rating of a service, if any.
pub async fn get_user_rating(
    db: &DatabaseConnection,
    service_id: i64,
    user_id: i64,
) -> Result<Option<rating::Model>> {
    find_rating(db, service_id, user_id).await
}

/// Ratings of a service, newest first.
pub async fn list_reviews(db: &DatabaseConnection, service_id: i64) -> Result<Vec<rating::Model>> {
    Rating::find()
        .filter(rating::Column::ServiceId.eq(service_id))
        .order_by_desc(rating::Column::CreatedAt)
        .order_by_desc(rating::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rounded_percent(part: f64, whole: f64) -> u32 {
    if whole <= 0.0 {
        return 0;
    }
    (part / whole * 100.0).round() as u32
}

/// Summarises a list of star values.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(stars: &[i32]) -> RatingStats {
    let total_count = stars.len() as u64;
    let average = if stars.is_empty() {
        0.0
    } else {
        f64::from(stars.iter().sum::<i32>()) / stars.len() as f64
    };

    let breakdown = (1..=5)
        .rev()
        .map(|value| {
            let count = stars.iter().filter(|&&s| s == value).count() as u64;
            StarBucket {
                stars: value,
                count,
                percentage: rounded_percent(count as f64, total_count as f64),
            }
        })
        .collect();

    RatingStats {
        average,
        total_count,
        percentage: rounded_percent(average, 5.0),
        breakdown,
    }
}

/// Computes rating statistics of a service.
pub async fn compute_stats(db: &DatabaseConnection, service_id: i64) -> Result<RatingStats> {
    let stars: Vec<i32> = Rating::find()
        .select_only()
        .column(rating::Column::Rating)
        .filter(rating::Column::ServiceId.eq(service_id))
        .into_tuple()
        .all(db)
        .await?;
    Ok(summarize(&stars))
}

/// Whether the user has a completed booking of the service and so may review it.
pub async fn can_review(db: &DatabaseConnection, service_id: i64, user_id: i64) -> Result<bool> {
    let completed = BookingLineItem::find()
        .inner_join(Booking)
        .filter(booking_line_item::Column::ServiceId.eq(service_id))
        .filter(booking::Column::UserId.eq(user_id))
        .filter(booking::Column::BookingStatus.eq(BookingStatus::Completed.as_str()))
        .count(db)
        .await?;
    Ok(completed > 0)
}
