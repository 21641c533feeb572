//! Rating entity - A 1 to 5 star review of a service by one user.
//!
//! `(service_id, user_id)` is unique (index created in `config::database`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Rating database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ratings")]
pub struct Model {
    /// Unique identifier for the rating
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Rated service
    pub service_id: i64,
    /// Reviewing user
    pub user_id: i64,
    /// Star rating between 1 and 5
    pub rating: i32,
    /// Optional free-text review
    pub review: Option<String>,
    /// When the rating was first submitted
    pub created_at: DateTimeUtc,
    /// When the rating was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Rating and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each rating belongs to one service
    #[sea_orm(
        belongs_to = "super::service::Entity",
        from = "Column::ServiceId",
        to = "super::service::Column::Id",
        on_delete = "Cascade"
    )]
    Service,
}

impl Related<super::service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Service.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
