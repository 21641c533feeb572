//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod booking;
pub mod booking_line_item;
pub mod cart;
pub mod invoice_counter;
pub mod payment;
pub mod price_tier;
pub mod rating;
pub mod service;

// Re-export specific types to avoid conflicts
pub use booking::{Column as BookingColumn, Entity as Booking, Model as BookingModel};
pub use booking_line_item::{
    Column as BookingLineItemColumn, Entity as BookingLineItem, Model as BookingLineItemModel,
};
pub use cart::{Column as CartColumn, Entity as Cart, Model as CartModel};
pub use invoice_counter::{
    Column as InvoiceCounterColumn, Entity as InvoiceCounter, Model as InvoiceCounterModel,
};
pub use payment::{Column as PaymentColumn, Entity as Payment, Model as PaymentModel};
pub use price_tier::{Column as PriceTierColumn, Entity as PriceTier, Model as PriceTierModel};
pub use rating::{Column as RatingColumn, Entity as Rating, Model as RatingModel};
pub use service::{Column as ServiceColumn, Entity as Service, Model as ServiceModel};
