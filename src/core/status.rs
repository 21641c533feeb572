//! Domain enums persisted as lowercase strings.
//!
//! Customer types, booking statuses and payment statuses live in the database as
//! plain text columns. These enums are the only way the rest of the crate reads or
//! writes them, and [`derive_booking_status`] is the single place where a payment
//! status turns into a booking status.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Pricing classification of a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    /// General public
    #[serde(alias = "umum")]
    General,
    /// Affiliated staff
    #[serde(alias = "civitas")]
    Affiliate,
    /// Students
    #[serde(alias = "mahasiswa")]
    Student,
}

impl CustomerType {
    /// All customer types, in display order.
    pub const ALL: [Self; 3] = [Self::General, Self::Affiliate, Self::Student];

    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Affiliate => "affiliate",
            Self::Student => "student",
        }
    }
}

impl FromStr for CustomerType {
    type Err = Error;

    /// Accepts the stored names plus the legacy form values `umum`, `civitas`
    /// and `mahasiswa`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" | "umum" => Ok(Self::General),
            "affiliate" | "civitas" => Ok(Self::Affiliate),
            "student" | "mahasiswa" => Ok(Self::Student),
            other => Err(Error::validation(
                "customer_type",
                format!("unknown customer type '{other}'"),
            )),
        }
    }
}

/// Lifecycle state of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Awaiting payment or verification
    Waiting,
    /// Payment verified, dates reserved
    Approved,
    /// Booking has been fulfilled
    Completed,
    /// Payment failed verification
    Rejected,
    /// Payment was refunded
    Cancelled,
}

impl BookingStatus {
    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Approved => "approved",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Statuses whose line items no longer hold their date range.
    pub const RELEASED: [Self; 2] = [Self::Rejected, Self::Cancelled];

    /// Whether a booking in this status still blocks its dates.
    #[must_use]
    pub const fn holds_dates(self) -> bool {
        !matches!(self, Self::Rejected | Self::Cancelled)
    }
}

impl FromStr for BookingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "approved" => Ok(Self::Approved),
            "completed" => Ok(Self::Completed),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(Error::validation(
                "booking_status",
                format!("unknown booking status '{other}'"),
            )),
        }
    }
}

/// State of a single payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Nothing paid yet
    Unpaid,
    /// Proof submitted, awaiting verification
    Pending,
    /// Verified as paid
    Paid,
    /// Verification failed
    Failed,
    /// Money returned to the customer
    Refunded,
}

impl PaymentStatus {
    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "unpaid" => Ok(Self::Unpaid),
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            other => Err(Error::validation(
                "payment_status",
                format!("unknown payment status '{other}'"),
            )),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(CustomerType, BookingStatus, PaymentStatus);

/// Maps a payment status onto the booking status it implies.
///
/// The result overwrites whatever status the booking had before. `completed`
/// is never produced here.
#[must_use]
pub const fn derive_booking_status(payment_status: PaymentStatus) -> BookingStatus {
    match payment_status {
        PaymentStatus::Unpaid | PaymentStatus::Pending => BookingStatus::Waiting,
        PaymentStatus::Paid => BookingStatus::Approved,
        PaymentStatus::Failed => BookingStatus::Rejected,
        PaymentStatus::Refunded => BookingStatus::Cancelled,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_derive_booking_status_table() {
        assert_eq!(
            derive_booking_status(PaymentStatus::Unpaid),
            BookingStatus::Waiting
        );
        assert_eq!(
            derive_booking_status(PaymentStatus::Pending),
            BookingStatus::Waiting
        );
        assert_eq!(
            derive_booking_status(PaymentStatus::Paid),
            BookingStatus::Approved
        );
        assert_eq!(
            derive_booking_status(PaymentStatus::Failed),
            BookingStatus::Rejected
        );
        assert_eq!(
            derive_booking_status(PaymentStatus::Refunded),
            BookingStatus::Cancelled
        );
    }

    #[test]
    fn test_customer_type_legacy_aliases() {
        assert_eq!("umum".parse::<CustomerType>().unwrap(), CustomerType::General);
        assert_eq!(
            "civitas".parse::<CustomerType>().unwrap(),
            CustomerType::Affiliate
        );
        assert_eq!(
            " Mahasiswa ".parse::<CustomerType>().unwrap(),
            CustomerType::Student
        );
        assert!(matches!(
            "vip".parse::<CustomerType>(),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_status_strings_parse_back() {
        for status in [
            BookingStatus::Waiting,
            BookingStatus::Approved,
            BookingStatus::Completed,
            BookingStatus::Rejected,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
        assert!("settled".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_released_statuses_do_not_hold_dates() {
        assert!(BookingStatus::Waiting.holds_dates());
        assert!(BookingStatus::Completed.holds_dates());
        for status in BookingStatus::RELEASED {
            assert!(!status.holds_dates());
        }
    }
}
