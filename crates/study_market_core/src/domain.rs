//! crates/study_market_core/src/domain.rs
//!
//! Defines the pure, core data structures for the marketplace.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Accounts
//=========================================================================================

/// A user's public profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub grade: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// Fields a user may change on their own profile. `None` leaves a field as-is.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub grade: Option<String>,
}

//=========================================================================================
// Notes
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteStatus {
    Active,
    Removed,
}

impl NoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteStatus::Active => "active",
            NoteStatus::Removed => "removed",
        }
    }
}

impl FromStr for NoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(NoteStatus::Active),
            "removed" => Ok(NoteStatus::Removed),
            other => Err(format!("unknown note status '{}'", other)),
        }
    }
}

/// A unit of sellable study material listed on the marketplace.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub subject: String,
    pub university: String,
    pub course_code: Option<String>,
    pub professor_name: Option<String>,
    pub semester: Option<String>,
    pub year: Option<i32>,
    pub price: f64,
    pub rating: Option<f64>,
    pub reviews_count: i32,
    pub downloads_count: i32,
    pub content_type: String,
    pub preview_available: bool,
    pub file_path: String,
    pub preview_file_path: Option<String>,
    pub file_size: Option<i64>,
    pub status: NoteStatus,
    pub created_at: DateTime<Utc>,
}

/// The data needed to insert a freshly uploaded note.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub seller_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub subject: String,
    pub university: String,
    pub course_code: Option<String>,
    pub professor_name: Option<String>,
    pub semester: Option<String>,
    pub year: Option<i32>,
    pub price: f64,
    pub content_type: String,
    pub preview_available: bool,
    pub file_path: String,
    pub preview_file_path: Option<String>,
    pub file_size: Option<i64>,
}

//=========================================================================================
// Purchases & Wishlist
//=========================================================================================

/// An append-only record of a buyer acquiring a note.
///
/// `purchase_price` is a snapshot taken at purchase time and never follows
/// later edits of the note's listed price.
#[derive(Debug, Clone, PartialEq)]
pub struct Purchase {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub note_id: Uuid,
    pub purchase_price: f64,
    pub payment_status: String,
    pub payment_method_id: Option<String>,
    pub transaction_id: Option<String>,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub buyer_id: Uuid,
    pub note_id: Uuid,
    pub purchase_price: f64,
    pub payment_status: String,
    pub payment_method_id: Option<String>,
    pub transaction_id: Option<String>,
}

/// A note joined with the buyer's purchase snapshot, as shown in "My Notes".
#[derive(Debug, Clone)]
pub struct PurchasedNote {
    pub note: Note,
    pub purchase_price: f64,
    pub purchased_at: DateTime<Utc>,
}

/// Result of toggling a note on a user's wishlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishlistChange {
    Added,
    Removed,
}

//=========================================================================================
// Orders
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "in_progress" => Ok(OrderStatus::InProgress),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status '{}'", other)),
        }
    }
}

/// A paid "assignment help" order.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub grade: String,
    pub assignment_type: String,
    pub title: String,
    pub description: String,
    pub pages: i32,
    pub deadline: DateTime<Utc>,
    pub design_preference: Option<String>,
    pub special_instructions: Option<String>,
    pub estimated_price: Option<f64>,
    pub estimated_time: Option<String>,
    pub payment_method_id: Option<String>,
    pub payment_status: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_amount: Option<f64>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub subject: String,
    pub grade: String,
    pub assignment_type: String,
    pub title: String,
    pub description: String,
    pub pages: i32,
    pub deadline: DateTime<Utc>,
    pub design_preference: Option<String>,
    pub special_instructions: Option<String>,
    pub estimated_price: f64,
    pub estimated_time: String,
    pub payment_method_id: String,
    pub payment_status: String,
    pub transaction_id: String,
    pub payment_amount: f64,
}

/// The admin-editable part of an order. `None` clears the estimate fields.
#[derive(Debug, Clone)]
pub struct OrderUpdate {
    pub status: OrderStatus,
    pub estimated_price: Option<f64>,
    pub estimated_time: Option<String>,
}

/// An order together with the customer it belongs to, for the admin view.
#[derive(Debug, Clone)]
pub struct OrderWithCustomer {
    pub order: Order,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// A file attached to an order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderFile {
    pub id: Uuid,
    pub order_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrderFile {
    pub order_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_parses_its_own_labels() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::InProgress,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn note_status_rejects_unknown_values() {
        assert_eq!("active".parse::<NoteStatus>(), Ok(NoteStatus::Active));
        assert!("archived".parse::<NoteStatus>().is_err());
    }
}
