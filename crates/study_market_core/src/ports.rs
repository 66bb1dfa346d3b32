//! crates/study_market_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the marketplace's core logic.
//! These traits form the boundary of the hexagonal architecture, so the core
//! stays independent of the concrete database and file storage.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::{
    NewNote, NewOrder, NewOrderFile, NewPurchase, Note, NoteStatus, Order, OrderFile,
    OrderUpdate, OrderWithCustomer, Profile, ProfileUpdate, Purchase, PurchasedNote,
    UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, disk).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflicting record: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage bucket names
//=========================================================================================

pub const NOTES_BUCKET: &str = "notes-files";
pub const ORDER_FILES_BUCKET: &str = "order-files";

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    // --- Accounts ---
    async fn create_profile(
        &self,
        email: &str,
        hashed_password: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> PortResult<Profile>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile>;

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<Profile>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owner of a live session, or `Unauthorized` for unknown/expired ones.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Notes ---
    /// Lists notes with the given status, newest first.
    async fn list_notes_by_status(&self, status: NoteStatus) -> PortResult<Vec<Note>>;

    /// Lists every note a seller uploaded, newest first.
    async fn list_notes_by_seller(&self, seller_id: Uuid) -> PortResult<Vec<Note>>;

    async fn get_note(&self, note_id: Uuid) -> PortResult<Note>;

    async fn insert_note(&self, note: NewNote) -> PortResult<Note>;

    /// Marks an active note as removed, but only when `seller_id` owns it.
    /// The row and its purchases are kept.
    async fn remove_note(&self, note_id: Uuid, seller_id: Uuid) -> PortResult<()>;

    // --- Purchases ---
    /// Appends a purchase. A second purchase of the same note by the same buyer is a `Conflict`.
    async fn insert_purchase(&self, purchase: NewPurchase) -> PortResult<Purchase>;

    async fn increment_download_count(&self, note_id: Uuid) -> PortResult<()>;

    /// Lists a buyer's purchases joined with their notes, newest purchase first.
    async fn list_purchases_by_buyer(&self, buyer_id: Uuid) -> PortResult<Vec<PurchasedNote>>;

    async fn has_purchased(&self, buyer_id: Uuid, note_id: Uuid) -> PortResult<bool>;

    // --- Wishlist ---
    async fn list_wishlist(&self, user_id: Uuid) -> PortResult<Vec<Uuid>>;

    async fn insert_wishlist_entry(&self, user_id: Uuid, note_id: Uuid) -> PortResult<()>;

    async fn delete_wishlist_entry(&self, user_id: Uuid, note_id: Uuid) -> PortResult<()>;

    // --- Orders ---
    async fn insert_order(&self, order: NewOrder) -> PortResult<Order>;

    async fn get_order(&self, order_id: Uuid) -> PortResult<Order>;

    async fn insert_order_file(&self, file: NewOrderFile) -> PortResult<OrderFile>;

    async fn list_orders_by_user(&self, user_id: Uuid) -> PortResult<Vec<Order>>;

    /// Lists all orders with their customers, newest first.
    async fn list_all_orders(&self) -> PortResult<Vec<OrderWithCustomer>>;

    async fn update_order(&self, order_id: Uuid, update: OrderUpdate) -> PortResult<Order>;
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Stores an object under `bucket/path`. Existing objects are not overwritten.
    async fn upload(&self, bucket: &str, path: &str, data: Bytes) -> PortResult<()>;

    /// Creates a time-limited URL through which the object can be downloaded.
    async fn create_signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in: Duration,
    ) -> PortResult<String>;

    /// Reads the object behind a signed token, failing once the token has expired.
    async fn read_signed(&self, token: &str) -> PortResult<Bytes>;

    /// Deletes the object at `bucket/path`. Missing objects are a `NotFound`.
    async fn remove(&self, bucket: &str, path: &str) -> PortResult<()>;
}
