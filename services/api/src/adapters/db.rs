//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `MarketplaceStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use study_market_core::domain::{
    NewNote, NewOrder, NewOrderFile, NewPurchase, Note, NoteStatus, Order, OrderFile,
    OrderStatus, OrderUpdate, OrderWithCustomer, Profile, ProfileUpdate, Purchase,
    PurchasedNote, UserCredentials,
};
use study_market_core::ports::{MarketplaceStore, PortError, PortResult};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `MarketplaceStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

const PROFILE_COLUMNS: &str = "id, email, first_name, last_name, grade, is_admin, created_at";

const NOTE_COLUMNS: &str = "id, seller_id, title, description, subject, university, course_code, \
     professor_name, semester, year, price, rating, reviews_count, downloads_count, content_type, \
     preview_available, file_path, preview_file_path, file_size, status, created_at";

const ORDER_COLUMNS: &str = "id, user_id, subject, grade, assignment_type, title, description, \
     pages, deadline, design_preference, special_instructions, estimated_price, estimated_time, \
     payment_method_id, payment_status, transaction_id, payment_amount, status, created_at, \
     updated_at";

const PURCHASE_COLUMNS: &str = "id, buyer_id, note_id, purchase_price, payment_status, \
     payment_method_id, transaction_id, purchased_at";

const ORDER_FILE_COLUMNS: &str =
    "id, order_id, file_name, file_path, file_size, file_type, created_at";

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        other => unexpected(other),
    }
}

fn conflict_or_unexpected(e: sqlx::Error, what: &str) -> PortError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict(what.to_string())
        }
        _ => unexpected(e),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ProfileRecord {
    id: Uuid,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    grade: Option<String>,
    is_admin: bool,
    created_at: DateTime<Utc>,
}
impl ProfileRecord {
    fn to_domain(self) -> Profile {
        Profile {
            id: self.id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            grade: self.grade,
            is_admin: self.is_admin,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    hashed_password: String,
}

#[derive(FromRow)]
struct NoteRecord {
    id: Uuid,
    seller_id: Uuid,
    title: String,
    description: Option<String>,
    subject: String,
    university: String,
    course_code: Option<String>,
    professor_name: Option<String>,
    semester: Option<String>,
    year: Option<i32>,
    price: f64,
    rating: Option<f64>,
    reviews_count: i32,
    downloads_count: i32,
    content_type: String,
    preview_available: bool,
    file_path: String,
    preview_file_path: Option<String>,
    file_size: Option<i64>,
    status: String,
    created_at: DateTime<Utc>,
}
impl NoteRecord {
    fn to_domain(self) -> Note {
        Note {
            id: self.id,
            seller_id: self.seller_id,
            title: self.title,
            description: self.description,
            subject: self.subject,
            university: self.university,
            course_code: self.course_code,
            professor_name: self.professor_name,
            semester: self.semester,
            year: self.year,
            price: self.price,
            rating: self.rating,
            reviews_count: self.reviews_count,
            downloads_count: self.downloads_count,
            content_type: self.content_type,
            preview_available: self.preview_available,
            file_path: self.file_path,
            preview_file_path: self.preview_file_path,
            file_size: self.file_size,
            // Anything that is not listed as active is treated as taken down.
            status: self.status.parse().unwrap_or(NoteStatus::Removed),
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct PurchaseRecord {
    id: Uuid,
    buyer_id: Uuid,
    note_id: Uuid,
    purchase_price: f64,
    payment_status: Option<String>,
    payment_method_id: Option<String>,
    transaction_id: Option<String>,
    purchased_at: DateTime<Utc>,
}
impl PurchaseRecord {
    fn to_domain(self) -> Purchase {
        Purchase {
            id: self.id,
            buyer_id: self.buyer_id,
            note_id: self.note_id,
            purchase_price: self.purchase_price,
            payment_status: self.payment_status.unwrap_or_default(),
            payment_method_id: self.payment_method_id,
            transaction_id: self.transaction_id,
            purchased_at: self.purchased_at,
        }
    }
}

#[derive(FromRow)]
struct PurchasedNoteRecord {
    #[sqlx(flatten)]
    note: NoteRecord,
    purchase_price: f64,
    purchased_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct OrderRecord {
    id: Uuid,
    user_id: Uuid,
    subject: String,
    grade: String,
    assignment_type: String,
    title: String,
    description: String,
    pages: i32,
    deadline: DateTime<Utc>,
    design_preference: Option<String>,
    special_instructions: Option<String>,
    estimated_price: Option<f64>,
    estimated_time: Option<String>,
    payment_method_id: Option<String>,
    payment_status: Option<String>,
    transaction_id: Option<String>,
    payment_amount: Option<f64>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl OrderRecord {
    fn to_domain(self) -> PortResult<Order> {
        let status = self
            .status
            .parse::<OrderStatus>()
            .map_err(PortError::Unexpected)?;
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            subject: self.subject,
            grade: self.grade,
            assignment_type: self.assignment_type,
            title: self.title,
            description: self.description,
            pages: self.pages,
            deadline: self.deadline,
            design_preference: self.design_preference,
            special_instructions: self.special_instructions,
            estimated_price: self.estimated_price,
            estimated_time: self.estimated_time,
            payment_method_id: self.payment_method_id,
            payment_status: self.payment_status,
            transaction_id: self.transaction_id,
            payment_amount: self.payment_amount,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct OrderWithCustomerRecord {
    #[sqlx(flatten)]
    order: OrderRecord,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
}

#[derive(FromRow)]
struct OrderFileRecord {
    id: Uuid,
    order_id: Uuid,
    file_name: String,
    file_path: String,
    file_size: Option<i64>,
    file_type: Option<String>,
    created_at: DateTime<Utc>,
}
impl OrderFileRecord {
    fn to_domain(self) -> OrderFile {
        OrderFile {
            id: self.id,
            order_id: self.order_id,
            file_name: self.file_name,
            file_path: self.file_path,
            file_size: self.file_size,
            file_type: self.file_type,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `MarketplaceStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl MarketplaceStore for DbAdapter {
    async fn create_profile(
        &self,
        email: &str,
        hashed_password: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> PortResult<Profile> {
        let sql = format!(
            "INSERT INTO profiles (email, hashed_password, first_name, last_name) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            PROFILE_COLUMNS
        );
        let record = sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(email)
            .bind(hashed_password)
            .bind(first_name)
            .bind(last_name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_or_unexpected(e, "An account with this email already exists"))?;
        Ok(record.to_domain())
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password FROM profiles WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("User {} not found", email)))?;

        Ok(UserCredentials {
            user_id: record.id,
            email: record.email,
            hashed_password: record.hashed_password,
        })
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        let sql = format!("SELECT {} FROM profiles WHERE id = $1", PROFILE_COLUMNS);
        let record = sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Profile {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<Profile> {
        let sql = format!(
            "UPDATE profiles SET first_name = COALESCE($2, first_name), \
             last_name = COALESCE($3, last_name), grade = COALESCE($4, grade), \
             updated_at = NOW() WHERE id = $1 RETURNING {}",
            PROFILE_COLUMNS
        );
        let record = sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(user_id)
            .bind(update.first_name)
            .bind(update.last_name)
            .bind(update.grade)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Profile {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Uuid = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::Unauthorized,
            other => unexpected(other),
        })?;
        Ok(user_id)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_notes_by_status(&self, status: NoteStatus) -> PortResult<Vec<Note>> {
        let sql = format!(
            "SELECT {} FROM notes WHERE status = $1 ORDER BY created_at DESC",
            NOTE_COLUMNS
        );
        let records = sqlx::query_as::<_, NoteRecord>(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_notes_by_seller(&self, seller_id: Uuid) -> PortResult<Vec<Note>> {
        let sql = format!(
            "SELECT {} FROM notes WHERE seller_id = $1 ORDER BY created_at DESC",
            NOTE_COLUMNS
        );
        let records = sqlx::query_as::<_, NoteRecord>(&sql)
            .bind(seller_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_note(&self, note_id: Uuid) -> PortResult<Note> {
        let sql = format!("SELECT {} FROM notes WHERE id = $1", NOTE_COLUMNS);
        let record = sqlx::query_as::<_, NoteRecord>(&sql)
            .bind(note_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Note {} not found", note_id)))?;
        Ok(record.to_domain())
    }

    async fn insert_note(&self, note: NewNote) -> PortResult<Note> {
        let sql = format!(
            "INSERT INTO notes (seller_id, title, description, subject, university, course_code, \
             professor_name, semester, year, price, content_type, preview_available, file_path, \
             preview_file_path, file_size, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, 'active') \
             RETURNING {}",
            NOTE_COLUMNS
        );
        let record = sqlx::query_as::<_, NoteRecord>(&sql)
            .bind(note.seller_id)
            .bind(note.title)
            .bind(note.description)
            .bind(note.subject)
            .bind(note.university)
            .bind(note.course_code)
            .bind(note.professor_name)
            .bind(note.semester)
            .bind(note.year)
            .bind(note.price)
            .bind(note.content_type)
            .bind(note.preview_available)
            .bind(note.file_path)
            .bind(note.preview_file_path)
            .bind(note.file_size)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn remove_note(&self, note_id: Uuid, seller_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE notes SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND seller_id = $2 AND status = $4",
        )
        .bind(note_id)
        .bind(seller_id)
        .bind(NoteStatus::Removed.as_str())
        .bind(NoteStatus::Active.as_str())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Note {} not found", note_id)));
        }
        Ok(())
    }

    async fn insert_purchase(&self, purchase: NewPurchase) -> PortResult<Purchase> {
        let sql = format!(
            "INSERT INTO note_purchases (buyer_id, note_id, purchase_price, payment_status, \
             payment_method_id, transaction_id) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            PURCHASE_COLUMNS
        );
        let record = sqlx::query_as::<_, PurchaseRecord>(&sql)
            .bind(purchase.buyer_id)
            .bind(purchase.note_id)
            .bind(purchase.purchase_price)
            .bind(purchase.payment_status)
            .bind(purchase.payment_method_id)
            .bind(purchase.transaction_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_or_unexpected(e, "Note already purchased"))?;
        Ok(record.to_domain())
    }

    async fn increment_download_count(&self, note_id: Uuid) -> PortResult<()> {
        sqlx::query("SELECT increment_downloads($1)")
            .bind(note_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_purchases_by_buyer(&self, buyer_id: Uuid) -> PortResult<Vec<PurchasedNote>> {
        let records = sqlx::query_as::<_, PurchasedNoteRecord>(
            "SELECT n.*, p.purchase_price, p.purchased_at \
             FROM note_purchases p JOIN notes n ON n.id = p.note_id \
             WHERE p.buyer_id = $1 ORDER BY p.purchased_at DESC",
        )
        .bind(buyer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records
            .into_iter()
            .map(|r| PurchasedNote {
                note: r.note.to_domain(),
                purchase_price: r.purchase_price,
                purchased_at: r.purchased_at,
            })
            .collect())
    }

    async fn has_purchased(&self, buyer_id: Uuid, note_id: Uuid) -> PortResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM note_purchases WHERE buyer_id = $1 AND note_id = $2)",
        )
        .bind(buyer_id)
        .bind(note_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(exists)
    }

    async fn list_wishlist(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT note_id FROM wishlists WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(ids)
    }

    async fn insert_wishlist_entry(&self, user_id: Uuid, note_id: Uuid) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO wishlists (user_id, note_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(note_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn delete_wishlist_entry(&self, user_id: Uuid, note_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM wishlists WHERE user_id = $1 AND note_id = $2")
            .bind(user_id)
            .bind(note_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn insert_order(&self, order: NewOrder) -> PortResult<Order> {
        let sql = format!(
            "INSERT INTO orders (user_id, subject, grade, assignment_type, title, description, \
             pages, deadline, design_preference, special_instructions, estimated_price, \
             estimated_time, payment_method_id, payment_status, transaction_id, payment_amount) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {}",
            ORDER_COLUMNS
        );
        let record = sqlx::query_as::<_, OrderRecord>(&sql)
            .bind(order.user_id)
            .bind(order.subject)
            .bind(order.grade)
            .bind(order.assignment_type)
            .bind(order.title)
            .bind(order.description)
            .bind(order.pages)
            .bind(order.deadline)
            .bind(order.design_preference)
            .bind(order.special_instructions)
            .bind(order.estimated_price)
            .bind(order.estimated_time)
            .bind(order.payment_method_id)
            .bind(order.payment_status)
            .bind(order.transaction_id)
            .bind(order.payment_amount)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_order(&self, order_id: Uuid) -> PortResult<Order> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let record = sqlx::query_as::<_, OrderRecord>(&sql)
            .bind(order_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Order {} not found", order_id)))?;
        record.to_domain()
    }

    async fn insert_order_file(&self, file: NewOrderFile) -> PortResult<OrderFile> {
        let sql = format!(
            "INSERT INTO order_files (order_id, file_name, file_path, file_size, file_type) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            ORDER_FILE_COLUMNS
        );
        let record = sqlx::query_as::<_, OrderFileRecord>(&sql)
            .bind(file.order_id)
            .bind(file.file_name)
            .bind(file.file_path)
            .bind(file.file_size)
            .bind(file.file_type)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_orders_by_user(&self, user_id: Uuid) -> PortResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
            ORDER_COLUMNS
        );
        let records = sqlx::query_as::<_, OrderRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn list_all_orders(&self) -> PortResult<Vec<OrderWithCustomer>> {
        let records = sqlx::query_as::<_, OrderWithCustomerRecord>(
            "SELECT o.*, p.first_name, p.last_name, p.email \
             FROM orders o JOIN profiles p ON p.id = o.user_id \
             ORDER BY o.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records
            .into_iter()
            .map(|r| {
                Ok(OrderWithCustomer {
                    order: r.order.to_domain()?,
                    first_name: r.first_name,
                    last_name: r.last_name,
                    email: r.email,
                })
            })
            .collect()
    }

    async fn update_order(&self, order_id: Uuid, update: OrderUpdate) -> PortResult<Order> {
        let sql = format!(
            "UPDATE orders SET status = $2, estimated_price = $3, estimated_time = $4, \
             updated_at = NOW() WHERE id = $1 RETURNING {}",
            ORDER_COLUMNS
        );
        let record = sqlx::query_as::<_, OrderRecord>(&sql)
            .bind(order_id)
            .bind(update.status.as_str())
            .bind(update.estimated_price)
            .bind(update.estimated_time)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Order {} not found", order_id)))?;
        record.to_domain()
    }
}
