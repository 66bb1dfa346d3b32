//! crates/study_market_core/src/marketplace.rs
//!
//! The marketplace actions, written against the ports so any persistence
//! and storage pair can drive them. Callers pass the signed-in user (if any)
//! and the current instant explicitly.

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::NoteFilters;
use crate::domain::{
    NewNote, NewOrder, NewOrderFile, NewPurchase, Note, NoteStatus, Order, OrderFile,
    OrderStatus, OrderUpdate, Purchase, WishlistChange,
};
use crate::error::{ActionError, ActionResult};
use crate::payment::{self, PaymentMethod};
use crate::ports::{FileStorage, MarketplaceStore, PortError, NOTES_BUCKET, ORDER_FILES_BUCKET};
use crate::pricing::{self, Plan};

/// A file received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// The raw "sell notes" form.
#[derive(Debug, Clone, Default)]
pub struct NoteDraft {
    pub title: String,
    pub description: String,
    pub subject: String,
    pub university: String,
    pub course_code: String,
    pub professor_name: String,
    pub semester: String,
    pub year: String,
    pub price: String,
    pub content_type: String,
    pub preview_available: bool,
}

/// The raw order form, plus the plan and payment method picked at checkout.
#[derive(Debug, Clone, Default)]
pub struct OrderDraft {
    pub subject: String,
    pub grade: String,
    pub assignment_type: String,
    pub title: String,
    pub description: String,
    pub pages: String,
    pub deadline: Option<DateTime<Utc>>,
    pub design_preference: String,
    pub special_instructions: String,
    pub plan_id: Option<String>,
    pub payment_method_id: String,
}

fn require_user(user: Option<Uuid>, action: &str) -> ActionResult<Uuid> {
    user.ok_or_else(|| ActionError::auth_required(action))
}

fn required(value: &str, field: &str) -> ActionResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ActionError::Validation(format!("{} is required", field)))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

//=========================================================================================
// Browsing
//=========================================================================================

/// Fetches every active note once and runs the filter/sort pipeline over it.
pub async fn browse_notes(
    store: &dyn MarketplaceStore,
    filters: &NoteFilters,
) -> ActionResult<Vec<Note>> {
    let all = store.list_notes_by_status(NoteStatus::Active).await?;
    Ok(filters.apply(&all))
}

//=========================================================================================
// Purchases & Wishlist
//=========================================================================================

/// Buys a note at its current listed price.
///
/// The purchase insert and the download counter are two independent calls.
/// When the counter fails the purchase still stands; the failure is only logged.
pub async fn purchase_note(
    store: &dyn MarketplaceStore,
    buyer: Option<Uuid>,
    note_id: Uuid,
    payment_method_id: Option<&str>,
    now: DateTime<Utc>,
) -> ActionResult<Purchase> {
    let buyer = require_user(buyer, "purchase notes")?;

    let note = store.get_note(note_id).await?;
    if note.status != NoteStatus::Active {
        return Err(ActionError::Validation(
            "This note is no longer available".to_string(),
        ));
    }

    let method = match payment_method_id {
        Some(id) => Some(PaymentMethod::find(id).ok_or_else(|| {
            ActionError::Validation(format!("Unknown payment method '{}'", id))
        })?),
        None => None,
    };

    let purchase = store
        .insert_purchase(NewPurchase {
            buyer_id: buyer,
            note_id,
            purchase_price: note.price,
            payment_status: "completed".to_string(),
            payment_method_id: method.map(|m| m.id.to_string()),
            transaction_id: Some(payment::transaction_id(now)),
        })
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => {
                ActionError::Validation("You have already purchased this note".to_string())
            }
            other => other.into(),
        })?;

    if let Err(e) = store.increment_download_count(note_id).await {
        warn!("Failed to increment downloads for note {}: {}", note_id, e);
    }

    info!("User {} purchased note {}", buyer, note_id);
    Ok(purchase)
}

/// Adds the note to the user's wishlist, or removes it if it is already there.
pub async fn toggle_wishlist(
    store: &dyn MarketplaceStore,
    user: Option<Uuid>,
    note_id: Uuid,
) -> ActionResult<WishlistChange> {
    let user = require_user(user, "add to wishlist")?;

    let current = store.list_wishlist(user).await?;
    if current.contains(&note_id) {
        store.delete_wishlist_entry(user, note_id).await?;
        Ok(WishlistChange::Removed)
    } else {
        let note = store.get_note(note_id).await?;
        if note.status != NoteStatus::Active {
            return Err(ActionError::Validation(
                "This note is no longer available".to_string(),
            ));
        }
        store.insert_wishlist_entry(user, note_id).await?;
        Ok(WishlistChange::Added)
    }
}

//=========================================================================================
// Selling & Downloads
//=========================================================================================

fn extension(file_name: &str) -> &str {
    file_name.rsplit('.').next().unwrap_or(file_name)
}

fn note_object_path(seller: Uuid, folder: &str, file_name: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}/{}/{}-{}.{}",
        seller,
        folder,
        now.timestamp_millis(),
        Uuid::new_v4().simple(),
        extension(file_name)
    )
}

/// Deletes objects stored for a write that did not go through.
/// Failures are only logged.
async fn discard_uploads(storage: &dyn FileStorage, bucket: &str, paths: &[&str]) {
    for path in paths {
        if let Err(e) = storage.remove(bucket, path).await {
            warn!("Failed to clean up {}/{}: {}", bucket, path, e);
        }
    }
}

/// Uploads a note's files and lists it as active.
///
/// The preview file is only stored when the seller marked a preview as available.
pub async fn list_note(
    store: &dyn MarketplaceStore,
    storage: &dyn FileStorage,
    seller: Option<Uuid>,
    draft: NoteDraft,
    main_file: Option<Upload>,
    preview_file: Option<Upload>,
    now: DateTime<Utc>,
) -> ActionResult<Note> {
    let seller = require_user(seller, "sell notes")?;
    let main_file = main_file
        .filter(|f| !f.data.is_empty())
        .ok_or_else(|| ActionError::Validation("Please upload your notes file".to_string()))?;

    let title = required(&draft.title, "Title")?;
    let subject = required(&draft.subject, "Subject")?;
    let university = required(&draft.university, "University")?;
    let content_type = required(&draft.content_type, "Content type")?;
    let price = required(&draft.price, "Price")?
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p >= 0.0)
        .ok_or_else(|| ActionError::Validation("Price must be a non-negative number".to_string()))?;
    let year = match optional(&draft.year) {
        Some(y) => Some(
            y.parse::<i32>()
                .map_err(|_| ActionError::Validation(format!("Invalid year '{}'", y)))?,
        ),
        None => None,
    };

    let file_path = note_object_path(seller, "main", &main_file.file_name, now);
    let file_size = main_file.data.len() as i64;
    storage.upload(NOTES_BUCKET, &file_path, main_file.data).await?;

    let preview_file_path = match preview_file.filter(|_| draft.preview_available) {
        Some(preview) => {
            let path = note_object_path(seller, "preview", &preview.file_name, now);
            if let Err(e) = storage.upload(NOTES_BUCKET, &path, preview.data).await {
                discard_uploads(storage, NOTES_BUCKET, &[file_path.as_str()]).await;
                return Err(e.into());
            }
            Some(path)
        }
        None => None,
    };

    let mut stored = vec![file_path.clone()];
    stored.extend(preview_file_path.clone());

    let inserted = store
        .insert_note(NewNote {
            seller_id: seller,
            title,
            description: optional(&draft.description),
            subject,
            university,
            course_code: optional(&draft.course_code),
            professor_name: optional(&draft.professor_name),
            semester: optional(&draft.semester),
            year,
            price,
            content_type,
            preview_available: draft.preview_available,
            file_path,
            preview_file_path,
            file_size: Some(file_size),
        })
        .await;
    let note = match inserted {
        Ok(note) => note,
        Err(e) => {
            let paths: Vec<&str> = stored.iter().map(String::as_str).collect();
            discard_uploads(storage, NOTES_BUCKET, &paths).await;
            return Err(e.into());
        }
    };

    info!("Seller {} listed note {}", seller, note.id);
    Ok(note)
}

/// Takes one of the caller's own notes off the marketplace.
///
/// The note and its files stay in place so earlier buyers keep their
/// purchase and can still download it.
pub async fn remove_note(
    store: &dyn MarketplaceStore,
    seller: Option<Uuid>,
    note_id: Uuid,
) -> ActionResult<()> {
    let seller = require_user(seller, "manage your notes")?;
    store.remove_note(note_id, seller).await?;
    info!("Seller {} removed note {}", seller, note_id);
    Ok(())
}

/// Creates a signed download link for a note the caller bought or sells.
pub async fn download_link(
    store: &dyn MarketplaceStore,
    storage: &dyn FileStorage,
    user: Option<Uuid>,
    note_id: Uuid,
    expires_in: Duration,
) -> ActionResult<String> {
    let user = require_user(user, "download notes")?;
    let note = store.get_note(note_id).await?;

    if note.seller_id != user && !store.has_purchased(user, note_id).await? {
        return Err(ActionError::Validation(
            "Purchase this note to download it".to_string(),
        ));
    }

    let url = storage
        .create_signed_url(NOTES_BUCKET, &note.file_path, expires_in)
        .await?;
    Ok(url)
}

//=========================================================================================
// Orders
//=========================================================================================

/// Validates the order form, prices it, records the payment and stores the order.
pub async fn place_order(
    store: &dyn MarketplaceStore,
    user: Option<Uuid>,
    draft: OrderDraft,
    now: DateTime<Utc>,
) -> ActionResult<Order> {
    let user = require_user(user, "submit an order")?;

    let subject = required(&draft.subject, "Subject")?;
    let grade = required(&draft.grade, "Grade")?;
    let assignment_type = required(&draft.assignment_type, "Assignment type")?;
    let title = required(&draft.title, "Title")?;
    let description = required(&draft.description, "Description")?;
    let pages = pricing::parse_pages(&required(&draft.pages, "Pages")?);
    let deadline = draft
        .deadline
        .ok_or_else(|| ActionError::Validation("Deadline is required".to_string()))?;

    let plan = match draft.plan_id.as_deref().and_then(optional) {
        Some(id) => Some(
            Plan::find(&id)
                .ok_or_else(|| ActionError::Validation(format!("Unknown plan '{}'", id)))?,
        ),
        None => None,
    };
    let method = PaymentMethod::find(draft.payment_method_id.trim()).ok_or_else(|| {
        ActionError::Validation("Please select a valid payment method".to_string())
    })?;

    let estimate = pricing::estimate(pages, plan, Some(deadline), now);
    let amount = estimate.price as f64;

    let order = store
        .insert_order(NewOrder {
            user_id: user,
            subject,
            grade,
            assignment_type,
            title,
            description,
            pages: i32::try_from(estimate.pages).unwrap_or(i32::MAX),
            deadline,
            design_preference: optional(&draft.design_preference),
            special_instructions: optional(&draft.special_instructions),
            estimated_price: amount,
            estimated_time: estimate.delivery_time,
            payment_method_id: method.id.to_string(),
            payment_status: "completed".to_string(),
            transaction_id: payment::transaction_id(now),
            payment_amount: amount,
        })
        .await?;

    info!("User {} placed order {} for {}", user, order.id, amount);
    Ok(order)
}

/// Keeps only the final path segment of a client-supplied file name.
fn safe_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    (!base.is_empty() && base != "." && base != "..").then(|| base.to_string())
}

/// Stores a file against one of the caller's orders.
pub async fn attach_order_file(
    store: &dyn MarketplaceStore,
    storage: &dyn FileStorage,
    user: Option<Uuid>,
    order_id: Uuid,
    upload: Upload,
) -> ActionResult<OrderFile> {
    let user = require_user(user, "upload files")?;
    let order = store.get_order(order_id).await?;
    if order.user_id != user {
        return Err(ActionError::Validation(format!("Order {} not found", order_id)));
    }

    let file_name = safe_file_name(&upload.file_name)
        .ok_or_else(|| ActionError::Validation("File name is required".to_string()))?;
    let file_path = format!("{}/{}/{}", user, order_id, file_name);
    let file_size = upload.data.len() as i64;

    storage
        .upload(ORDER_FILES_BUCKET, &file_path, upload.data)
        .await?;

    let inserted = store
        .insert_order_file(NewOrderFile {
            order_id,
            file_name,
            file_path: file_path.clone(),
            file_size: Some(file_size),
            file_type: upload.content_type,
        })
        .await;
    match inserted {
        Ok(file) => Ok(file),
        Err(e) => {
            discard_uploads(storage, ORDER_FILES_BUCKET, &[file_path.as_str()]).await;
            Err(e.into())
        }
    }
}

/// Applies an administrator's edit. Empty price/time fields clear the estimate.
pub async fn update_order(
    store: &dyn MarketplaceStore,
    order_id: Uuid,
    status: &str,
    estimated_price: Option<&str>,
    estimated_time: Option<&str>,
) -> ActionResult<Order> {
    let status = status
        .trim()
        .parse::<OrderStatus>()
        .map_err(ActionError::Validation)?;
    let estimated_price = match estimated_price.and_then(optional) {
        Some(p) => Some(
            p.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ActionError::Validation(format!("Invalid price '{}'", p)))?,
        ),
        None => None,
    };

    let order = store
        .update_order(
            order_id,
            OrderUpdate {
                status,
                estimated_price,
                estimated_time: estimated_time.and_then(optional),
            },
        )
        .await?;
    info!("Order {} moved to {}", order_id, order.status);
    Ok(order)
}
