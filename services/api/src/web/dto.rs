//! services/api/src/web/dto.rs
//!
//! Request and response payloads of the REST API, and their conversions
//! from the core domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use study_market_core::{
    catalog::{FilterOptions, MarketplaceStats, NoteFilters, PriceRange, SortKey},
    domain::{Note, Order, OrderFile, OrderWithCustomer, Profile, Purchase, PurchasedNote},
    payment::{PaymentMethod, DEFAULT_PAYMENT_METHOD},
    pricing::{Estimate, Plan},
};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;

/// A form value that may arrive as a JSON number or as the raw text of an input.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum FormValue {
    Number(f64),
    Text(String),
}

impl FormValue {
    pub fn as_text(&self) -> String {
        match self {
            FormValue::Number(n) => n.to_string(),
            FormValue::Text(s) => s.clone(),
        }
    }
}

//=========================================================================================
// Catalogues & Pricing
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct PlanResponse {
    pub id: String,
    pub name: String,
    pub price_per_page: f64,
    pub original_price: Option<f64>,
    pub urgency_multiplier: f64,
    pub delivery_time: String,
    pub description: String,
    pub features: Vec<String>,
    pub popular: bool,
}

impl From<&Plan> for PlanResponse {
    fn from(plan: &Plan) -> Self {
        Self {
            id: plan.id.to_string(),
            name: plan.name.to_string(),
            price_per_page: plan.price_per_page,
            original_price: plan.original_price,
            urgency_multiplier: plan.urgency_multiplier,
            delivery_time: plan.delivery_time.to_string(),
            description: plan.description.to_string(),
            features: plan.features.iter().map(|f| f.to_string()).collect(),
            popular: plan.popular,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentMethodResponse {
    pub id: String,
    pub name: String,
    /// One of `qr`, `upi`, `card`.
    pub kind: String,
}

impl From<&PaymentMethod> for PaymentMethodResponse {
    fn from(method: &PaymentMethod) -> Self {
        Self {
            id: method.id.to_string(),
            name: method.name.to_string(),
            kind: method.kind.as_str().to_string(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EstimateRequest {
    pub pages: FormValue,
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EstimateResponse {
    pub pages: u32,
    pub urgency_multiplier: f64,
    pub price: i64,
    pub delivery_time: String,
}

impl From<Estimate> for EstimateResponse {
    fn from(estimate: Estimate) -> Self {
        Self {
            pages: estimate.pages,
            urgency_multiplier: estimate.urgency_multiplier,
            price: estimate.price,
            delivery_time: estimate.delivery_time,
        }
    }
}

//=========================================================================================
// Notes
//=========================================================================================

/// Query parameters of the marketplace listing. `all` (or an empty value)
/// disables a dropdown filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotesQuery {
    pub search: Option<String>,
    pub university: Option<String>,
    pub subject: Option<String>,
    /// `min-max` or `min+`, e.g. `50-100`, `500+`.
    pub price_range: Option<String>,
    /// Minimum rating, e.g. `4`.
    pub rating: Option<String>,
    /// newest, oldest, price-low, price-high, rating, downloads
    pub sort: Option<String>,
}

fn selected(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

impl NotesQuery {
    pub fn into_filters(self) -> Result<NoteFilters, ApiError> {
        let price_range = selected(self.price_range)
            .map(|raw| raw.parse::<PriceRange>().map_err(ApiError::validation))
            .transpose()?;
        let min_rating = selected(self.rating)
            .map(|raw| {
                raw.parse::<f64>()
                    .ok()
                    .filter(|r| r.is_finite())
                    .ok_or_else(|| ApiError::validation(format!("Invalid rating '{}'", raw)))
            })
            .transpose()?;

        Ok(NoteFilters {
            search: self.search.map(|s| s.trim().to_string()).unwrap_or_default(),
            university: selected(self.university),
            subject: selected(self.subject),
            price_range,
            min_rating,
            sort: self
                .sort
                .as_deref()
                .map(SortKey::from_param)
                .unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NoteResponse {
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
    pub file_size: Option<i64>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            seller_id: note.seller_id,
            title: note.title,
            description: note.description,
            subject: note.subject,
            university: note.university,
            course_code: note.course_code,
            professor_name: note.professor_name,
            semester: note.semester,
            year: note.year,
            price: note.price,
            rating: note.rating,
            reviews_count: note.reviews_count,
            downloads_count: note.downloads_count,
            content_type: note.content_type,
            preview_available: note.preview_available,
            file_size: note.file_size,
            status: note.status.as_str().to_string(),
            created_at: note.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotesListResponse {
    pub notes: Vec<NoteResponse>,
    pub total: usize,
    /// Labels of the filters in effect, for rendering filter chips.
    pub active_filters: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FilterOptionsResponse {
    pub universities: Vec<String>,
    pub subjects: Vec<String>,
}

impl From<FilterOptions> for FilterOptionsResponse {
    fn from(options: FilterOptions) -> Self {
        Self {
            universities: options.universities,
            subjects: options.subjects,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub total_notes: usize,
    pub total_sellers: usize,
    pub average_rating: f64,
    pub total_downloads: i64,
}

impl From<MarketplaceStats> for StatsResponse {
    fn from(stats: MarketplaceStats) -> Self {
        Self {
            total_notes: stats.total_notes,
            total_sellers: stats.total_sellers,
            average_rating: stats.average_rating,
            total_downloads: stats.total_downloads,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchasedNoteResponse {
    pub note: NoteResponse,
    pub purchase_price: f64,
    pub purchased_at: DateTime<Utc>,
}

impl From<PurchasedNote> for PurchasedNoteResponse {
    fn from(purchased: PurchasedNote) -> Self {
        Self {
            note: purchased.note.into(),
            purchase_price: purchased.purchase_price,
            purchased_at: purchased.purchased_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PurchaseParams {
    pub payment_method_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseResponse {
    pub id: Uuid,
    pub note_id: Uuid,
    pub purchase_price: f64,
    pub payment_status: String,
    pub payment_method_id: Option<String>,
    pub transaction_id: Option<String>,
    pub purchased_at: DateTime<Utc>,
}

impl From<Purchase> for PurchaseResponse {
    fn from(purchase: Purchase) -> Self {
        Self {
            id: purchase.id,
            note_id: purchase.note_id,
            purchase_price: purchase.purchase_price,
            payment_status: purchase.payment_status,
            payment_method_id: purchase.payment_method_id,
            transaction_id: purchase.transaction_id,
            purchased_at: purchase.purchased_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WishlistResponse {
    pub note_id: Uuid,
    pub in_wishlist: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DownloadResponse {
    pub url: String,
    pub expires_in_secs: i64,
}

//=========================================================================================
// Profiles
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub grade: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            grade: profile.grade,
            is_admin: profile.is_admin,
            created_at: profile.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub grade: Option<String>,
}

//=========================================================================================
// Orders
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub subject: String,
    pub grade: String,
    pub assignment_type: String,
    pub title: String,
    pub description: String,
    pub pages: FormValue,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub design_preference: Option<String>,
    #[serde(default)]
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub plan_id: Option<String>,
    /// Defaults to the UPI QR code method.
    #[serde(default = "default_payment_method")]
    pub payment_method_id: String,
}

fn default_payment_method() -> String {
    DEFAULT_PAYMENT_METHOD.to_string()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
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
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            subject: order.subject,
            grade: order.grade,
            assignment_type: order.assignment_type,
            title: order.title,
            description: order.description,
            pages: order.pages,
            deadline: order.deadline,
            design_preference: order.design_preference,
            special_instructions: order.special_instructions,
            estimated_price: order.estimated_price,
            estimated_time: order.estimated_time,
            payment_method_id: order.payment_method_id,
            payment_status: order.payment_status,
            transaction_id: order.transaction_id,
            payment_amount: order.payment_amount,
            status: order.status.as_str().to_string(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerResponse {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrderResponse {
    pub order: OrderResponse,
    pub customer: CustomerResponse,
}

impl From<OrderWithCustomer> for AdminOrderResponse {
    fn from(row: OrderWithCustomer) -> Self {
        Self {
            order: row.order.into(),
            customer: CustomerResponse {
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderFileResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub file_name: String,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<OrderFile> for OrderFileResponse {
    fn from(file: OrderFile) -> Self {
        Self {
            id: file.id,
            order_id: file.order_id,
            file_name: file.file_name,
            file_size: file.file_size,
            file_type: file.file_type,
            created_at: file.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    /// pending, in_progress, completed or cancelled
    pub status: String,
    #[serde(default)]
    pub estimated_price: Option<FormValue>,
    #[serde(default)]
    pub estimated_time: Option<String>,
}
