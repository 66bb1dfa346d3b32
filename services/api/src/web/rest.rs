//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the marketplace REST endpoints and the
//! master definition for the OpenAPI document.

use crate::error::{ApiError, ErrorBody};
use crate::web::{auth, dto::*, orders, state::AppState};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use study_market_core::{
    catalog::{filter_options, marketplace_stats},
    domain::{NoteStatus, ProfileUpdate, WishlistChange},
    marketplace::{self, NoteDraft, Upload},
    payment::PaymentMethod,
    pricing::{self, Plan},
};
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        list_plans_handler,
        estimate_handler,
        list_payment_methods_handler,
        list_notes_handler,
        note_filters_handler,
        note_stats_handler,
        serve_file_handler,
        create_note_handler,
        delete_note_handler,
        purchase_note_handler,
        toggle_wishlist_handler,
        download_note_handler,
        get_profile_handler,
        update_profile_handler,
        my_notes_handler,
        my_purchases_handler,
        my_wishlist_handler,
        orders::place_order_handler,
        orders::upload_order_files_handler,
        orders::my_orders_handler,
        orders::admin_list_orders_handler,
        orders::admin_update_order_handler,
    ),
    components(
        schemas(
            ErrorBody,
            auth::SignupRequest, auth::LoginRequest, auth::AuthResponse,
            FormValue, PlanResponse, PaymentMethodResponse, EstimateRequest, EstimateResponse,
            NoteResponse, NotesListResponse, FilterOptionsResponse, StatsResponse,
            PurchasedNoteResponse, PurchaseResponse, WishlistResponse, DownloadResponse,
            ProfileResponse, UpdateProfileRequest,
            PlaceOrderRequest, OrderResponse, OrderFileResponse, CustomerResponse,
            AdminOrderResponse, UpdateOrderRequest,
        )
    ),
    tags(
        (name = "auth", description = "Accounts and cookie sessions."),
        (name = "catalogue", description = "Plans, payment methods and the price estimator."),
        (name = "notes", description = "The notes marketplace."),
        (name = "me", description = "The signed-in user's profile and dashboards."),
        (name = "orders", description = "Assignment-help orders and their administration.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Catalogues & Pricing
//=========================================================================================

/// List the pricing plans, cheapest first.
#[utoipa::path(
    get,
    path = "/plans",
    tag = "catalogue",
    responses((status = 200, description = "All plans", body = [PlanResponse]))
)]
pub async fn list_plans_handler() -> Json<Vec<PlanResponse>> {
    Json(Plan::catalogue().iter().map(PlanResponse::from).collect())
}

/// Estimate the price and delivery time of an order.
///
/// `pages` accepts a number or free text; anything unreadable counts as one page.
#[utoipa::path(
    post,
    path = "/estimate",
    tag = "catalogue",
    request_body = EstimateRequest,
    responses(
        (status = 200, description = "The estimate", body = EstimateResponse),
        (status = 400, description = "Unknown plan", body = ErrorBody)
    )
)]
pub async fn estimate_handler(
    Json(req): Json<EstimateRequest>,
) -> Result<Json<EstimateResponse>, ApiError> {
    let pages = pricing::parse_pages(&req.pages.as_text());
    let plan = match req.plan_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => Some(
            Plan::find(id).ok_or_else(|| ApiError::validation(format!("Unknown plan '{}'", id)))?,
        ),
        None => None,
    };
    let estimate = pricing::estimate(pages, plan, req.deadline, Utc::now());
    Ok(Json(estimate.into()))
}

#[utoipa::path(
    get,
    path = "/payment-methods",
    tag = "catalogue",
    responses((status = 200, description = "Accepted payment methods", body = [PaymentMethodResponse]))
)]
pub async fn list_payment_methods_handler() -> Json<Vec<PaymentMethodResponse>> {
    Json(
        PaymentMethod::catalogue()
            .iter()
            .map(PaymentMethodResponse::from)
            .collect(),
    )
}

//=========================================================================================
// Browsing
//=========================================================================================

/// Browse active notes with search, filters and sorting.
#[utoipa::path(
    get,
    path = "/notes",
    tag = "notes",
    params(NotesQuery),
    responses(
        (status = 200, description = "Matching notes", body = NotesListResponse),
        (status = 400, description = "Malformed filter", body = ErrorBody)
    )
)]
pub async fn list_notes_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NotesQuery>,
) -> Result<Json<NotesListResponse>, ApiError> {
    let filters = query.into_filters()?;
    let notes = marketplace::browse_notes(state.store.as_ref(), &filters).await?;
    Ok(Json(NotesListResponse {
        total: notes.len(),
        active_filters: filters.active_filters(),
        notes: notes.into_iter().map(NoteResponse::from).collect(),
    }))
}

/// Distinct universities and subjects among active notes.
#[utoipa::path(
    get,
    path = "/notes/filters",
    tag = "notes",
    responses((status = 200, description = "Dropdown options", body = FilterOptionsResponse))
)]
pub async fn note_filters_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FilterOptionsResponse>, ApiError> {
    let notes = state.store.list_notes_by_status(NoteStatus::Active).await?;
    Ok(Json(filter_options(&notes).into()))
}

/// Headline numbers over active notes.
#[utoipa::path(
    get,
    path = "/notes/stats",
    tag = "notes",
    responses((status = 200, description = "Marketplace stats", body = StatsResponse))
)]
pub async fn note_stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, ApiError> {
    let notes = state.store.list_notes_by_status(NoteStatus::Active).await?;
    Ok(Json(marketplace_stats(&notes).into()))
}

/// Serve the object behind a signed download link.
#[utoipa::path(
    get,
    path = "/files/{token}",
    tag = "notes",
    params(("token" = String, Path, description = "Token from a signed download URL.")),
    responses(
        (status = 200, description = "The file contents"),
        (status = 400, description = "Unknown or expired link", body = ErrorBody)
    )
)]
pub async fn serve_file_handler(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let data = state.storage.read_signed(&token).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (header::CONTENT_DISPOSITION, "attachment"),
        ],
        data,
    ))
}

//=========================================================================================
// Selling, Purchases & Downloads
//=========================================================================================

fn is_checked(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "on" | "1" | "yes")
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::validation(format!("Invalid upload: {}", e))
}

/// Reads the "sell notes" form: text fields plus the `file` and `preview_file` parts.
async fn read_note_form(
    mut multipart: Multipart,
) -> Result<(NoteDraft, Option<Upload>, Option<Upload>), ApiError> {
    let mut draft = NoteDraft::default();
    let mut main_file = None;
    let mut preview_file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field.content_type().map(str::to_string);
            let data: Bytes = field.bytes().await.map_err(multipart_error)?;
            let upload = Upload {
                file_name,
                content_type,
                data,
            };
            match name.as_str() {
                "file" => main_file = Some(upload),
                "preview_file" => preview_file = Some(upload),
                _ => {}
            }
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            "title" => draft.title = value,
            "description" => draft.description = value,
            "subject" => draft.subject = value,
            "university" => draft.university = value,
            "course_code" => draft.course_code = value,
            "professor_name" => draft.professor_name = value,
            "semester" => draft.semester = value,
            "year" => draft.year = value,
            "price" => draft.price = value,
            "content_type" => draft.content_type = value,
            "preview_available" => draft.preview_available = is_checked(&value),
            _ => {}
        }
    }
    Ok((draft, main_file, preview_file))
}

/// List a note for sale.
///
/// Multipart form with the note's metadata, a `file` part and, when
/// `preview_available` is set, an optional `preview_file` part.
#[utoipa::path(
    post,
    path = "/notes",
    tag = "notes",
    request_body(content_type = "multipart/form-data", description = "Note metadata and files."),
    responses(
        (status = 201, description = "Note listed", body = NoteResponse),
        (status = 400, description = "Missing fields or file", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
pub async fn create_note_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<NoteResponse>), ApiError> {
    let (draft, main_file, preview_file) = read_note_form(multipart).await?;
    let note = marketplace::list_note(
        state.store.as_ref(),
        state.storage.as_ref(),
        Some(user_id),
        draft,
        main_file,
        preview_file,
        Utc::now(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(note.into())))
}

/// Take one of your own notes off the marketplace. Earlier buyers keep access to it.
#[utoipa::path(
    delete,
    path = "/notes/{id}",
    tag = "notes",
    params(("id" = Uuid, Path, description = "Note id.")),
    responses(
        (status = 204, description = "Note removed"),
        (status = 400, description = "No such note of yours", body = ErrorBody)
    )
)]
pub async fn delete_note_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(note_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    marketplace::remove_note(state.store.as_ref(), Some(user_id), note_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Buy a note at its current price.
#[utoipa::path(
    post,
    path = "/notes/{id}/purchase",
    tag = "notes",
    params(("id" = Uuid, Path, description = "Note id."), PurchaseParams),
    responses(
        (status = 201, description = "Purchase recorded", body = PurchaseResponse),
        (status = 400, description = "Already purchased or unavailable", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
pub async fn purchase_note_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(note_id): Path<Uuid>,
    Query(params): Query<PurchaseParams>,
) -> Result<(StatusCode, Json<PurchaseResponse>), ApiError> {
    let purchase = marketplace::purchase_note(
        state.store.as_ref(),
        Some(user_id),
        note_id,
        params.payment_method_id.as_deref(),
        Utc::now(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(purchase.into())))
}

/// Add the note to your wishlist, or remove it if it is already there.
#[utoipa::path(
    post,
    path = "/notes/{id}/wishlist",
    tag = "notes",
    params(("id" = Uuid, Path, description = "Note id.")),
    responses(
        (status = 200, description = "New wishlist membership", body = WishlistResponse),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
pub async fn toggle_wishlist_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(note_id): Path<Uuid>,
) -> Result<Json<WishlistResponse>, ApiError> {
    let change = marketplace::toggle_wishlist(state.store.as_ref(), Some(user_id), note_id).await?;
    Ok(Json(WishlistResponse {
        note_id,
        in_wishlist: change == WishlistChange::Added,
    }))
}

/// Get a time-limited download link for a note you bought or sell.
#[utoipa::path(
    get,
    path = "/notes/{id}/download",
    tag = "notes",
    params(("id" = Uuid, Path, description = "Note id.")),
    responses(
        (status = 200, description = "Signed download URL", body = DownloadResponse),
        (status = 400, description = "Not purchased", body = ErrorBody)
    )
)]
pub async fn download_note_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(note_id): Path<Uuid>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let ttl = state.signed_url_ttl();
    let url = marketplace::download_link(
        state.store.as_ref(),
        state.storage.as_ref(),
        Some(user_id),
        note_id,
        ttl,
    )
    .await?;
    Ok(Json(DownloadResponse {
        url,
        expires_in_secs: ttl.num_seconds(),
    }))
}

//=========================================================================================
// Profile & Dashboards
//=========================================================================================

#[utoipa::path(
    get,
    path = "/me/profile",
    tag = "me",
    responses((status = 200, description = "Your profile", body = ProfileResponse))
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.store.get_profile(user_id).await?;
    Ok(Json(profile.into()))
}

/// Update your name or grade. Omitted fields keep their value.
#[utoipa::path(
    put,
    path = "/me/profile",
    tag = "me",
    request_body = UpdateProfileRequest,
    responses((status = 200, description = "The updated profile", body = ProfileResponse))
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let trimmed = |v: Option<String>| v.map(|s| s.trim().to_string());
    let profile = state
        .store
        .update_profile(
            user_id,
            ProfileUpdate {
                first_name: trimmed(req.first_name),
                last_name: trimmed(req.last_name),
                grade: trimmed(req.grade),
            },
        )
        .await?;
    Ok(Json(profile.into()))
}

/// Notes you are selling, newest first.
#[utoipa::path(
    get,
    path = "/me/notes",
    tag = "me",
    responses((status = 200, description = "Your listed notes", body = [NoteResponse]))
)]
pub async fn my_notes_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<NoteResponse>>, ApiError> {
    let notes = state.store.list_notes_by_seller(user_id).await?;
    Ok(Json(
        notes
            .into_iter()
            .filter(|n| n.status == NoteStatus::Active)
            .map(NoteResponse::from)
            .collect(),
    ))
}

/// Notes you bought, most recent purchase first.
#[utoipa::path(
    get,
    path = "/me/purchases",
    tag = "me",
    responses((status = 200, description = "Your purchases", body = [PurchasedNoteResponse]))
)]
pub async fn my_purchases_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<PurchasedNoteResponse>>, ApiError> {
    let purchased = state.store.list_purchases_by_buyer(user_id).await?;
    Ok(Json(
        purchased
            .into_iter()
            .map(PurchasedNoteResponse::from)
            .collect(),
    ))
}

/// Active notes on your wishlist.
#[utoipa::path(
    get,
    path = "/me/wishlist",
    tag = "me",
    responses((status = 200, description = "Your wishlist", body = [NoteResponse]))
)]
pub async fn my_wishlist_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<NoteResponse>>, ApiError> {
    let wanted = state.store.list_wishlist(user_id).await?;
    let notes = state.store.list_notes_by_status(NoteStatus::Active).await?;
    Ok(Json(
        notes
            .into_iter()
            .filter(|n| wanted.contains(&n.id))
            .map(NoteResponse::from)
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::test_support::{multipart, register, test_state};
    use chrono::Duration;
    use study_market_core::ports::MarketplaceStore;

    async fn sell(state: &Arc<AppState>, seller: Uuid, title: &str, price: &str) -> NoteResponse {
        let form = multipart(&[
            ("title", None, title),
            ("subject", None, "Physics"),
            ("university", None, "IIT Bombay"),
            ("content_type", None, "pdf"),
            ("price", None, price),
            ("file", Some("mechanics.pdf"), "%PDF-1.7 notes"),
        ])
        .await;
        let (status, Json(note)) = create_note_handler(State(state.clone()), Extension(seller), form)
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        note
    }

    #[tokio::test]
    async fn estimate_matches_the_published_examples() {
        let Json(standard) = estimate_handler(Json(EstimateRequest {
            pages: FormValue::Number(5.0),
            plan_id: Some("standard".to_string()),
            deadline: None,
        }))
        .await
        .unwrap();
        assert_eq!(standard.price, 563);
        assert_eq!(standard.delivery_time, "1-3 days");

        let Json(rush) = estimate_handler(Json(EstimateRequest {
            pages: FormValue::Text("2".to_string()),
            plan_id: Some("basic".to_string()),
            deadline: Some(Utc::now() + Duration::hours(20)),
        }))
        .await
        .unwrap();
        assert_eq!(rush.urgency_multiplier, 2.0);
        assert_eq!(rush.price, 200);

        let unknown = estimate_handler(Json(EstimateRequest {
            pages: FormValue::Number(1.0),
            plan_id: Some("gold".to_string()),
            deadline: None,
        }))
        .await;
        assert!(unknown.is_err());
    }

    #[tokio::test]
    async fn catalogues_are_complete() {
        let Json(plans) = list_plans_handler().await;
        let ids: Vec<&str> = plans.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["basic", "standard", "premium"]);

        let Json(methods) = list_payment_methods_handler().await;
        assert_eq!(methods.len(), 5);
        assert_eq!(methods[0].kind, "qr");
    }

    #[tokio::test]
    async fn sold_notes_show_up_in_browse_filters_and_stats() {
        let (state, store) = test_state();
        let seller = register(&store, "seller@uni.in").await;
        sell(&state, seller, "Rotational Dynamics", "60").await;
        sell(&state, seller, "Thermodynamics", "150").await;

        let Json(listing) = list_notes_handler(
            State(state.clone()),
            Query(NotesQuery {
                price_range: Some("50-100".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(listing.total, 1);
        assert_eq!(listing.notes[0].title, "Rotational Dynamics");
        assert_eq!(listing.active_filters, vec!["Price: ₹50-100".to_string()]);

        let Json(options) = note_filters_handler(State(state.clone())).await.unwrap();
        assert_eq!(options.universities, vec!["IIT Bombay".to_string()]);

        let Json(stats) = note_stats_handler(State(state)).await.unwrap();
        assert_eq!(stats.total_notes, 2);
        assert_eq!(stats.total_sellers, 1);
        assert_eq!(stats.average_rating, 0.0);
    }

    #[tokio::test]
    async fn selling_without_a_file_is_rejected() {
        let (state, store) = test_state();
        let seller = register(&store, "seller@uni.in").await;
        let form = multipart(&[
            ("title", None, "Optics"),
            ("subject", None, "Physics"),
            ("university", None, "IIT Bombay"),
            ("content_type", None, "pdf"),
            ("price", None, "10"),
        ])
        .await;
        let err = create_note_handler(State(state), Extension(seller), form)
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn buyers_download_through_signed_links() {
        let (state, store) = test_state();
        let seller = register(&store, "seller@uni.in").await;
        let buyer = register(&store, "buyer@uni.in").await;
        let note = sell(&state, seller, "Waves", "40").await;

        let refused = download_note_handler(State(state.clone()), Extension(buyer), Path(note.id))
            .await
            .unwrap_err();
        assert_eq!(refused.into_response().status(), StatusCode::BAD_REQUEST);

        let (status, Json(purchase)) = purchase_note_handler(
            State(state.clone()),
            Extension(buyer),
            Path(note.id),
            Query(PurchaseParams {
                payment_method_id: Some("3".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(purchase.purchase_price, 40.0);
        assert!(purchase.transaction_id.unwrap().starts_with("TXN_"));

        let again = purchase_note_handler(
            State(state.clone()),
            Extension(buyer),
            Path(note.id),
            Query(PurchaseParams::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(again.to_string(), "You have already purchased this note");

        let Json(link) = download_note_handler(State(state.clone()), Extension(buyer), Path(note.id))
            .await
            .unwrap();
        assert_eq!(link.expires_in_secs, 3600);
        let token = link.url.rsplit('/').next().unwrap().to_string();
        let response = serve_file_handler(State(state.clone()), Path(token))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let Json(purchases) = my_purchases_handler(State(state.clone()), Extension(buyer))
            .await
            .unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].note.downloads_count, 1);
    }

    #[tokio::test]
    async fn wishlist_toggles_and_lists() {
        let (state, store) = test_state();
        let seller = register(&store, "seller@uni.in").await;
        let user = register(&store, "fan@uni.in").await;
        let note = sell(&state, seller, "Electrostatics", "20").await;

        let Json(first) = toggle_wishlist_handler(State(state.clone()), Extension(user), Path(note.id))
            .await
            .unwrap();
        assert!(first.in_wishlist);
        let Json(listed) = my_wishlist_handler(State(state.clone()), Extension(user))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        let Json(second) = toggle_wishlist_handler(State(state.clone()), Extension(user), Path(note.id))
            .await
            .unwrap();
        assert!(!second.in_wishlist);
        assert!(state.store.list_wishlist(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sellers_manage_their_own_notes() {
        let (state, store) = test_state();
        let seller = register(&store, "seller@uni.in").await;
        let other = register(&store, "other@uni.in").await;
        let note = sell(&state, seller, "Kinematics", "0").await;

        let Json(mine) = my_notes_handler(State(state.clone()), Extension(seller)).await.unwrap();
        assert_eq!(mine.len(), 1);

        assert!(delete_note_handler(State(state.clone()), Extension(other), Path(note.id))
            .await
            .is_err());
        let status = delete_note_handler(State(state.clone()), Extension(seller), Path(note.id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let Json(mine) = my_notes_handler(State(state.clone()), Extension(seller)).await.unwrap();
        assert!(mine.is_empty());
        assert!(delete_note_handler(State(state), Extension(seller), Path(note.id))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn buyers_keep_notes_the_seller_removed() {
        let (state, store) = test_state();
        let seller = register(&store, "seller@uni.in").await;
        let buyer = register(&store, "buyer@uni.in").await;
        let fan = register(&store, "fan@uni.in").await;
        let note = sell(&state, seller, "Optics", "45").await;

        purchase_note_handler(
            State(state.clone()),
            Extension(buyer),
            Path(note.id),
            Query(PurchaseParams::default()),
        )
        .await
        .unwrap();
        delete_note_handler(State(state.clone()), Extension(seller), Path(note.id))
            .await
            .unwrap();

        let Json(bought) = my_purchases_handler(State(state.clone()), Extension(buyer))
            .await
            .unwrap();
        assert_eq!(bought.len(), 1);
        assert_eq!(bought[0].purchase_price, 45.0);
        assert!(state.store.has_purchased(buyer, note.id).await.unwrap());
        assert!(download_note_handler(State(state.clone()), Extension(buyer), Path(note.id))
            .await
            .is_ok());

        // Gone from the marketplace for everyone else.
        let Json(listing) = list_notes_handler(State(state.clone()), Query(NotesQuery::default()))
            .await
            .unwrap();
        assert_eq!(listing.total, 0);
        assert!(purchase_note_handler(
            State(state.clone()),
            Extension(fan),
            Path(note.id),
            Query(PurchaseParams::default()),
        )
        .await
        .is_err());
        assert!(toggle_wishlist_handler(State(state), Extension(fan), Path(note.id))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn profile_round_trip() {
        let (state, store) = test_state();
        let user = register(&store, "me@uni.in").await;

        let Json(updated) = update_profile_handler(
            State(state.clone()),
            Extension(user),
            Json(UpdateProfileRequest {
                grade: Some(" 12th ".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.grade.as_deref(), Some("12th"));
        assert_eq!(updated.first_name.as_deref(), Some("Test"));

        let Json(profile) = get_profile_handler(State(state), Extension(user)).await.unwrap();
        assert_eq!(profile.email.as_deref(), Some("me@uni.in"));
        assert!(!profile.is_admin);
    }
}
