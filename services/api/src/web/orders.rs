//! services/api/src/web/orders.rs
//!
//! Handlers for assignment-help orders: placing and paying for an order,
//! attaching files, the customer's order list, and the admin view.

use crate::error::{ApiError, ErrorBody};
use crate::web::{dto::*, state::AppState};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::Utc;
use std::sync::Arc;
use study_market_core::marketplace::{self, OrderDraft, Upload};
use tracing::info;
use uuid::Uuid;

/// Place and pay for an order. The price is computed server side from the
/// page count, plan and deadline.
#[utoipa::path(
    post,
    path = "/orders",
    tag = "orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 400, description = "Missing fields, unknown plan or payment method", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
pub async fn place_order_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let draft = OrderDraft {
        subject: req.subject,
        grade: req.grade,
        assignment_type: req.assignment_type,
        title: req.title,
        description: req.description,
        pages: req.pages.as_text(),
        deadline: req.deadline,
        design_preference: req.design_preference.unwrap_or_default(),
        special_instructions: req.special_instructions.unwrap_or_default(),
        plan_id: req.plan_id,
        payment_method_id: req.payment_method_id,
    };
    let order = marketplace::place_order(state.store.as_ref(), Some(user_id), draft, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// Attach files to one of your orders.
///
/// Every file part of the multipart body is stored; text parts are ignored.
#[utoipa::path(
    post,
    path = "/orders/{id}/files",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order id.")),
    request_body(content_type = "multipart/form-data", description = "One or more files."),
    responses(
        (status = 201, description = "Files stored", body = [OrderFileResponse]),
        (status = 400, description = "No files, or not your order", body = ErrorBody)
    )
)]
pub async fn upload_order_files_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(order_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<OrderFileResponse>>), ApiError> {
    let invalid = |e: axum::extract::multipart::MultipartError| {
        ApiError::validation(format!("Invalid upload: {}", e))
    };

    let mut stored = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(invalid)?;
        let file = marketplace::attach_order_file(
            state.store.as_ref(),
            state.storage.as_ref(),
            Some(user_id),
            order_id,
            Upload {
                file_name,
                content_type,
                data,
            },
        )
        .await?;
        stored.push(OrderFileResponse::from(file));
    }

    if stored.is_empty() {
        return Err(ApiError::validation("Please attach at least one file"));
    }
    info!("Stored {} file(s) for order {}", stored.len(), order_id);
    Ok((StatusCode::CREATED, Json(stored)))
}

/// Your orders, newest first.
#[utoipa::path(
    get,
    path = "/me/orders",
    tag = "me",
    responses((status = 200, description = "Your orders", body = [OrderResponse]))
)]
pub async fn my_orders_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.store.list_orders_by_user(user_id).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// Every order with its customer, newest first. Administrators only.
#[utoipa::path(
    get,
    path = "/admin/orders",
    tag = "orders",
    responses(
        (status = 200, description = "All orders", body = [AdminOrderResponse]),
        (status = 401, description = "Not an administrator", body = ErrorBody)
    )
)]
pub async fn admin_list_orders_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AdminOrderResponse>>, ApiError> {
    let orders = state.store.list_all_orders().await?;
    Ok(Json(orders.into_iter().map(AdminOrderResponse::from).collect()))
}

/// Set an order's status and estimate. Administrators only.
///
/// An empty or missing price or time clears that part of the estimate.
#[utoipa::path(
    patch,
    path = "/admin/orders/{id}",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order id.")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "The updated order", body = OrderResponse),
        (status = 400, description = "Unknown status or malformed price", body = ErrorBody),
        (status = 401, description = "Not an administrator", body = ErrorBody)
    )
)]
pub async fn admin_update_order_handler(
    State(state): State<Arc<AppState>>,
    Extension(admin_id): Extension<Uuid>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let estimated_price = req.estimated_price.as_ref().map(FormValue::as_text);
    let order = marketplace::update_order(
        state.store.as_ref(),
        order_id,
        &req.status,
        estimated_price.as_deref(),
        req.estimated_time.as_deref(),
    )
    .await?;
    info!("Admin {} set order {} to {}", admin_id, order_id, order.status);
    Ok(Json(order.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::test_support::{multipart, register, test_state};
    use axum::response::IntoResponse;
    use chrono::Duration;

    fn order_request(pages: FormValue, plan_id: Option<&str>) -> PlaceOrderRequest {
        PlaceOrderRequest {
            subject: "Mathematics".to_string(),
            grade: "12".to_string(),
            assignment_type: "Project".to_string(),
            title: "Probability".to_string(),
            description: "Chapter 13 exercises".to_string(),
            pages,
            deadline: Some(Utc::now() + Duration::days(10)),
            design_preference: None,
            special_instructions: Some("Handwritten style".to_string()),
            plan_id: plan_id.map(str::to_string),
            payment_method_id: "5".to_string(),
        }
    }

    #[tokio::test]
    async fn orders_are_priced_on_the_server() {
        let (state, store) = test_state();
        let user = register(&store, "student@school.in").await;

        let (status, Json(order)) = place_order_handler(
            State(state.clone()),
            Extension(user),
            Json(order_request(FormValue::Number(5.0), Some("standard"))),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order.estimated_price, Some(563.0));
        assert_eq!(order.payment_amount, Some(563.0));
        assert_eq!(order.payment_status.as_deref(), Some("completed"));
        assert_eq!(order.status, "pending");

        let Json(mine) = my_orders_handler(State(state), Extension(user)).await.unwrap();
        assert_eq!(mine.len(), 1);
    }

    #[tokio::test]
    async fn orders_need_a_known_payment_method() {
        let (state, store) = test_state();
        let user = register(&store, "student@school.in").await;
        let mut req = order_request(FormValue::Text("3".to_string()), None);
        req.payment_method_id = "bitcoin".to_string();

        let err = place_order_handler(State(state), Extension(user), Json(req))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please select a valid payment method");
    }

    #[tokio::test]
    async fn only_the_owner_attaches_files() {
        let (state, store) = test_state();
        let owner = register(&store, "owner@school.in").await;
        let stranger = register(&store, "stranger@school.in").await;
        let (_, Json(order)) = place_order_handler(
            State(state.clone()),
            Extension(owner),
            Json(order_request(FormValue::Number(2.0), Some("basic"))),
        )
        .await
        .unwrap();

        let form = multipart(&[
            ("note", None, "see attached"),
            ("files", Some("brief.docx"), "brief"),
            ("files", Some("rubric.pdf"), "rubric"),
        ])
        .await;
        let (status, Json(files)) =
            upload_order_files_handler(State(state.clone()), Extension(owner), Path(order.id), form)
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_name, "brief.docx");

        let form = multipart(&[("files", Some("sneaky.pdf"), "x")]).await;
        let err =
            upload_order_files_handler(State(state.clone()), Extension(stranger), Path(order.id), form)
                .await
                .unwrap_err();
        assert_eq!(err.to_string(), format!("Order {} not found", order.id));

        let empty = multipart(&[("note", None, "nothing")]).await;
        assert!(
            upload_order_files_handler(State(state), Extension(owner), Path(order.id), empty)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn admins_see_every_order_and_update_it() {
        let (state, store) = test_state();
        let customer = register(&store, "customer@school.in").await;
        let admin = register(&store, "admin@school.in").await;
        store.set_admin(admin, true).await.unwrap();
        let (_, Json(order)) = place_order_handler(
            State(state.clone()),
            Extension(customer),
            Json(order_request(FormValue::Number(4.0), None)),
        )
        .await
        .unwrap();

        let Json(all) = admin_list_orders_handler(State(state.clone())).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].customer.email.as_deref(), Some("customer@school.in"));

        let Json(updated) = admin_update_order_handler(
            State(state.clone()),
            Extension(admin),
            Path(order.id),
            Json(UpdateOrderRequest {
                status: "in_progress".to_string(),
                estimated_price: Some(FormValue::Text("450".to_string())),
                estimated_time: Some("2 days".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.status, "in_progress");
        assert_eq!(updated.estimated_price, Some(450.0));

        let bad = admin_update_order_handler(
            State(state),
            Extension(admin),
            Path(order.id),
            Json(UpdateOrderRequest {
                status: "shipped".to_string(),
                estimated_price: None,
                estimated_time: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
