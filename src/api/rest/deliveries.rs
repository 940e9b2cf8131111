use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::disclosure::{project, DeliveryView};
use crate::engine::{assignment, bids, deliveries, lifecycle};
use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::bid::{Bid, BidView};
use crate::models::delivery::{Delivery, NewDelivery};
use crate::models::driver::DriverProfile;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deliveries", post(create_delivery).get(dashboard))
        .route("/deliveries/open", get(open_board))
        .route("/deliveries/:id", get(get_delivery))
        .route("/deliveries/:id/bids", post(submit_bid).get(list_bids))
        .route("/deliveries/:id/assign", post(assign_driver))
        .route("/deliveries/:id/pickup", post(mark_picked_up))
        .route("/deliveries/:id/delivered", post(mark_delivered))
        .route("/deliveries/:id/paid", post(mark_paid))
        .route("/deliveries/:id/close", post(close_delivery))
        .route("/deliveries/:id/cancel", post(cancel_delivery))
        .route("/deliveries/:id/dispute", post(open_dispute))
        .route("/deliveries/:id/hide", post(hide_delivery))
}

#[derive(Deserialize)]
pub struct CreateDeliveryRequest {
    pub seller_id: Uuid,
    #[serde(flatten)]
    pub delivery: NewDelivery,
}

#[derive(Deserialize)]
pub struct SubmitBidRequest {
    pub driver_id: Uuid,
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub seller_id: Uuid,
    pub driver_id: Uuid,
}

#[derive(Deserialize)]
pub struct ActorRequest {
    pub actor: Actor,
}

#[derive(Deserialize)]
pub struct ViewerParams {
    pub viewer_id: Option<Uuid>,
    pub role: Option<Role>,
}

impl ViewerParams {
    fn actor(&self) -> Option<Actor> {
        match (self.viewer_id, self.role) {
            (Some(user_id), Some(role)) => Some(Actor { user_id, role }),
            _ => None,
        }
    }
}

#[derive(Serialize)]
pub struct AssignResponse {
    pub delivery: DeliveryView,
    pub driver: DriverProfile,
}

async fn create_delivery(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDeliveryRequest>,
) -> Result<Json<Delivery>, AppError> {
    let delivery = deliveries::create_delivery(&state.store, payload.seller_id, payload.delivery)?;
    state.metrics.open_deliveries.inc();

    Ok(Json(delivery))
}

async fn get_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<ViewerParams>,
) -> Result<Json<DeliveryView>, AppError> {
    let view = deliveries::view_delivery(&state.store, id, params.actor())?;
    Ok(Json(view))
}

async fn open_board(State(state): State<Arc<AppState>>) -> Json<Vec<DeliveryView>> {
    Json(deliveries::open_board(&state.store))
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ViewerParams>,
) -> Result<Json<Vec<DeliveryView>>, AppError> {
    let actor = params
        .actor()
        .ok_or_else(|| AppError::Validation("viewer_id and role are required".to_string()))?;

    Ok(Json(deliveries::dashboard(&state.store, actor)))
}

async fn submit_bid(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitBidRequest>,
) -> Result<Json<Bid>, AppError> {
    match bids::submit_bid(&state.store, id, payload.driver_id) {
        Ok(bid) => {
            state
                .metrics
                .bids_total
                .with_label_values(&["accepted"])
                .inc();
            Ok(Json(bid))
        }
        Err(AppError::DuplicateBid) => {
            state
                .metrics
                .bids_total
                .with_label_values(&["duplicate"])
                .inc();
            Err(AppError::DuplicateBid)
        }
        Err(err) => {
            state
                .metrics
                .bids_total
                .with_label_values(&["rejected"])
                .inc();
            Err(err)
        }
    }
}

async fn list_bids(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<BidView>>, AppError> {
    Ok(Json(bids::list_bids(&state.store, id)?))
}

async fn assign_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<AssignResponse>, AppError> {
    let result = assignment::assign_driver(&state.store, id, payload.driver_id, payload.seller_id);

    let delivery = match result {
        Ok(delivery) => {
            state
                .metrics
                .assignments_total
                .with_label_values(&["success"])
                .inc();
            state.metrics.open_deliveries.dec();
            state.publish_lifecycle(&delivery);
            delivery
        }
        Err(err) => {
            state
                .metrics
                .assignments_total
                .with_label_values(&["conflict"])
                .inc();
            return Err(err);
        }
    };

    let driver = state
        .store
        .driver(payload.driver_id)
        .ok_or_else(|| AppError::Internal("assigned driver profile missing".to_string()))?;

    Ok(Json(AssignResponse {
        delivery: project(&delivery, Role::Seller, payload.seller_id),
        driver,
    }))
}

async fn mark_picked_up(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ActorRequest>,
) -> Result<Json<DeliveryView>, AppError> {
    let result = lifecycle::mark_picked_up(&state.store, id, payload.actor);
    finish_transition(&state, "pickup", payload.actor, result)
}

async fn mark_delivered(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ActorRequest>,
) -> Result<Json<DeliveryView>, AppError> {
    let result = lifecycle::mark_delivered(&state.store, id, payload.actor);
    finish_transition(&state, "delivered", payload.actor, result)
}

async fn mark_paid(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ActorRequest>,
) -> Result<Json<DeliveryView>, AppError> {
    let result = lifecycle::mark_paid(&state.store, id, payload.actor);
    finish_transition(&state, "paid", payload.actor, result)
}

async fn close_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ActorRequest>,
) -> Result<Json<DeliveryView>, AppError> {
    let result = lifecycle::close_delivery(&state.store, id, payload.actor);
    finish_transition(&state, "close", payload.actor, result)
}

async fn cancel_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ActorRequest>,
) -> Result<Json<DeliveryView>, AppError> {
    let result = lifecycle::cancel_delivery(&state.store, id, payload.actor);
    let response = finish_transition(&state, "cancel", payload.actor, result)?;
    state.metrics.open_deliveries.dec();

    Ok(response)
}

async fn open_dispute(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ActorRequest>,
) -> Result<Json<DeliveryView>, AppError> {
    let result = lifecycle::open_dispute(&state.store, id, payload.actor);
    finish_transition(&state, "dispute", payload.actor, result)
}

async fn hide_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ActorRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    deliveries::hide_delivery(&state.store, id, payload.actor)?;
    Ok(Json(serde_json::json!({ "hidden": true })))
}

/// Records the metric, publishes the lifecycle event, and projects the
/// fresh row through the disclosure policy for the acting party.
fn finish_transition(
    state: &AppState,
    action: &str,
    actor: Actor,
    result: Result<Delivery, AppError>,
) -> Result<Json<DeliveryView>, AppError> {
    match result {
        Ok(delivery) => {
            state
                .metrics
                .transitions_total
                .with_label_values(&[action, "success"])
                .inc();
            state.publish_lifecycle(&delivery);

            Ok(Json(project(&delivery, actor.role, actor.user_id)))
        }
        Err(err) => {
            state
                .metrics
                .transitions_total
                .with_label_values(&[action, "conflict"])
                .inc();
            Err(err)
        }
    }
}
