// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use axum_extra::TypedHeader;
use futures::stream::{self, Stream};
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use notification_cell::NotificationDispatcher;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::{require_admin, require_shared_secret};

use crate::models::{
    AppointmentSearchQuery, AvailabilityQuery, BlockedTimeQuery, BookSlotRequest,
    CreateAppointmentRequest, CreateBlockedTimeRequest, CreateRecipientRequest,
    ImportRecipientsRequest, RecipientSearchQuery, UpdateStatusRequest,
};
use crate::services::appointments::AppointmentService;
use crate::services::blocked_time::BlockedTimeService;
use crate::services::booking::BookingService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::realtime::{ChangeEntity, ChangeFeed, ChangeKind, EntityVersions};
use crate::services::recipient::RecipientService;
use crate::services::reminder::ReminderService;
use crate::services::slots::local_now;

pub const REMINDER_SECRET_HEADER: &str = "x-reminder-secret";

// ==============================================================================
// PUBLIC BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn get_booking_page(
    State(state): State<Arc<AppConfig>>,
    Path(token): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let page = service.booking_page(&token, local_now()).await?;

    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn get_booking_availability(
    State(state): State<Arc<AppConfig>>,
    Path(token): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let availability = service.availability_for(&token, query.date, local_now()).await?;

    Ok(Json(json!(availability)))
}

#[axum::debug_handler]
pub async fn book_slot(
    State(state): State<Arc<AppConfig>>,
    Extension(feed): Extension<ChangeFeed>,
    Path(token): Path<String>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let dispatcher = NotificationDispatcher::new(&state);

    let outcome = service.book(&token, request, &dispatcher, local_now()).await?;
    feed.publish(ChangeEntity::Appointment, outcome.appointment.id, ChangeKind::Inserted, &outcome.appointment);

    Ok(Json(json!({
        "success": true,
        "appointment": outcome.appointment,
        "notification_sent": outcome.notification_sent,
        "warning": outcome.notification_warning,
    })))
}

// ==============================================================================
// RECIPIENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_recipient(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateRecipientRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let recipient = RecipientService::new(&state).create(request, auth.token()).await?;
    let booking_url = state.booking_url(&recipient.token);

    Ok(Json(json!({
        "recipient": recipient,
        "booking_url": booking_url,
    })))
}

#[axum::debug_handler]
pub async fn import_recipients(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ImportRecipientsRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let result = RecipientService::new(&state).import(request, auth.token()).await?;
    Ok(Json(json!(result)))
}

#[axum::debug_handler]
pub async fn list_recipients(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<RecipientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let recipients = RecipientService::new(&state).list(query, auth.token()).await?;
    Ok(Json(json!({
        "total": recipients.len(),
        "recipients": recipients,
    })))
}

#[axum::debug_handler]
pub async fn get_recipient(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(recipient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let recipient = RecipientService::new(&state).get(recipient_id, auth.token()).await?;
    Ok(Json(json!(recipient)))
}

#[axum::debug_handler]
pub async fn invite_recipient(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(recipient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let dispatcher = NotificationDispatcher::new(&state);
    let recipient = RecipientService::new(&state)
        .send_invitation(recipient_id, &dispatcher, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "recipient": recipient,
    })))
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let appointments = AppointmentService::new(&state).list(query, auth.token()).await?;
    Ok(Json(json!({
        "total": appointments.len(),
        "appointments": appointments,
    })))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(feed): Extension<ChangeFeed>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let appointment = AppointmentService::new(&state).create(request, auth.token()).await?;
    feed.publish(ChangeEntity::Appointment, appointment.id, ChangeKind::Inserted, &appointment);

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let appointment = AppointmentService::new(&state).get(appointment_id, auth.token()).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    Extension(feed): Extension<ChangeFeed>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let appointment = AppointmentLifecycleService::new(&state)
        .update_status(appointment_id, &request.status, auth.token())
        .await?;
    feed.publish(ChangeEntity::Appointment, appointment.id, ChangeKind::Updated, &appointment);

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn notify_missed_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let dispatcher = NotificationDispatcher::new(&state);
    let appointment = AppointmentService::new(&state)
        .notify_missed(appointment_id, &dispatcher, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment_id": appointment.id,
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(feed): Extension<ChangeFeed>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let removed = AppointmentService::new(&state).delete(appointment_id, auth.token()).await?;
    feed.publish(ChangeEntity::Appointment, removed.id, ChangeKind::Deleted, &removed);

    Ok(Json(json!({
        "success": true,
        "deleted": removed.id,
    })))
}

/// Server-sent stream of appointment and blocked-time changes. The listener
/// lives exactly as long as the stream.
pub async fn stream_changes(
    Extension(feed): Extension<ChangeFeed>,
    Extension(user): Extension<User>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    require_admin(&user)?;

    let initial = (feed.subscribe(), EntityVersions::new());
    let events = stream::unfold(initial, |(mut subscription, mut versions)| async move {
        loop {
            let change = subscription.recv().await?;
            if versions.accept(&change) {
                let event = Event::default()
                    .event(match change.entity {
                        ChangeEntity::Appointment => "appointment",
                        ChangeEntity::BlockedTime => "blocked_time",
                    })
                    .id(change.sequence.to_string())
                    .json_data(&change);
                return Some((event, (subscription, versions)));
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

// ==============================================================================
// BLOCKED TIMES
// ==============================================================================

#[axum::debug_handler]
pub async fn list_blocked_times(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<BlockedTimeQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let blocked = BlockedTimeService::new(&state).list(query, auth.token()).await?;
    Ok(Json(json!({
        "total": blocked.len(),
        "blocked_times": blocked,
    })))
}

#[axum::debug_handler]
pub async fn create_blocked_time(
    State(state): State<Arc<AppConfig>>,
    Extension(feed): Extension<ChangeFeed>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateBlockedTimeRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let blocked = BlockedTimeService::new(&state).create(request, auth.token()).await?;
    feed.publish(ChangeEntity::BlockedTime, blocked.id, ChangeKind::Inserted, &blocked);

    Ok(Json(json!(blocked)))
}

#[axum::debug_handler]
pub async fn delete_blocked_time(
    State(state): State<Arc<AppConfig>>,
    Extension(feed): Extension<ChangeFeed>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(blocked_time_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let removed = BlockedTimeService::new(&state).delete(blocked_time_id, auth.token()).await?;
    feed.publish(ChangeEntity::BlockedTime, removed.id, ChangeKind::Deleted, &removed);

    Ok(Json(json!({
        "success": true,
        "deleted": removed.id,
    })))
}

// ==============================================================================
// REMINDERS
// ==============================================================================

/// Called by the scheduler every few minutes.
#[axum::debug_handler]
pub async fn run_reminders(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    require_shared_secret(&headers, REMINDER_SECRET_HEADER, &state.reminder_trigger_secret)?;

    let dispatcher = NotificationDispatcher::new(&state);
    let summary = ReminderService::new(&state).run(local_now(), &dispatcher).await?;

    Ok(Json(json!(summary)))
}
