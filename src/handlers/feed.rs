// src/handlers/feed.rs

use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{stream, Stream};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::post::{FeedBuckets, FeedFilter},
};

fn feed_event(buckets: &FeedBuckets) -> Event {
    Event::default()
        .event("feed")
        .json_data(buckets)
        .unwrap_or_else(|e| {
            tracing::error!("🔥 Falha ao serializar o feed: {}", e);
            Event::default().event("error").data("Failed to load updates.")
        })
}

// GET /api/feed
#[utoipa::path(
    get,
    path = "/api/feed",
    tag = "Feed",
    params(FeedFilter),
    responses(
        (status = 200, description = "Feed categorizado do usuário", body = FeedBuckets),
        (status = 400, description = "Intervalo de datas inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_feed(
    State(app_state): State<AppState>,
    AuthenticatedUser(viewer): AuthenticatedUser,
    Query(filter): Query<FeedFilter>,
) -> Result<Json<FeedBuckets>, AppError> {
    let feed = app_state.feed_service.snapshot(&viewer, &filter).await?;
    Ok(Json(feed))
}

// GET /api/feed/stream
// Cada evento "feed" traz o feed completo: o cliente substitui, não mescla.
#[utoipa::path(
    get,
    path = "/api/feed/stream",
    tag = "Feed",
    params(FeedFilter),
    responses(
        (status = 200, description = "Server-Sent Events (text/event-stream) com o feed atualizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn stream_feed(
    State(app_state): State<AppState>,
    AuthenticatedUser(viewer): AuthenticatedUser,
    Query(filter): Query<FeedFilter>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let receiver = app_state.feed_service.subscribe(viewer, filter).await?;

    let events = stream::unfold((receiver, true), |(mut receiver, first)| async move {
        // O primeiro evento é o estado atual; depois, só mudanças
        if !first && receiver.changed().await.is_err() {
            return None;
        }
        let event = feed_event(&receiver.borrow_and_update());
        Some((Ok(event), (receiver, false)))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
