// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use tracing::{error, info, warn};

use crate::{
    email::{self, ContactInquiry},
    error::ApiError,
    models::{ContactRequest, ContactResponse},
    providers::Mailer,
    state::AppState,
};

/// Relay a contact form submission to the site owner.
#[utoipa::path(
    post,
    path = "/v1/contact",
    request_body = ContactRequest,
    tag = "Contact",
    responses(
        (status = 200, body = ContactResponse),
        (status = 400, description = "Missing required fields", body = crate::error::ErrorBody),
        (status = 502, description = "Email provider failed", body = crate::error::ErrorBody),
        (status = 503, description = "Contact form disabled", body = crate::error::ErrorBody)
    )
)]
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(request): Json<ContactRequest>,
) -> Result<Json<ContactResponse>, ApiError> {
    if !request.is_complete() {
        return Err(ApiError::bad_request("Missing required fields"));
    }

    let Some(to) = state.contact.to.as_deref() else {
        warn!("contact submission received but no recipient is configured");
        return Err(ApiError::service_unavailable("Contact form is not available"));
    };

    let message = email::contact_email(
        &state.contact.from,
        to,
        state.contact.reply_to.as_deref(),
        &ContactInquiry {
            name: request.name.trim(),
            inquiry_type: request.inquiry_type.trim(),
            message: &request.message,
        },
    );

    let sent = match tokio::time::timeout(state.call_timeout, state.mailer.send(&message)).await {
        Ok(Ok(sent)) => sent,
        Ok(Err(err)) => {
            error!(
                error = %err,
                transient = err.is_transient(),
                "failed to relay contact inquiry"
            );
            return Err(ApiError::bad_gateway("Failed to send message"));
        }
        Err(_) => {
            error!(timeout_secs = state.call_timeout.as_secs(), "contact email timed out");
            return Err(ApiError::bad_gateway("Failed to send message"));
        }
    };

    info!(
        email_id = %sent.id,
        inquiry_type = %request.inquiry_type.trim(),
        "contact inquiry relayed"
    );
    Ok(Json(ContactResponse {
        success: true,
        id: sent.id,
    }))
}
