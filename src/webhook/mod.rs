// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Validating admission webhook.
//!
//! Serves `AdmissionReview` requests for `TargetGroupBinding` on
//! [`VALIDATE_TARGET_GROUP_BINDING_PATH`]. Validation failures are returned
//! to the client verbatim as a denied response; malformed reviews get an
//! `invalid` response.

pub mod targetgroupbinding;

use crate::constants::VALIDATE_TARGET_GROUP_BINDING_PATH;
use crate::crd::TargetGroupBinding;
use crate::errors::LbError;
use crate::metrics::{record_admission, record_error, CONTROLLER_ADMISSION_WEBHOOK};
use axum::{extract::State, routing::post, Json, Router};
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use kube::core::DynamicObject;
use std::sync::Arc;
use tracing::{debug, error, info};

pub use targetgroupbinding::{BindingLister, TargetGroupBindingValidator};

/// Shared state of the webhook server.
pub struct WebhookState {
    pub validator: TargetGroupBindingValidator,
}

/// Router exposing the validation endpoint.
pub fn router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(VALIDATE_TARGET_GROUP_BINDING_PATH, post(validate_handler))
        .with_state(state)
}

/// Handle a validating admission review for `TargetGroupBinding`.
pub async fn validate_handler(
    State(state): State<Arc<WebhookState>>,
    Json(body): Json<AdmissionReview<TargetGroupBinding>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let req: AdmissionRequest<TargetGroupBinding> = match body.try_into() {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to parse admission request");
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    Json(review(&state.validator, &req).await.into_review())
}

/// Decide one admission request.
pub async fn review(
    validator: &TargetGroupBindingValidator,
    req: &AdmissionRequest<TargetGroupBinding>,
) -> AdmissionResponse {
    let operation = operation_name(&req.operation);
    debug!(uid = %req.uid, operation, name = %req.name, "Validating TargetGroupBinding");

    let result = match (&req.operation, &req.object, &req.old_object) {
        (Operation::Create, Some(obj), _) => validator.validate_create(obj).await,
        (Operation::Update, Some(obj), Some(old)) => validator.validate_update(obj, old),
        (Operation::Delete, _, Some(old)) => validator.validate_delete(old),
        (Operation::Create | Operation::Update, _, _) => {
            return AdmissionResponse::invalid(format!(
                "{operation} request carries no TargetGroupBinding"
            ));
        }
        _ => Ok(()),
    };

    let response = AdmissionResponse::from(req);
    match result {
        Ok(()) => {
            record_admission(operation, true);
            response
        }
        Err(e) => {
            info!(
                uid = %req.uid,
                namespace = ?req.namespace,
                name = %req.name,
                reason = %e,
                "Denied TargetGroupBinding"
            );
            record_admission(operation, false);
            if !matches!(e, LbError::Validation(_)) {
                record_error(CONTROLLER_ADMISSION_WEBHOOK, e.reason());
            }
            response.deny(e.to_string())
        }
    }
}

fn operation_name(operation: &Operation) -> &'static str {
    match operation {
        Operation::Create => "CREATE",
        Operation::Update => "UPDATE",
        Operation::Delete => "DELETE",
        Operation::Connect => "CONNECT",
    }
}
