use crate::{
    error::{AppJson, PaymentError},
    models::{
        InitiateRequest, InitiateResponse, LookupParams, LookupResponse, StatusRequest,
        StatusResponse, ValidateRequest, ValidateResponse,
    },
    services::{PaymentInitiator, ReceiptValidator, StatusReconciler},
    validation,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct PaymentsState {
    pub initiator: Arc<PaymentInitiator>,
    pub reconciler: Arc<StatusReconciler>,
    pub receipts: Arc<ReceiptValidator>,
}

pub async fn initiate_payment(
    State(state): State<PaymentsState>,
    AppJson(req): AppJson<InitiateRequest>,
) -> Result<Json<InitiateResponse>, PaymentError> {
    let initiated = state.initiator.initiate(&req).await?;

    Ok(Json(InitiateResponse {
        success: true,
        checkout_request_id: initiated.checkout_request_id,
        reference: initiated.reference,
        message: "STK push sent. Enter your M-Pesa PIN on your phone to complete the payment."
            .to_string(),
    }))
}

pub async fn check_status(
    State(state): State<PaymentsState>,
    AppJson(req): AppJson<StatusRequest>,
) -> Result<Json<StatusResponse>, PaymentError> {
    let checkout_request_id = validation::non_empty(req.checkout_request_id.as_deref())
        .ok_or_else(|| PaymentError::Validation("checkoutRequestId is required".to_string()))?;

    Ok(Json(state.reconciler.check(checkout_request_id).await))
}

pub async fn validate_receipt(
    State(state): State<PaymentsState>,
    AppJson(req): AppJson<ValidateRequest>,
) -> Result<Json<ValidateResponse>, PaymentError> {
    let record = state.receipts.validate(&req).await?;

    Ok(Json(ValidateResponse {
        success: true,
        message: "Transaction code passed format checks and was recorded (not gateway-verified)"
            .to_string(),
        transaction_code: record.transaction_code,
        phone: record.phone,
        verified: record.verified,
    }))
}

pub async fn lookup_receipt(
    State(state): State<PaymentsState>,
    Query(params): Query<LookupParams>,
) -> Result<Response, PaymentError> {
    let phone = validation::non_empty(params.phone.as_deref())
        .ok_or_else(|| PaymentError::Validation("phone query parameter is required".to_string()))?;
    let checkout_request_id = validation::non_empty(params.checkout_request_id.as_deref())
        .ok_or_else(|| {
            PaymentError::Validation("checkoutRequestId query parameter is required".to_string())
        })?;

    let response = match state.receipts.lookup(phone, checkout_request_id).await {
        Some(record) => (
            StatusCode::OK,
            Json(LookupResponse {
                valid: true,
                transaction: Some(record.into()),
            }),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(LookupResponse {
                valid: false,
                transaction: None,
            }),
        ),
    };

    Ok(response.into_response())
}
