//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::OrderError;
use inventory::StockError;
use notifications::NotificationError;
use orders::OrdersError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Cart/checkout error.
    Checkout(CheckoutError),
    /// Order store or transition error.
    Orders(OrdersError),
    /// Dispatcher error.
    Notification(NotificationError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Orders(err) => orders_error_to_response(err),
            ApiError::Notification(err) => notification_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    let status = match &err {
        CheckoutError::CartEmpty => StatusCode::BAD_REQUEST,
        CheckoutError::Stock(stock) => stock_status(stock),
        CheckoutError::UnknownSession(_) | CheckoutError::UnknownPaymentReference(_) => {
            StatusCode::NOT_FOUND
        }
        // Reaches the shopper so they can retry payment.
        CheckoutError::PaymentDeclined { .. } => StatusCode::PAYMENT_REQUIRED,
        CheckoutError::Processor(_) => StatusCode::BAD_GATEWAY,
        CheckoutError::Orders(orders) => return orders_error_to_response_ref(orders, &err),
    };
    (status, err.to_string())
}

fn stock_status(err: &StockError) -> StatusCode {
    match err {
        // User-correctable: the message carries the remaining quantity.
        StockError::InsufficientStock { .. } => StatusCode::CONFLICT,
        StockError::UnknownVariant(_) | StockError::UnknownReservation(_) => StatusCode::NOT_FOUND,
        StockError::ReservationReleased(_) => StatusCode::CONFLICT,
        StockError::InvalidAdjustment { .. } | StockError::ZeroQuantity => StatusCode::BAD_REQUEST,
    }
}

fn orders_error_to_response(err: OrdersError) -> (StatusCode, String) {
    let status = orders_status(&err);
    (status, err.to_string())
}

fn orders_error_to_response_ref(err: &OrdersError, outer: &CheckoutError) -> (StatusCode, String) {
    (orders_status(err), outer.to_string())
}

fn orders_status(err: &OrdersError) -> StatusCode {
    match err {
        OrdersError::NotFound(_) => StatusCode::NOT_FOUND,
        // Stale client state; the caller should refetch.
        OrdersError::Order(
            OrderError::InvalidTransition { .. }
            | OrderError::Terminal { .. }
            | OrderError::InvalidPaymentTransition { .. }
            | OrderError::RefundRequiresCancellation { .. },
        ) => StatusCode::CONFLICT,
    }
}

fn notification_error_to_response(err: NotificationError) -> (StatusCode, String) {
    let status = match &err {
        NotificationError::Unknown(_) => StatusCode::NOT_FOUND,
        NotificationError::RetryLimitReached { .. } | NotificationError::NotFailed(_) => {
            StatusCode::CONFLICT
        }
        NotificationError::NotMerchantFacing(_) => StatusCode::BAD_REQUEST,
    };
    (status, err.to_string())
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<OrdersError> for ApiError {
    fn from(err: OrdersError) -> Self {
        ApiError::Orders(err)
    }
}

impl From<NotificationError> for ApiError {
    fn from(err: NotificationError) -> Self {
        ApiError::Notification(err)
    }
}

impl From<StockError> for ApiError {
    fn from(err: StockError) -> Self {
        ApiError::Checkout(CheckoutError::Stock(err))
    }
}
