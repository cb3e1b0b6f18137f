use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use baon_payment_engine::{traits::PaymentEngineError, CheckoutError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    OrderError(#[from] PaymentEngineError),
    #[error("{0}")]
    CheckoutError(#[from] CheckoutError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken => StatusCode::BAD_REQUEST,
            },
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::OrderError(e) => order_error_status(e),
            Self::CheckoutError(e) => match e {
                CheckoutError::AccountError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({ "error": self.error_code(), "message": self.to_string() });
        // Stock and balance failures carry the exact shortfall so the client can adjust the request.
        if let Self::OrderError(e) = self {
            match e {
                PaymentEngineError::InsufficientStock { product_id, requested, available } => {
                    body["product_id"] = json!(product_id);
                    body["requested"] = json!(requested);
                    body["available"] = json!(available);
                },
                PaymentEngineError::InsufficientBalance { required, available } => {
                    body["required"] = json!(required);
                    body["available"] = json!(available);
                },
                _ => {},
            }
        }
        if let Self::CheckoutError(CheckoutError::InsufficientBalance { required, available }) = self {
            body["required"] = json!(required);
            body["available"] = json!(available);
        }
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

impl ServerError {
    /// The stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InitializeError(_) | Self::BackendError(_) | Self::IOError(_) => "INTERNAL_ERROR",
            Self::InvalidRequestBody(_) => "INVALID_REQUEST",
            Self::AuthenticationError(_) => "UNAUTHENTICATED",
            Self::InsufficientPermissions(_) => "FORBIDDEN",
            Self::OrderError(e) => order_error_code(e),
            Self::CheckoutError(e) => match e {
                CheckoutError::NothingToCheckout => "EMPTY_CART",
                CheckoutError::NoWallet(_) => "NO_WALLET",
                CheckoutError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
                CheckoutError::AccountError(_) => "INTERNAL_ERROR",
            },
        }
    }
}

pub fn order_error_status(e: &PaymentEngineError) -> StatusCode {
    use PaymentEngineError::*;
    match e {
        DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        StudentNotLinked { .. } | NotOrderOwner(_) => StatusCode::FORBIDDEN,
        OrderNotFound(_) => StatusCode::NOT_FOUND,
        WalletConflict | OrderAlreadyExists(_) => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    }
}

/// Maps an engine error onto the wire-level error code.
pub fn order_error_code(e: &PaymentEngineError) -> &'static str {
    use PaymentEngineError::*;
    match e {
        DatabaseError(_) => "INTERNAL_ERROR",
        EmptyOrder => "EMPTY_ORDER",
        InvalidQuantity => "INVALID_QUANTITY",
        StudentNotLinked { .. } => "STUDENT_NOT_LINKED",
        ProductNotFound(_) => "PRODUCT_NOT_FOUND",
        ProductUnavailable(_) => "PRODUCT_UNAVAILABLE",
        InsufficientStock { .. } => "INSUFFICIENT_STOCK",
        NoWallet(_) => "NO_WALLET",
        InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
        WalletConflict => "WALLET_CONFLICT",
        OrderAlreadyExists(_) => "DUPLICATE_ORDER",
        OrderNotFound(_) => "ORDER_NOT_FOUND",
        NotACashOrder(_) => "INVALID_PAYMENT_METHOD",
        AlreadyPaid(_) => "ALREADY_PAID",
        PaymentDeadlinePassed(_) => "PAYMENT_TIMEOUT",
        OrderCancelled(_) => "ORDER_CANCELLED",
        OrderNotCancellable { .. } => "ORDER_NOT_CANCELLABLE",
        NotOrderOwner(_) => "NOT_ORDER_OWNER",
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No bearer token was provided.")]
    MissingToken,
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format.")]
    PoorlyFormattedToken,
}
