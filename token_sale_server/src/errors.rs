use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use thiserror::Error;
use token_sale_engine::{OrderQueryError, SaleGatewayError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Invalid purchase request. {0}")]
    InvalidPurchase(String),
    #[error("Payment was not successful. {0}")]
    CardDeclined(&'static str),
    #[error("Payment processor is unavailable. {0}")]
    ProcessorUnavailable(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InvalidPurchase(_) => StatusCode::BAD_REQUEST,
            Self::CardDeclined(_) => StatusCode::BAD_REQUEST,
            Self::ProcessorUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::BAD_REQUEST,
            },
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token signature is invalid. {0}")]
    ValidationError(String),
    #[error("Access token has expired.")]
    TokenExpired,
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
}

impl From<SaleGatewayError> for ServerError {
    fn from(e: SaleGatewayError) -> Self {
        match e {
            SaleGatewayError::OrderNotFound(_) | SaleGatewayError::PaymentNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            SaleGatewayError::WalletNotFound(_) => Self::NoRecordFound(e.to_string()),
            SaleGatewayError::InvalidReferral(_) => Self::InvalidRequestBody(e.to_string()),
            SaleGatewayError::DatabaseError(_)
            | SaleGatewayError::PaymentAlreadyExists(_)
            | SaleGatewayError::DepositAddressInUse(_)
            | SaleGatewayError::InvalidPaymentRecord(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<OrderQueryError> for ServerError {
    fn from(e: OrderQueryError) -> Self {
        match e {
            OrderQueryError::QueryError(m) => Self::InvalidRequestBody(m),
            OrderQueryError::DatabaseError(m) => Self::BackendError(m),
        }
    }
}
