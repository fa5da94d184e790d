use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use takeout_engine::{BusinessError, OrderFlowError};
use thiserror::Error;

use crate::data_objects::{
    ApiResponse,
    CODE_BAD_REQUEST,
    CODE_BUSINESS_ERROR,
    CODE_DATABASE_ERROR,
    CODE_INTERNAL_ERROR,
    CODE_UNAUTHENTICATED,
};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("{0}")]
    Business(BusinessError),
    #[error("Bad request. {0}")]
    BadRequest(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Database error. {0}")]
    DatabaseError(String),
    #[error("The payment provider could not complete the request. {0}")]
    ExternalServiceError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ServerError {
    /// The envelope code sent to the client
    pub fn code(&self) -> i32 {
        match self {
            Self::Business(_) => CODE_BUSINESS_ERROR,
            Self::BadRequest(_) => CODE_BAD_REQUEST,
            Self::AuthenticationError(_) => CODE_UNAUTHENTICATED,
            Self::DatabaseError(_) => CODE_DATABASE_ERROR,
            Self::ExternalServiceError(_) => CODE_INTERNAL_ERROR,
            Self::InitializeError(_) => CODE_INTERNAL_ERROR,
            Self::IOError(_) => CODE_INTERNAL_ERROR,
            Self::Unspecified(_) => CODE_INTERNAL_ERROR,
        }
    }

    /// The message sent to the client. Database and internal details stay in the log.
    pub fn client_message(&self) -> String {
        match self {
            Self::Business(e) => e.to_string(),
            Self::BadRequest(s) => s.clone(),
            Self::AuthenticationError(e) => e.to_string(),
            Self::DatabaseError(_) => "database error".to_string(),
            Self::ExternalServiceError(_) => "payment service unavailable".to_string(),
            _ => "internal error".to_string(),
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Business(_) => StatusCode::OK,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            error!("💻️ Request failed. {self}");
        }
        let body = ApiResponse::failure(self.code(), self.client_message());
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).json(body)
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::Business(BusinessError::InvalidCartItem) => {
                Self::BadRequest(BusinessError::InvalidCartItem.to_string())
            },
            OrderFlowError::Business(e) => Self::Business(e),
            OrderFlowError::Database(s) => Self::DatabaseError(s),
            OrderFlowError::ExternalService(s) => Self::ExternalServiceError(s),
            OrderFlowError::Internal(s) => Self::Unspecified(s),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Access token signature is invalid. {0}")]
    ValidationError(String),
    #[error("Access token has expired.")]
    Expired,
    #[error("Could not issue access token. {0}")]
    CouldNotIssueToken(String),
}
