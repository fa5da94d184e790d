use thiserror::Error;

use crate::traits::{OrderRepositoryError, ProviderError};

/// Expected, user-facing rule violations. These are outcomes, not faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusinessError {
    #[error("address book is empty")]
    AddressBookEmpty,
    #[error("shopping cart is empty")]
    CartEmpty,
    #[error("order has been paid")]
    OrderPaid,
    #[error("order not found")]
    OrderNotFound,
    #[error("order status error")]
    OrderStatusError,
    #[error("order was modified concurrently, please retry")]
    ConcurrentModification,
    #[error("item not found in catalog")]
    CatalogItemNotFound,
    #[error("item not found in cart")]
    CartItemNotFound,
    #[error("a cart item must reference exactly one dish or setmeal")]
    InvalidCartItem,
    #[error("user has no payment account")]
    MissingPayerReference,
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("{0}")]
    Business(#[from] BusinessError),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Payment provider error: {0}")]
    ExternalService(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrderFlowError {
    pub fn is_business(&self) -> bool {
        matches!(self, OrderFlowError::Business(_))
    }

    pub fn business(&self) -> Option<&BusinessError> {
        match self {
            OrderFlowError::Business(e) => Some(e),
            _ => None,
        }
    }
}

impl From<OrderRepositoryError> for OrderFlowError {
    fn from(e: OrderRepositoryError) -> Self {
        match e {
            OrderRepositoryError::DatabaseError(s) => OrderFlowError::Database(s),
            OrderRepositoryError::AddressNotFound(_) => BusinessError::AddressBookEmpty.into(),
            OrderRepositoryError::CartEmpty => BusinessError::CartEmpty.into(),
            OrderRepositoryError::CatalogItemNotFound(_) => BusinessError::CatalogItemNotFound.into(),
            OrderRepositoryError::CartItemNotFound(_) => BusinessError::CartItemNotFound.into(),
            OrderRepositoryError::OrderNotFound(_) => BusinessError::OrderNotFound.into(),
        }
    }
}

impl From<ProviderError> for OrderFlowError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::OrderPaid => BusinessError::OrderPaid.into(),
            e => OrderFlowError::ExternalService(e.to_string()),
        }
    }
}
