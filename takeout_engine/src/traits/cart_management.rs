use crate::{
    db_types::{CartItem, CartItemKey},
    traits::OrderRepositoryError,
};

/// Storage behaviour for the per-user shopping cart.
#[allow(async_fn_in_trait)]
pub trait CartManagement: Clone {
    async fn fetch_cart(&self, user_id: i64) -> Result<Vec<CartItem>, OrderRepositoryError>;

    /// Increments the quantity of the entry matching `key`, or inserts a new entry with a quantity of one, using the
    /// catalog's current name, image and price.
    async fn add_to_cart(&self, user_id: i64, key: &CartItemKey) -> Result<CartItem, OrderRepositoryError>;

    /// Decrements the quantity of the entry matching `key`. The entry is deleted once its quantity would drop to zero,
    /// in which case `None` is returned.
    async fn subtract_from_cart(&self, user_id: i64, key: &CartItemKey)
        -> Result<Option<CartItem>, OrderRepositoryError>;

    /// Deletes every entry in the user's cart, returning the number of entries removed.
    async fn clear_cart(&self, user_id: i64) -> Result<u64, OrderRepositoryError>;

    /// Copies the lines of one of the user's own orders back into their cart, merging with existing entries.
    async fn reorder_into_cart(&self, user_id: i64, order_id: i64) -> Result<Vec<CartItem>, OrderRepositoryError>;
}
