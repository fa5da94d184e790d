use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{CartItem, CartItemKey},
    takeout_api::errors::{BusinessError, OrderFlowError},
    traits::CartManagement,
};

/// The customer's shopping cart: the staging area that [`crate::OrderFlowApi::submit_order`] turns into an order.
#[derive(Clone)]
pub struct CartApi<B> {
    db: B,
}

impl<B> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi")
    }
}

impl<B> CartApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CartApi<B>
where B: CartManagement
{
    /// Adds one portion of the item identified by `key`. Adding an item that is already in the cart increments its
    /// quantity.
    pub async fn add(&self, user_id: i64, key: &CartItemKey) -> Result<CartItem, OrderFlowError> {
        if !key.is_valid() {
            return Err(BusinessError::InvalidCartItem.into());
        }
        let item = self.db.add_to_cart(user_id, key).await?;
        debug!("🛒️ User #{user_id} added {key}. Quantity is now {}", item.number);
        Ok(item)
    }

    /// Removes one portion of the item identified by `key`. Returns `None` once the item has left the cart.
    pub async fn sub(&self, user_id: i64, key: &CartItemKey) -> Result<Option<CartItem>, OrderFlowError> {
        if !key.is_valid() {
            return Err(BusinessError::InvalidCartItem.into());
        }
        let item = self.db.subtract_from_cart(user_id, key).await?;
        match &item {
            Some(item) => debug!("🛒️ User #{user_id} removed one {key}. Quantity is now {}", item.number),
            None => debug!("🛒️ User #{user_id} removed the last {key}"),
        }
        Ok(item)
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<CartItem>, OrderFlowError> {
        let items = self.db.fetch_cart(user_id).await?;
        Ok(items)
    }

    pub async fn clean(&self, user_id: i64) -> Result<u64, OrderFlowError> {
        let removed = self.db.clear_cart(user_id).await?;
        debug!("🛒️ Cart of user #{user_id} emptied. {removed} entries removed.");
        Ok(removed)
    }

    /// Puts everything from one of the user's past orders back into the cart.
    pub async fn reorder(&self, user_id: i64, order_id: i64) -> Result<Vec<CartItem>, OrderFlowError> {
        let items = self.db.reorder_into_cart(user_id, order_id).await?;
        info!("🛒️ User #{user_id} re-ordered order #{order_id}. The cart now holds {} entries.", items.len());
        Ok(items)
    }
}
