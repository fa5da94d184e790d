use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
pub use takeout_common::Cents;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid {kind} code: {value}")]
pub struct ConversionError {
    kind: &'static str,
    value: String,
}

impl ConversionError {
    fn new<V: Display>(kind: &'static str, value: V) -> Self {
        Self { kind, value: value.to_string() }
    }
}

/// Implements the integer conversions that let a `#[repr(i32)]` enum travel over the wire as its numeric code.
macro_rules! int_code {
    ($name:ident, $kind:literal, { $($variant:ident = $code:literal),+ $(,)? }) => {
        impl From<$name> for i32 {
            fn from(value: $name) -> Self {
                value as i32
            }
        }

        impl TryFrom<i32> for $name {
            type Error = ConversionError;

            fn try_from(value: i32) -> Result<Self, Self::Error> {
                match value {
                    $($code => Ok(Self::$variant),)+
                    _ => Err(ConversionError::new($kind, value)),
                }
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let code = s.trim().parse::<i32>().map_err(|_| ConversionError::new($kind, s))?;
                Self::try_from(code)
            }
        }
    };
}

//--------------------------------------     OrderStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[repr(i32)]
#[serde(into = "i32", try_from = "i32")]
pub enum OrderStatus {
    /// Submitted from the cart, waiting for the payment confirmation.
    PendingPayment = 1,
    /// Paid, waiting for the shop to accept it.
    ToBeConfirmed = 2,
    /// Accepted by the shop and being prepared.
    Confirmed = 3,
    DeliveryInProgress = 4,
    Completed = 5,
    Cancelled = 6,
}

int_code!(OrderStatus, "order status", {
    PendingPayment = 1,
    ToBeConfirmed = 2,
    Confirmed = 3,
    DeliveryInProgress = 4,
    Completed = 5,
    Cancelled = 6,
});

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::PendingPayment => write!(f, "PendingPayment"),
            OrderStatus::ToBeConfirmed => write!(f, "ToBeConfirmed"),
            OrderStatus::Confirmed => write!(f, "Confirmed"),
            OrderStatus::DeliveryInProgress => write!(f, "DeliveryInProgress"),
            OrderStatus::Completed => write!(f, "Completed"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

//--------------------------------------      PayStatus       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[repr(i32)]
#[serde(into = "i32", try_from = "i32")]
pub enum PayStatus {
    Unpaid = 0,
    Paid = 1,
    Refunded = 2,
}

int_code!(PayStatus, "pay status", { Unpaid = 0, Paid = 1, Refunded = 2 });

impl Display for PayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayStatus::Unpaid => write!(f, "Unpaid"),
            PayStatus::Paid => write!(f, "Paid"),
            PayStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

//--------------------------------------      PayMethod       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[repr(i32)]
#[serde(into = "i32", try_from = "i32")]
pub enum PayMethod {
    #[default]
    WeChat = 1,
    Alipay = 2,
}

int_code!(PayMethod, "pay method", { WeChat = 1, Alipay = 2 });

//--------------------------------------        Order         ---------------------------------------------------------
/// One customer purchase. The consignee, phone and address are a snapshot taken when the order was submitted.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub number: String,
    pub status: OrderStatus,
    pub user_id: i64,
    pub address_book_id: i64,
    pub order_time: DateTime<Utc>,
    pub checkout_time: Option<DateTime<Utc>>,
    pub pay_method: PayMethod,
    pub pay_status: PayStatus,
    pub amount: Cents,
    pub remark: String,
    pub phone: String,
    pub address: String,
    pub user_name: Option<String>,
    pub consignee: String,
    pub cancel_reason: Option<String>,
    pub rejection_reason: Option<String>,
    pub cancel_time: Option<DateTime<Utc>>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    /// `true` when the customer asked for delivery as soon as possible
    pub delivery_status: bool,
    pub delivery_time: Option<DateTime<Utc>>,
    pub pack_amount: Cents,
    pub tableware_number: i32,
    /// `true` when tableware should match the number of portions, ignoring `tableware_number`
    pub tableware_status: bool,
    #[serde(skip)]
    pub version: i64,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.pay_status == PayStatus::Paid
    }
}

//--------------------------------------      OrderDraft      ---------------------------------------------------------
/// Everything needed to place an order, except the address snapshot and the lines, which are resolved inside the
/// submission transaction.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub number: String,
    pub user_id: i64,
    pub address_book_id: i64,
    pub order_time: DateTime<Utc>,
    pub pay_method: PayMethod,
    pub amount: Cents,
    pub pack_amount: Cents,
    pub remark: String,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    pub delivery_status: bool,
    pub tableware_number: i32,
    pub tableware_status: bool,
}

//--------------------------------------      OrderLine       ---------------------------------------------------------
/// A purchased dish or setmeal, copied from the cart when the order was submitted.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub name: String,
    pub image: String,
    pub dish_id: Option<i64>,
    pub setmeal_id: Option<i64>,
    pub dish_flavor: Option<String>,
    pub number: i32,
    pub amount: Cents,
}

//--------------------------------------       CartItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub image: String,
    pub dish_id: Option<i64>,
    pub setmeal_id: Option<i64>,
    pub dish_flavor: Option<String>,
    pub number: i32,
    pub amount: Cents,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    pub fn subtotal(&self) -> Cents {
        self.amount * i64::from(self.number)
    }
}

/// Identifies a cart entry. Two entries with the same key are the same entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemKey {
    pub dish_id: Option<i64>,
    pub setmeal_id: Option<i64>,
    pub dish_flavor: Option<String>,
}

impl CartItemKey {
    pub fn dish<S: Into<String>>(dish_id: i64, flavor: Option<S>) -> Self {
        Self { dish_id: Some(dish_id), setmeal_id: None, dish_flavor: flavor.map(Into::into) }
    }

    pub fn setmeal(setmeal_id: i64) -> Self {
        Self { dish_id: None, setmeal_id: Some(setmeal_id), dish_flavor: None }
    }

    /// A key must reference exactly one of a dish or a setmeal.
    pub fn is_valid(&self) -> bool {
        self.dish_id.is_some() != self.setmeal_id.is_some()
    }
}

impl Display for CartItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.dish_id, self.setmeal_id) {
            (Some(id), _) => write!(f, "dish #{id}")?,
            (None, Some(id)) => write!(f, "setmeal #{id}")?,
            (None, None) => write!(f, "<nothing>")?,
        }
        if let Some(flavor) = &self.dish_flavor {
            write!(f, " ({flavor})")?;
        }
        Ok(())
    }
}

//--------------------------------------      CatalogItem     ---------------------------------------------------------
/// Name, image and unit price of a dish or setmeal, as read from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub price: Cents,
}

//--------------------------------------     AddressBook      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBook {
    pub id: i64,
    pub user_id: i64,
    pub consignee: String,
    pub phone: String,
    pub province_name: Option<String>,
    pub city_name: Option<String>,
    pub district_name: Option<String>,
    pub detail: String,
    pub label: Option<String>,
    pub is_default: bool,
}

impl AddressBook {
    /// The single-line address that gets copied onto an order.
    pub fn full_address(&self) -> String {
        [&self.province_name, &self.city_name, &self.district_name]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .chain(std::iter::once(self.detail.as_str()))
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<&str>>()
            .join("")
    }
}

//--------------------------------------         User         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// The user's identity at the payment provider
    pub openid: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}
