use std::fmt::Debug;

use log::*;

use crate::{
    order_objects::CallbackAck,
    takeout_api::{errors::OrderFlowError, order_flow_api::OrderFlowApi},
    traits::{CallbackEnvelope, CallbackHeaders, OrderManagement, PaymentProvider},
};

/// Processes the asynchronous notifications sent by the payment provider.
///
/// Each callback is parsed, authenticated and decrypted before anything else happens. A callback that fails any of
/// these steps is rejected and no order is touched. Once a callback is known to be genuine, business outcomes are
/// always acknowledged so that the provider stops retrying; only a fault on our side asks the provider to try again.
#[derive(Clone)]
pub struct PaymentCallbackApi<B, P> {
    orders: OrderFlowApi<B, P>,
}

impl<B, P> Debug for PaymentCallbackApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentCallbackApi")
    }
}

impl<B, P> PaymentCallbackApi<B, P> {
    pub fn new(orders: OrderFlowApi<B, P>) -> Self {
        Self { orders }
    }
}

impl<B, P> PaymentCallbackApi<B, P>
where
    B: OrderManagement,
    P: PaymentProvider,
{
    fn authenticate(&self, headers: CallbackHeaders, body: &str) -> Result<CallbackEnvelope, CallbackAck> {
        let envelope = CallbackEnvelope::parse(headers, body).map_err(|e| {
            warn!("💳️ Discarding malformed payment callback. {e}");
            CallbackAck::Rejected(e.to_string())
        })?;
        if !self.orders.provider().verify_callback_signature(&envelope) {
            warn!(
                "💳️ Payment callback {} failed signature verification (serial {}). It has been discarded.",
                envelope.notification.id, envelope.headers.serial
            );
            return Err(CallbackAck::Rejected("invalid signature".to_string()));
        }
        Ok(envelope)
    }

    pub async fn handle_payment_callback(&self, headers: CallbackHeaders, body: &str) -> CallbackAck {
        let envelope = match self.authenticate(headers, body) {
            Ok(envelope) => envelope,
            Err(ack) => return ack,
        };
        let result = match self.orders.provider().decrypt_payment_result(&envelope) {
            Ok(result) => result,
            Err(e) => {
                warn!("💳️ Could not decrypt payment callback {}. {e}", envelope.notification.id);
                return CallbackAck::Rejected(e.to_string());
            },
        };
        let number = result.out_trade_no.as_str();
        if !result.is_success() {
            info!("💳️ Payment for order [{number}] reported as {}. No action taken.", result.trade_state);
            return CallbackAck::Accepted(format!("trade state {} ignored", result.trade_state));
        }
        debug!("💳️ Payment for order [{number}] succeeded. Transaction {}", result.transaction_id);
        match self.orders.pay_success(number).await {
            Ok(Some(_)) => CallbackAck::Accepted("order paid".to_string()),
            Ok(None) => CallbackAck::Accepted("already processed".to_string()),
            Err(OrderFlowError::Business(e)) => {
                warn!("💳️ Payment callback for order [{number}] could not be applied. {e}");
                CallbackAck::Accepted(e.to_string())
            },
            Err(e) => {
                error!("💳️ Payment callback for order [{number}] failed. The provider will retry. {e}");
                CallbackAck::Retry(e.to_string())
            },
        }
    }

    /// Refund callbacks are authenticated and logged. The order already carries its refunded pay status.
    pub async fn handle_refund_callback(&self, headers: CallbackHeaders, body: &str) -> CallbackAck {
        let envelope = match self.authenticate(headers, body) {
            Ok(envelope) => envelope,
            Err(ack) => return ack,
        };
        match self.orders.provider().decrypt_refund_result(&envelope) {
            Ok(result) if result.is_success() => {
                info!("💳️ Refund {} for order [{}] succeeded", result.out_refund_no, result.out_trade_no);
                CallbackAck::Accepted("refund recorded".to_string())
            },
            Ok(result) => {
                warn!(
                    "💳️ Refund {} for order [{}] reported as {}",
                    result.out_refund_no, result.out_trade_no, result.refund_status
                );
                CallbackAck::Accepted(format!("refund status {} recorded", result.refund_status))
            },
            Err(e) => {
                warn!("💳️ Could not decrypt refund callback {}. {e}", envelope.notification.id);
                CallbackAck::Rejected(e.to_string())
            },
        }
    }
}
