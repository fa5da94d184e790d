use std::collections::HashMap;

use log::*;
use takeout_common::Secret;

#[derive(Debug, Clone, Default)]
pub struct WxPayConfig {
    pub app_id: String,
    pub mch_id: String,
    /// The 32-byte key that callback payloads are encrypted with
    pub api_v3_key: Secret<String>,
    /// The key our own requests and the client-side payment sign are signed with
    pub mch_secret: Secret<String>,
    /// Platform signing keys, by serial number. More than one is live while keys are being rotated.
    pub platform_keys: HashMap<String, Secret<String>>,
    pub base_url: String,
    pub notify_url: String,
    pub refund_notify_url: String,
}

impl WxPayConfig {
    pub fn new_from_env_or_default() -> Self {
        let app_id = std::env::var("TKO_WXPAY_APP_ID").unwrap_or_else(|_| {
            warn!("🪛️ TKO_WXPAY_APP_ID not set, using (probably useless) default");
            "wx0000000000000000".to_string()
        });
        let mch_id = std::env::var("TKO_WXPAY_MCH_ID").unwrap_or_else(|_| {
            warn!("🪛️ TKO_WXPAY_MCH_ID not set, using (probably useless) default");
            "1900000000".to_string()
        });
        let api_v3_key = Secret::new(std::env::var("TKO_WXPAY_API_V3_KEY").unwrap_or_else(|_| {
            warn!("🪛️ TKO_WXPAY_API_V3_KEY not set, using (probably useless) default");
            "00000000000000000000000000000000".to_string()
        }));
        let mch_secret = Secret::new(std::env::var("TKO_WXPAY_MCH_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ TKO_WXPAY_MCH_SECRET not set, using (probably useless) default");
            "00000000000000".to_string()
        }));
        let platform_keys = std::env::var("TKO_WXPAY_PLATFORM_KEYS")
            .map(|s| parse_platform_keys(&s))
            .unwrap_or_else(|_| {
                warn!("🪛️ TKO_WXPAY_PLATFORM_KEYS not set. No payment callback will pass verification.");
                HashMap::new()
            });
        let base_url = std::env::var("TKO_WXPAY_BASE_URL").unwrap_or_else(|_| {
            info!("🪛️ TKO_WXPAY_BASE_URL not set, using https://api.mch.weixin.qq.com");
            "https://api.mch.weixin.qq.com".to_string()
        });
        let notify_url = std::env::var("TKO_WXPAY_NOTIFY_URL").unwrap_or_else(|_| {
            warn!("🪛️ TKO_WXPAY_NOTIFY_URL not set, using (probably useless) default");
            "http://localhost:8360/notify/paySuccess".to_string()
        });
        let refund_notify_url = std::env::var("TKO_WXPAY_REFUND_NOTIFY_URL").unwrap_or_else(|_| {
            warn!("🪛️ TKO_WXPAY_REFUND_NOTIFY_URL not set, using (probably useless) default");
            "http://localhost:8360/notify/refundSuccess".to_string()
        });
        Self { app_id, mch_id, api_v3_key, mch_secret, platform_keys, base_url, notify_url, refund_notify_url }
    }
}

/// Parses `serial=key,serial=key`. Malformed entries are skipped with a warning.
pub fn parse_platform_keys(s: &str) -> HashMap<String, Secret<String>> {
    s.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match entry.split_once('=') {
            Some((serial, key)) if !serial.trim().is_empty() && !key.trim().is_empty() => {
                Some((serial.trim().to_string(), Secret::from(key.trim().to_string())))
            },
            _ => {
                warn!("🪛️ Ignoring malformed platform key entry. Expected serial=key.");
                None
            },
        })
        .collect()
}
