pub mod wxpay;
