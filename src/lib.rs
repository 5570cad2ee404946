//! Turnstile - Process-Local Request Rate Limiting
//!
//! This crate implements the fixed-window rate limiter that guards the
//! box-office API's payment-order-creation and coupon-validation
//! endpoints. Each protected endpoint gets an independent limiter that
//! counts requests per caller identifier within a fixed time window; a
//! background sweeper evicts state for callers that go quiet.

pub mod clock;
pub mod config;
pub mod error;
pub mod ratelimit;
