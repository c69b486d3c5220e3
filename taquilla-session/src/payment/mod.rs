//! Payment authorization capabilities. Methods are looked up by name in a
//! registry, so adding one is a `register` call — the confirm-purchase flow
//! never names a concrete handler.

mod card;
mod crypto;
mod paypal;

pub use card::CardAuthorizer;
pub use crypto::CryptoAuthorizer;
pub use paypal::PayPalAuthorizer;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use taquilla_core::SeatKey;
use thiserror::Error;

/// The single outcome of an authorization exchange. `Aborted` is the buyer
/// backing out and is never a declined attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Approved,
    Rejected,
    Aborted,
}

/// What an authorizer gets to see about the purchase being settled.
#[derive(Debug, Clone)]
pub struct PaymentContext {
    pub category: String,
    pub seats: Vec<SeatKey>,
    /// `None` means the buyer dismissed the payment form.
    pub credentials: Option<PaymentCredentials>,
}

/// The form data each shipped method collects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentCredentials {
    Card {
        number: String,
        expiry: String,
        cvv: String,
    },
    PayPal {
        email: String,
        password: String,
    },
    Crypto {
        wallet_address: String,
    },
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("no payment handler registered for '{0}'")]
    UnknownMethod(String),

    #[error("payment details do not match the '{method}' form")]
    WrongCredentials { method: &'static str },
}

/// One payment method's interactive exchange. Blocking from the caller's
/// perspective: it returns exactly one outcome.
#[async_trait]
pub trait PaymentAuthorizer: Send + Sync {
    /// Registry key, e.g. `"card"`.
    fn method(&self) -> &'static str;

    async fn authorize(&self, ctx: &PaymentContext) -> Result<PaymentOutcome, PaymentError>;
}

/// Named capability lookup: method name to handler.
#[derive(Clone, Default)]
pub struct PaymentGateway {
    handlers: HashMap<&'static str, Arc<dyn PaymentAuthorizer>>,
}

impl PaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway with the three shipped methods registered.
    pub fn with_default_methods() -> Self {
        let mut gateway = Self::new();
        gateway.register(Arc::new(CardAuthorizer));
        gateway.register(Arc::new(PayPalAuthorizer));
        gateway.register(Arc::new(CryptoAuthorizer));
        gateway
    }

    pub fn register(&mut self, handler: Arc<dyn PaymentAuthorizer>) {
        self.handlers.insert(handler.method(), handler);
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<&'static str> {
        let mut methods: Vec<&'static str> = self.handlers.keys().copied().collect();
        methods.sort_unstable();
        methods
    }

    pub async fn authorize(
        &self,
        method: &str,
        ctx: &PaymentContext,
    ) -> Result<PaymentOutcome, PaymentError> {
        let handler = self
            .handlers
            .get(method)
            .ok_or_else(|| PaymentError::UnknownMethod(method.to_string()))?;
        tracing::debug!(method, seats = ctx.seats.len(), "running payment authorization");
        handler.authorize(ctx).await
    }
}

/// Uniform-random approve/reject, standing in for a real processor. Every
/// shipped method settles this way once its form data is present.
pub(crate) fn stub_processor_outcome() -> PaymentOutcome {
    if rand::random::<bool>() {
        PaymentOutcome::Approved
    } else {
        PaymentOutcome::Rejected
    }
}
