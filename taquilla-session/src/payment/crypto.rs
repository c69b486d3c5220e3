use super::{
    stub_processor_outcome, PaymentAuthorizer, PaymentContext, PaymentCredentials, PaymentError,
    PaymentOutcome,
};
use async_trait::async_trait;

/// Cryptocurrency payment exchange: a wallet address to send from.
#[derive(Debug, Default)]
pub struct CryptoAuthorizer;

#[async_trait]
impl PaymentAuthorizer for CryptoAuthorizer {
    fn method(&self) -> &'static str {
        "crypto"
    }

    async fn authorize(&self, ctx: &PaymentContext) -> Result<PaymentOutcome, PaymentError> {
        let Some(credentials) = &ctx.credentials else {
            tracing::info!("crypto payment form dismissed by the buyer");
            return Ok(PaymentOutcome::Aborted);
        };
        let PaymentCredentials::Crypto { .. } = credentials else {
            return Err(PaymentError::WrongCredentials {
                method: self.method(),
            });
        };
        Ok(stub_processor_outcome())
    }
}
