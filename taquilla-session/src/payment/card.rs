use super::{
    stub_processor_outcome, PaymentAuthorizer, PaymentContext, PaymentCredentials, PaymentError,
    PaymentOutcome,
};
use async_trait::async_trait;

/// Card payment exchange: card number, expiry date and CVV.
#[derive(Debug, Default)]
pub struct CardAuthorizer;

#[async_trait]
impl PaymentAuthorizer for CardAuthorizer {
    fn method(&self) -> &'static str {
        "card"
    }

    async fn authorize(&self, ctx: &PaymentContext) -> Result<PaymentOutcome, PaymentError> {
        let Some(credentials) = &ctx.credentials else {
            tracing::info!("card payment form dismissed by the buyer");
            return Ok(PaymentOutcome::Aborted);
        };
        let PaymentCredentials::Card { .. } = credentials else {
            return Err(PaymentError::WrongCredentials {
                method: self.method(),
            });
        };
        Ok(stub_processor_outcome())
    }
}
