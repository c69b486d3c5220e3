use super::{
    stub_processor_outcome, PaymentAuthorizer, PaymentContext, PaymentCredentials, PaymentError,
    PaymentOutcome,
};
use async_trait::async_trait;

/// PayPal payment exchange: sign in with email and password, then pay.
#[derive(Debug, Default)]
pub struct PayPalAuthorizer;

#[async_trait]
impl PaymentAuthorizer for PayPalAuthorizer {
    fn method(&self) -> &'static str {
        "paypal"
    }

    async fn authorize(&self, ctx: &PaymentContext) -> Result<PaymentOutcome, PaymentError> {
        let Some(credentials) = &ctx.credentials else {
            tracing::info!("paypal payment form dismissed by the buyer");
            return Ok(PaymentOutcome::Aborted);
        };
        let PaymentCredentials::PayPal { .. } = credentials else {
            return Err(PaymentError::WrongCredentials {
                method: self.method(),
            });
        };
        Ok(stub_processor_outcome())
    }
}
