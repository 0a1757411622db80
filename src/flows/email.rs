//! Inquiry email drafting.

use super::{Flow, GenerationConfig};
use crate::prompts::templates;
use crate::schema::{EmailDraft, EmailInquiryInput};

#[derive(Debug, Clone, Copy, Default)]
pub struct EmailInquiryFlow;

impl Flow for EmailInquiryFlow {
    type Input = EmailInquiryInput;
    type Output = EmailDraft;
    const NAME: &'static str = templates::EMAIL_INQUIRY;

    fn generation_config(&self) -> GenerationConfig {
        GenerationConfig::default()
    }
}
