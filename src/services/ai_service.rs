use anyhow::Result;

use crate::models::PreparedImage;

/// Trait for vision-capable AI services (Gemini, or a stub in tests)
#[async_trait::async_trait]
pub trait VisionModel: Send + Sync {
    /// Single-turn generation from a text instruction plus one inline image.
    async fn generate(&self, prompt: &str, image: &PreparedImage) -> Result<String>;

    fn model_name(&self) -> &str;
}
