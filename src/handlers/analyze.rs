use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::errors::{AnalyzeError, NO_IMAGE_PROVIDED, NO_IMAGE_SELECTED};
use crate::models::{AnalysisResult, UploadedImage};
use crate::services::{image_prep, nutrition, VisionModel};

pub const ANALYSIS_PROMPT: &str = "\
Analyze this food image and provide nutritional information for each identified food item.
Your response MUST be a valid JSON object with a \"foods\" array and nothing else.
For each item in \"foods\", provide the \"name\" and the nutritional values \"protein\", \"carbs\", \"fat\" and \"fiber\" per 100g of that food.
The values must be strings in grams, like \"31g\" or \"3.6g\".
Example: {\"foods\": [{\"name\": \"Grilled Chicken\", \"protein\": \"31g\", \"carbs\": \"0g\", \"fat\": \"3.6g\", \"fiber\": \"0g\"}]}
If you cannot identify any food, return a JSON object with a single \"message\" key explaining why, instead of \"foods\".";

/// Runs one upload through preprocessing, the vision model and nutrient rescaling.
pub struct FoodAnalyzer {
    vision: Arc<dyn VisionModel>,
    max_image_dimension: u32,
    jpeg_quality: u8,
}

impl FoodAnalyzer {
    pub fn new(vision: Arc<dyn VisionModel>, max_image_dimension: u32, jpeg_quality: u8) -> Self {
        Self {
            vision,
            max_image_dimension,
            jpeg_quality,
        }
    }

    pub async fn analyze(&self, upload: Option<UploadedImage>) -> Result<Value, AnalyzeError> {
        let upload = upload.ok_or(AnalyzeError::BadRequest(NO_IMAGE_PROVIDED))?;
        if upload.filename.is_empty() {
            return Err(AnalyzeError::BadRequest(NO_IMAGE_SELECTED));
        }

        log::info!(
            "📸 Analyzing upload '{}' ({} bytes, {})",
            upload.filename,
            upload.bytes.len(),
            upload.content_type.as_deref().unwrap_or("no content type")
        );

        let max_dimension = self.max_image_dimension;
        let quality = self.jpeg_quality;
        let prepared = tokio::task::spawn_blocking(move || {
            image_prep::prepare(&upload, max_dimension, quality)
        })
        .await?;

        let raw = self.vision.generate(ANALYSIS_PROMPT, &prepared).await?;

        let mut data = parse_model_output(&raw)?;
        let rewritten = nutrition::rescale_foods(&mut data);
        log::debug!("🔢 Rescaled {} nutrient value(s) to per-gram", rewritten);

        match AnalysisResult::deserialize(&data) {
            Ok(result) => log::info!("✅ Analysis complete: {}", result.summary()),
            Err(_) => log::warn!("⚠️ Model returned JSON in an unexpected shape: {}", data),
        }

        Ok(data)
    }
}

/// Fence-strips and parses the model text. `raw_response` always carries the
/// untouched model output.
fn parse_model_output(raw: &str) -> Result<Value, AnalyzeError> {
    let cleaned = nutrition::strip_code_fences(raw);
    serde_json::from_str(&cleaned).map_err(|e| {
        log::error!("❌ Failed to parse model response as JSON: {}", e);
        AnalyzeError::UpstreamParseFailure {
            raw_response: raw.to_string(),
        }
    })
}
