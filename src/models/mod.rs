use serde::{Deserialize, Serialize};

/// Nutrient keys rescaled from per-100g to per-gram values.
pub const NUTRIENT_FIELDS: [&str; 4] = ["protein", "carbs", "fat", "fiber"];

/// An image file received from the client, owned by a single request.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Image bytes ready to send to the vision model.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodItem {
    pub name: String,
    pub protein: String,
    pub carbs: String,
    pub fat: String,
    pub fiber: String,
}

/// Typed view of a model answer: food list or an explanation why there is none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnalysisResult {
    Foods { foods: Vec<FoodItem> },
    Message { message: String },
}

impl AnalysisResult {
    /// Short description used in request logs.
    pub fn summary(&self) -> String {
        match self {
            AnalysisResult::Foods { foods } => {
                let names: Vec<&str> = foods.iter().map(|f| f.name.as_str()).collect();
                format!("{} food item(s): {}", foods.len(), names.join(", "))
            }
            AnalysisResult::Message { message } => format!("no food identified: {}", message),
        }
    }
}
