pub mod ai_service; // Vision model abstraction
pub mod gemini; // Google Gemini client
pub mod image_prep;
pub mod nutrition; // Fence stripping and per-gram rescaling

pub use ai_service::VisionModel;
pub use gemini::GeminiService;
