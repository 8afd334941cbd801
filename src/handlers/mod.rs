pub mod analyze;

pub use analyze::FoodAnalyzer;
