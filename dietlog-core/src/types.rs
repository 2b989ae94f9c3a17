//! Core data types shared across the capture pipeline.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fingerprint::Fingerprint;

/// One analyzed meal photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietEntry {
    pub id: Uuid,
    /// Where the (possibly compressed) photo lives.
    pub image_location: PathBuf,
    /// SHA-256 of the photo bytes at capture time. Used as the dedupe key.
    pub fingerprint: Fingerprint,
    pub title: String,
    pub captured_at: DateTime<Utc>,
    pub analysis: AnalysisSummary,
}

/// A single ranked nutrient value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nutrient {
    pub name: String,
    pub quantity: f64,
}

impl Nutrient {
    pub fn new(name: impl Into<String>, quantity: f64) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }
}

/// Normalized result for one detected food item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodSummary {
    pub display_name: String,
    /// Recognition confidence in the range 0..=1.
    pub confidence: f64,
    /// Explicit quantity, or grams per serving when the API gives no quantity.
    pub quantity: Option<f64>,
    pub glycemic_index: Option<f64>,
    /// At most five nutrients, largest first.
    pub top_nutrients: Vec<Nutrient>,
}

impl FoodSummary {
    pub fn confidence_percent(&self) -> f64 {
        self.confidence * 100.0
    }
}

/// Normalized analysis for a whole photo, one summary per detected item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub foods: Vec<FoodSummary>,
}

impl AnalysisSummary {
    /// The first detected item, which is what the entry is displayed as.
    pub fn primary(&self) -> Option<&FoodSummary> {
        self.foods.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_is_first_item() {
        let summary = AnalysisSummary {
            foods: vec![
                FoodSummary {
                    display_name: "Salad".to_string(),
                    confidence: 0.9,
                    quantity: None,
                    glycemic_index: None,
                    top_nutrients: vec![],
                },
                FoodSummary {
                    display_name: "Bread".to_string(),
                    confidence: 0.95,
                    quantity: Some(30.0),
                    glycemic_index: Some(70.0),
                    top_nutrients: vec![],
                },
            ],
        };

        assert_eq!(summary.primary().unwrap().display_name, "Salad");
        assert!(AnalysisSummary::default().primary().is_none());
    }

    #[test]
    fn test_confidence_percent() {
        let food = FoodSummary {
            display_name: "Apple".to_string(),
            confidence: 0.5,
            quantity: None,
            glycemic_index: None,
            top_nutrients: vec![],
        };
        assert_eq!(food.confidence_percent(), 50.0);
    }
}
