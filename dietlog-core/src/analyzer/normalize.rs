//! Normalization of raw Foodvisor analysis payloads.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Deserialize;

use super::AnalysisError;
use crate::types::{AnalysisSummary, FoodSummary, Nutrient};

/// Nutrition key reported separately instead of being ranked.
pub const GLYCEMIC_INDEX_KEY: &str = "glycemic_index";

/// How many nutrients are kept after ranking.
pub const TOP_NUTRIENT_COUNT: usize = 5;

/// Raw analysis response as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAnalysisResponse {
    pub items: Vec<RawItem>,
}

/// One detected region of the photo.
#[derive(Debug, Clone, Deserialize)]
pub struct RawItem {
    /// Candidate foods, most confident first. Index 0 is authoritative.
    pub food: Vec<RawFoodCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFoodCandidate {
    pub confidence: f64,
    pub food_info: RawFoodInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFoodInfo {
    pub display_name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub g_per_serving: Option<f64>,
    pub nutrition: BTreeMap<String, Option<f64>>,
}

/// Parse and normalize a JSON response body.
pub fn normalize_json(body: &str) -> Result<AnalysisSummary, AnalysisError> {
    let raw: RawAnalysisResponse =
        serde_json::from_str(body).map_err(|e| AnalysisError::Malformed(e.to_string()))?;
    normalize(raw)
}

/// Turn a raw response into a summary, one `FoodSummary` per detected item.
pub fn normalize(raw: RawAnalysisResponse) -> Result<AnalysisSummary, AnalysisError> {
    if raw.items.is_empty() {
        return Err(AnalysisError::NoFoodDetected);
    }

    let foods = raw
        .items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let candidate = item.food.into_iter().next().ok_or_else(|| {
                AnalysisError::Malformed(format!("item {} has no food candidates", index))
            })?;
            summarize(index, candidate)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AnalysisSummary { foods })
}

fn summarize(index: usize, candidate: RawFoodCandidate) -> Result<FoodSummary, AnalysisError> {
    if !(0.0..=1.0).contains(&candidate.confidence) {
        return Err(AnalysisError::Malformed(format!(
            "item {} has confidence {} outside 0..1",
            index, candidate.confidence
        )));
    }

    let info = candidate.food_info;
    let quantity = positive(info.quantity).or_else(|| positive(info.g_per_serving));
    let glycemic_index = info.nutrition.get(GLYCEMIC_INDEX_KEY).copied().flatten();
    let top_nutrients = rank_nutrients(&info.nutrition);

    Ok(FoodSummary {
        display_name: info.display_name,
        confidence: candidate.confidence,
        quantity,
        glycemic_index,
        top_nutrients,
    })
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

/// Rank nutrients largest first, skipping the glycemic index and any missing
/// or non-positive value, and keep at most `TOP_NUTRIENT_COUNT`.
///
/// Ties keep the map's key order, so ranking is deterministic.
pub fn rank_nutrients(nutrition: &BTreeMap<String, Option<f64>>) -> Vec<Nutrient> {
    let mut ranked: Vec<Nutrient> = nutrition
        .iter()
        .filter(|(name, _)| name.as_str() != GLYCEMIC_INDEX_KEY)
        .filter_map(|(name, value)| positive(*value).map(|v| Nutrient::new(name.clone(), v)))
        .collect();

    ranked.sort_by(|a, b| {
        b.quantity
            .partial_cmp(&a.quantity)
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(TOP_NUTRIENT_COUNT);
    ranked
}
