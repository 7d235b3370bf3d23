// ABOUTME: Domain value types shared by services and routes
// ABOUTME: Macro targets, normalized third-party foods, and daily check-in answers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Read a number that may have been stored as a JSON string
///
/// Anything that is not a finite number reads as zero, including the
/// `"NaN"` and `"inf"` spellings `f64::from_str` accepts.
#[must_use]
pub fn lenient_number(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Daily macro targets or totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroTargets {
    /// Energy in kcal
    pub calories: f64,
    /// Protein in grams
    pub protein: f64,
    /// Carbohydrates in grams
    pub carbs: f64,
    /// Fat in grams
    pub fats: f64,
}

impl MacroTargets {
    /// Parse from a stored JSON object whose values may be numbers or strings
    ///
    /// Returns `None` when the value is not an object.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            calories: lenient_number(obj.get("calories")),
            protein: lenient_number(obj.get("protein")),
            carbs: lenient_number(obj.get("carbs")),
            fats: lenient_number(obj.get("fats")),
        })
    }

    /// True when every field is zero
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.calories == 0.0 && self.protein == 0.0 && self.carbs == 0.0 && self.fats == 0.0
    }

    /// Field-wise sum
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        Self {
            calories: self.calories + other.calories,
            protein: self.protein + other.protein,
            carbs: self.carbs + other.carbs,
            fats: self.fats + other.fats,
        }
    }
}

/// Which third-party food database a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodSource {
    /// USDA `FoodData` Central
    Usda,
    /// `FatSecret` Platform API
    Fatsecret,
}

/// One food in the shared schema, regardless of upstream source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFood {
    /// Upstream database
    pub source: FoodSource,
    /// Identifier in the upstream database
    pub external_id: String,
    /// Display name
    pub name: String,
    /// Brand when the food is a branded product
    pub brand: Option<String>,
    /// Serving amount the nutrients refer to
    pub serving_size: Option<f64>,
    /// Unit of `serving_size`
    pub serving_unit: Option<String>,
    /// Energy in kcal per serving
    pub calories: f64,
    /// Protein grams per serving
    pub protein: f64,
    /// Carbohydrate grams per serving
    pub carbs: f64,
    /// Fat grams per serving
    pub fats: f64,
}

/// Training answer on the daily check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    /// Trained yesterday
    Trained,
    /// Rest day
    OffDay,
}

impl TrainingStatus {
    /// Stored string form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trained => "trained",
            Self::OffDay => "off_day",
        }
    }
}

/// Sleep answer on the daily check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepQuality {
    /// Slept well
    Good,
    /// Slept fine
    Okay,
    /// Slept badly
    Poor,
}

impl SleepQuality {
    /// Stored string form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Okay => "okay",
            Self::Poor => "poor",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_macro_targets_accept_strings() {
        let macros =
            MacroTargets::from_value(&json!({"calories": "2200", "protein": 160, "carbs": "x"}))
                .unwrap();
        assert!((macros.calories - 2200.0).abs() < f64::EPSILON);
        assert!((macros.protein - 160.0).abs() < f64::EPSILON);
        assert!(macros.carbs.abs() < f64::EPSILON);
        assert!(macros.fats.abs() < f64::EPSILON);
    }

    #[test]
    fn test_non_finite_numbers_read_as_zero() {
        for raw in ["NaN", "nan", "inf", "-inf", "infinity", " -Infinity "] {
            assert!(lenient_number(Some(&json!(raw))).abs() < f64::EPSILON, "{raw}");
        }
        assert!((lenient_number(Some(&json!("-120.5"))) + 120.5).abs() < f64::EPSILON);

        let macros =
            MacroTargets::from_value(&json!({"calories": "NaN", "protein": "inf", "fats": 70}))
                .unwrap();
        assert!(macros.calories.abs() < f64::EPSILON);
        assert!(macros.protein.abs() < f64::EPSILON);
        assert!((macros.fats - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_macro_targets_reject_non_object() {
        assert!(MacroTargets::from_value(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_training_status_serde() {
        let status: TrainingStatus = serde_json::from_value(json!("off_day")).unwrap();
        assert_eq!(status, TrainingStatus::OffDay);
        assert_eq!(status.as_str(), "off_day");
    }
}
