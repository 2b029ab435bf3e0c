//! Raw user input for an optimization run, plus its validation rules.
//!
//! The request formatter has no failure path, so hosts must run
//! [`OptimizeInput::validate`] before formatting.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of cores a single request may configure.
pub const MAX_CORES: usize = 6;

/// Inclusive range for a held gem's core point and efficiency values.
pub const GEM_STAT_MIN: u8 = 1;
pub const GEM_STAT_MAX: u8 = 5;

/// Inclusive range for the number of simulations run per gem.
pub const SIMULATIONS_MIN: u32 = 50;
pub const SIMULATIONS_MAX: u32 = 1000;

/// Simulation count used when the input omits one.
pub const DEFAULT_SIMULATIONS: u32 = 100;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Core category. Each category is optimized as its own group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreKind {
    #[serde(alias = "질서")]
    Order,
    #[serde(alias = "혼돈")]
    Chaos,
}

impl CoreKind {
    pub const ALL: [CoreKind; 2] = [CoreKind::Order, CoreKind::Chaos];

    /// Category token used on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            CoreKind::Order => "질서",
            CoreKind::Chaos => "혼돈",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreGrade {
    #[serde(alias = "고대")]
    Ancient,
    #[serde(alias = "유물")]
    Relic,
}

impl CoreGrade {
    pub fn wire_name(self) -> &'static str {
        match self {
            CoreGrade::Ancient => "고대",
            CoreGrade::Relic => "유물",
        }
    }
}

/// The six gem kinds. The first three belong to the order category,
/// the rest to chaos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GemKind {
    #[serde(alias = "안정")]
    Stability,
    #[serde(alias = "견고")]
    Solidity,
    #[serde(alias = "불변")]
    Immutability,
    #[serde(alias = "침식")]
    Erosion,
    #[serde(alias = "왜곡")]
    Distortion,
    #[serde(alias = "붕괴")]
    Collapse,
}

impl GemKind {
    pub fn category(self) -> CoreKind {
        match self {
            GemKind::Stability | GemKind::Solidity | GemKind::Immutability => CoreKind::Order,
            GemKind::Erosion | GemKind::Distortion | GemKind::Collapse => CoreKind::Chaos,
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            GemKind::Stability => "안정",
            GemKind::Solidity => "견고",
            GemKind::Immutability => "불변",
            GemKind::Erosion => "침식",
            GemKind::Distortion => "왜곡",
            GemKind::Collapse => "붕괴",
        }
    }
}

// ---------------------------------------------------------------------------
// Input model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreEntry {
    pub kind: CoreKind,
    pub grade: CoreGrade,
}

/// A gem the user already owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeldGemEntry {
    pub kind: GemKind,
    pub core_point: u8,
    pub efficiency: u8,
}

/// Everything the user entered for one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeInput {
    pub cores: Vec<CoreEntry>,
    #[serde(default)]
    pub held_gems: Vec<HeldGemEntry>,
    /// Market price of one blue crystal, in gold.
    pub blue_crystal_price: u32,
    #[serde(default = "default_simulations")]
    pub simulations_per_gem: u32,
}

fn default_simulations() -> u32 {
    DEFAULT_SIMULATIONS
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl OptimizeInput {
    /// Validate the input before it is formatted and submitted.
    ///
    /// Rules:
    /// - Between 1 and `MAX_CORES` cores.
    /// - Held gem core point and efficiency within `GEM_STAT_MIN..=GEM_STAT_MAX`.
    /// - Simulations within `SIMULATIONS_MIN..=SIMULATIONS_MAX`.
    /// - Blue crystal price greater than zero.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.cores.is_empty() {
            return Err(CoreError::Validation(
                "At least one core must be configured".to_string(),
            ));
        }
        if self.cores.len() > MAX_CORES {
            return Err(CoreError::Validation(format!(
                "At most {MAX_CORES} cores may be configured"
            )));
        }

        let stat_range = GEM_STAT_MIN..=GEM_STAT_MAX;
        for (i, gem) in self.held_gems.iter().enumerate() {
            if !stat_range.contains(&gem.core_point) {
                return Err(CoreError::Validation(format!(
                    "Held gem at index {i}: core point must be between {GEM_STAT_MIN} and {GEM_STAT_MAX}"
                )));
            }
            if !stat_range.contains(&gem.efficiency) {
                return Err(CoreError::Validation(format!(
                    "Held gem at index {i}: efficiency must be between {GEM_STAT_MIN} and {GEM_STAT_MAX}"
                )));
            }
        }

        if !(SIMULATIONS_MIN..=SIMULATIONS_MAX).contains(&self.simulations_per_gem) {
            return Err(CoreError::Validation(format!(
                "Simulations per gem must be between {SIMULATIONS_MIN} and {SIMULATIONS_MAX}"
            )));
        }

        if self.blue_crystal_price == 0 {
            return Err(CoreError::Validation(
                "Blue crystal price must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse raw input from JSON text.
    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Rough wall-clock estimate for a run with the given simulation count.
pub fn estimated_duration(simulations_per_gem: u32) -> &'static str {
    match simulations_per_gem {
        0..=200 => "under a minute",
        201..=500 => "about 1-3 minutes",
        501..=800 => "about 3-5 minutes",
        _ => "more than 5 minutes",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn valid_input() -> OptimizeInput {
        OptimizeInput {
            cores: vec![CoreEntry {
                kind: CoreKind::Order,
                grade: CoreGrade::Ancient,
            }],
            held_gems: vec![HeldGemEntry {
                kind: GemKind::Erosion,
                core_point: 5,
                efficiency: 4,
            }],
            blue_crystal_price: 8000,
            simulations_per_gem: 100,
        }
    }

    #[test]
    fn valid_input_passes() {
        assert!(valid_input().validate().is_ok());
    }

    #[test]
    fn no_cores_rejected() {
        let mut input = valid_input();
        input.cores.clear();
        assert_matches!(input.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn too_many_cores_rejected() {
        let mut input = valid_input();
        input.cores = vec![input.cores[0].clone(); MAX_CORES + 1];
        assert_matches!(input.validate(), Err(CoreError::Validation(msg)) if msg.contains("At most"));
    }

    #[test]
    fn max_cores_accepted() {
        let mut input = valid_input();
        input.cores = vec![input.cores[0].clone(); MAX_CORES];
        assert!(input.validate().is_ok());
    }

    #[test]
    fn held_gem_stats_out_of_range_rejected() {
        let mut input = valid_input();
        input.held_gems[0].core_point = 6;
        assert_matches!(input.validate(), Err(CoreError::Validation(msg)) if msg.contains("index 0"));

        let mut input = valid_input();
        input.held_gems[0].efficiency = 0;
        assert_matches!(input.validate(), Err(CoreError::Validation(msg)) if msg.contains("efficiency"));
    }

    #[test]
    fn simulations_bounds() {
        let mut input = valid_input();
        input.simulations_per_gem = SIMULATIONS_MIN - 1;
        assert!(input.validate().is_err());
        input.simulations_per_gem = SIMULATIONS_MAX + 1;
        assert!(input.validate().is_err());
        input.simulations_per_gem = SIMULATIONS_MAX;
        assert!(input.validate().is_ok());
    }

    #[test]
    fn zero_crystal_price_rejected() {
        let mut input = valid_input();
        input.blue_crystal_price = 0;
        assert_matches!(input.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn from_json_applies_defaults_and_aliases() {
        let json = r#"{"cores":[{"kind":"혼돈","grade":"relic"}],"blue_crystal_price":9000}"#;
        let input = OptimizeInput::from_json(json).unwrap();
        assert_eq!(input.cores[0].kind, CoreKind::Chaos);
        assert_eq!(input.cores[0].grade, CoreGrade::Relic);
        assert!(input.held_gems.is_empty());
        assert_eq!(input.simulations_per_gem, DEFAULT_SIMULATIONS);
    }

    #[test]
    fn from_json_rejects_unknown_kind() {
        let json = r#"{"cores":[{"kind":"neutral","grade":"relic"}],"blue_crystal_price":1}"#;
        assert_matches!(OptimizeInput::from_json(json), Err(CoreError::Parse(_)));
    }

    #[test]
    fn gem_categories() {
        assert_eq!(GemKind::Stability.category(), CoreKind::Order);
        assert_eq!(GemKind::Immutability.category(), CoreKind::Order);
        assert_eq!(GemKind::Erosion.category(), CoreKind::Chaos);
        assert_eq!(GemKind::Collapse.category(), CoreKind::Chaos);
    }

    #[test]
    fn estimate_buckets() {
        assert_eq!(estimated_duration(200), "under a minute");
        assert_eq!(estimated_duration(201), "about 1-3 minutes");
        assert_eq!(estimated_duration(800), "about 3-5 minutes");
        assert_eq!(estimated_duration(1000), "more than 5 minutes");
    }
}
