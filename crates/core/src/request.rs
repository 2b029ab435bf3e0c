//! Request formatter: raw input to the job submission payload.
//!
//! [`format_request`] is pure and infallible. It groups cores by
//! category, labels held gems with their category prefix, and passes
//! numeric settings through unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::input::{CoreKind, HeldGemEntry, OptimizeInput};

/// Body of the job submission request.
///
/// `cores` maps a category token to the grades of every core in that
/// category. Both categories are always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    pub cores: BTreeMap<String, Vec<String>>,
    pub held_gems: Vec<HeldGemPayload>,
    pub blue_crystal_price: u32,
    pub simulations_per_gem: u32,
}

/// A held gem as the server expects it, e.g. `"질서의 젬 : 안정"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeldGemPayload {
    pub name: String,
    pub core_point: u8,
    pub efficiency: u8,
}

/// Build the submission payload for a validated input.
pub fn format_request(input: &OptimizeInput) -> RequestPayload {
    let mut cores: BTreeMap<String, Vec<String>> = CoreKind::ALL
        .iter()
        .map(|kind| (kind.wire_name().to_string(), Vec::new()))
        .collect();

    for core in &input.cores {
        cores
            .entry(core.kind.wire_name().to_string())
            .or_default()
            .push(core.grade.wire_name().to_string());
    }

    RequestPayload {
        cores,
        held_gems: input.held_gems.iter().map(held_gem_payload).collect(),
        blue_crystal_price: input.blue_crystal_price,
        simulations_per_gem: input.simulations_per_gem,
    }
}

fn held_gem_payload(gem: &HeldGemEntry) -> HeldGemPayload {
    HeldGemPayload {
        name: format!(
            "{}의 젬 : {}",
            gem.kind.category().wire_name(),
            gem.kind.wire_name()
        ),
        core_point: gem.core_point,
        efficiency: gem.efficiency,
    }
}
