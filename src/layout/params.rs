//! Tunable simulation parameters

use super::{LayoutError, LayoutResult};
use crate::graph::NodeKind;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Numeric configuration consumed by the layout engine
///
/// Every field can be changed between ticks; the next tick uses the new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    /// Rest length of any edge touching a tag
    pub tag_link_distance: f64,
    /// Rest length of edges touching a document (and no tag)
    pub document_link_distance: f64,
    /// Rest length of all other edges
    pub structure_link_distance: f64,
    pub spring_strength: f64,
    pub repulsion_strength: f64,
    /// Velocity multiplier per tick, in `[0, 1)`
    pub velocity_damping: f64,
    /// Pairs farther apart than this do not repel
    pub repulsion_cutoff_radius: f64,
    /// Distance floor, so coincident nodes never divide by zero
    pub min_distance: f64,
    /// Pull toward the origin per unit distance; 0 disables it
    pub center_strength: f64,
    /// Half-width of the square new unconnected nodes are dropped into
    pub seed_radius: f64,
    /// Random offset around the neighbor centroid for new connected nodes
    pub seed_jitter: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            tag_link_distance: 100.0,
            document_link_distance: 300.0,
            structure_link_distance: 700.0,
            spring_strength: 0.005,
            repulsion_strength: 1000.0,
            velocity_damping: 0.9,
            repulsion_cutoff_radius: 50.0,
            min_distance: 0.1,
            center_strength: 0.0,
            seed_radius: 250.0,
            seed_jitter: 10.0,
        }
    }
}

impl LayoutParams {
    /// Rest length for an edge between nodes of kinds `a` and `b`
    ///
    /// Priority rule, not an average: any tag endpoint wins, then any
    /// document endpoint.
    pub fn preferred_distance(&self, a: NodeKind, b: NodeKind) -> f64 {
        if a == NodeKind::Tag || b == NodeKind::Tag {
            self.tag_link_distance
        } else if a == NodeKind::Document || b == NodeKind::Document {
            self.document_link_distance
        } else {
            self.structure_link_distance
        }
    }

    pub fn get(&self, param: LayoutParam) -> f64 {
        match param {
            LayoutParam::TagLinkDistance => self.tag_link_distance,
            LayoutParam::DocumentLinkDistance => self.document_link_distance,
            LayoutParam::StructureLinkDistance => self.structure_link_distance,
            LayoutParam::SpringStrength => self.spring_strength,
            LayoutParam::RepulsionStrength => self.repulsion_strength,
            LayoutParam::VelocityDamping => self.velocity_damping,
            LayoutParam::RepulsionCutoffRadius => self.repulsion_cutoff_radius,
            LayoutParam::MinDistance => self.min_distance,
            LayoutParam::CenterStrength => self.center_strength,
            LayoutParam::SeedRadius => self.seed_radius,
            LayoutParam::SeedJitter => self.seed_jitter,
        }
    }

    /// Set one parameter; the value is validated first and left unchanged on error
    pub fn set(&mut self, param: LayoutParam, value: f64) -> LayoutResult<()> {
        check(param, value)?;
        let slot = match param {
            LayoutParam::TagLinkDistance => &mut self.tag_link_distance,
            LayoutParam::DocumentLinkDistance => &mut self.document_link_distance,
            LayoutParam::StructureLinkDistance => &mut self.structure_link_distance,
            LayoutParam::SpringStrength => &mut self.spring_strength,
            LayoutParam::RepulsionStrength => &mut self.repulsion_strength,
            LayoutParam::VelocityDamping => &mut self.velocity_damping,
            LayoutParam::RepulsionCutoffRadius => &mut self.repulsion_cutoff_radius,
            LayoutParam::MinDistance => &mut self.min_distance,
            LayoutParam::CenterStrength => &mut self.center_strength,
            LayoutParam::SeedRadius => &mut self.seed_radius,
            LayoutParam::SeedJitter => &mut self.seed_jitter,
        };
        *slot = value;
        Ok(())
    }

    /// Check every parameter, e.g. after loading from a settings file
    pub fn validate(&self) -> LayoutResult<()> {
        LayoutParam::ALL
            .iter()
            .try_for_each(|&param| check(param, self.get(param)))
    }

    pub fn apply(&mut self, overrides: &[ParamOverride]) -> LayoutResult<()> {
        overrides
            .iter()
            .try_for_each(|o| self.set(o.param, o.value))
    }
}

fn check(param: LayoutParam, value: f64) -> LayoutResult<()> {
    let invalid = |reason| LayoutError::InvalidParameter {
        param,
        value,
        reason,
    };
    if !value.is_finite() {
        return Err(invalid("must be finite"));
    }
    match param {
        LayoutParam::VelocityDamping if !(0.0..1.0).contains(&value) => {
            Err(invalid("must lie in [0, 1)"))
        }
        LayoutParam::MinDistance if value <= 0.0 => Err(invalid("must be positive")),
        _ if value < 0.0 => Err(invalid("must not be negative")),
        _ => Ok(()),
    }
}

/// Name of one tunable parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutParam {
    TagLinkDistance,
    DocumentLinkDistance,
    StructureLinkDistance,
    SpringStrength,
    RepulsionStrength,
    VelocityDamping,
    RepulsionCutoffRadius,
    MinDistance,
    CenterStrength,
    SeedRadius,
    SeedJitter,
}

impl LayoutParam {
    pub const ALL: [LayoutParam; 11] = [
        LayoutParam::TagLinkDistance,
        LayoutParam::DocumentLinkDistance,
        LayoutParam::StructureLinkDistance,
        LayoutParam::SpringStrength,
        LayoutParam::RepulsionStrength,
        LayoutParam::VelocityDamping,
        LayoutParam::RepulsionCutoffRadius,
        LayoutParam::MinDistance,
        LayoutParam::CenterStrength,
        LayoutParam::SeedRadius,
        LayoutParam::SeedJitter,
    ];

    /// Field name as used in settings files and `--set` overrides
    pub fn name(self) -> &'static str {
        match self {
            LayoutParam::TagLinkDistance => "tag_link_distance",
            LayoutParam::DocumentLinkDistance => "document_link_distance",
            LayoutParam::StructureLinkDistance => "structure_link_distance",
            LayoutParam::SpringStrength => "spring_strength",
            LayoutParam::RepulsionStrength => "repulsion_strength",
            LayoutParam::VelocityDamping => "velocity_damping",
            LayoutParam::RepulsionCutoffRadius => "repulsion_cutoff_radius",
            LayoutParam::MinDistance => "min_distance",
            LayoutParam::CenterStrength => "center_strength",
            LayoutParam::SeedRadius => "seed_radius",
            LayoutParam::SeedJitter => "seed_jitter",
        }
    }
}

impl std::fmt::Display for LayoutParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayoutParam {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        LayoutParam::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| LayoutError::UnknownParameter(s.to_string()))
    }
}

/// A `name=value` assignment, as given on the command line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamOverride {
    pub param: LayoutParam,
    pub value: f64,
}

impl FromStr for ParamOverride {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| LayoutError::MalformedOverride(s.to_string()))?;
        let param = name.parse()?;
        let value = value
            .trim()
            .parse::<f64>()
            .map_err(|_| LayoutError::MalformedOverride(s.to_string()))?;
        Ok(Self { param, value })
    }
}
