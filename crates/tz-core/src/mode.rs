//! Operating mode vocabulary shared by every thermozone crate.

use serde::{Deserialize, Serialize};

/// Per-zone HVAC operating mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HvacMode {
    /// Zone fully off.
    #[default]
    Off,
    /// Heating demand is regulated.
    Heat,
    /// Cooling demand is regulated.
    Cool,
    /// Air circulation only, no thermal demand.
    FanOnly,
    /// Suspended: actuators idle but the zone keeps its setpoints.
    Sleep,
}

impl HvacMode {
    /// Whether this mode drives actuators at all.
    pub fn is_active(self) -> bool {
        matches!(self, HvacMode::Heat | HvacMode::Cool | HvacMode::FanOnly)
    }

    /// Whether this mode carries a thermal demand the regulator should serve.
    pub fn is_regulated(self) -> bool {
        matches!(self, HvacMode::Heat | HvacMode::Cool)
    }
}

/// Temperature preset attached to an operating state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// No preset: the explicit requested target applies.
    #[default]
    None,
    Frost,
    Eco,
    Comfort,
    Boost,
    /// Target follows the motion/no-motion preset pair.
    Activity,
    /// Forced while a safety condition is active.
    Safety,
    /// Forced while the zone is overpowering its power budget.
    Power,
}

/// Building-wide override mode, taking precedence over per-zone requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralMode {
    /// No central constraint.
    #[default]
    Auto,
    /// Everything off.
    Stopped,
    HeatOnly,
    CoolOnly,
    FrostProtection,
}
