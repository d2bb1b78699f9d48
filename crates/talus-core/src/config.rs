use serde::{Deserialize, Serialize};

use crate::error::{require_positive, Result};

/// Parameters of the transport-length hillslope diffuser.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffuserParams {
    /// κ: detachment rate per unit slope (length / time).
    pub erodibility: f64,
    /// S_c: slope at which transport length diverges (dimensionless).
    pub critical_slope: f64,
}

impl Default for DiffuserParams {
    fn default() -> Self {
        Self {
            erodibility: 0.001,
            critical_slope: 0.6,
        }
    }
}

impl DiffuserParams {
    pub fn validate(&self) -> Result<()> {
        require_positive("erodibility", self.erodibility)?;
        require_positive("critical_slope", self.critical_slope)?;
        Ok(())
    }
}

/// Parameters of the threshold eroder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdParams {
    /// Maximum slope any receiver link may keep (dimensionless).
    pub critical_slope: f64,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self { critical_slope: 0.6 }
    }
}

impl ThresholdParams {
    pub fn validate(&self) -> Result<()> {
        require_positive("critical_slope", self.critical_slope)?;
        Ok(())
    }
}
