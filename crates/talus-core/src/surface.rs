use serde::{Deserialize, Serialize};

use crate::error::{Result, TalusError};

pub const TOPOGRAPHIC_ELEVATION: &str = "topographic__elevation";
pub const BEDROCK_ELEVATION: &str = "bedrock__elevation";
pub const SOIL_DEPTH: &str = "soil__depth";

/// Per-node surface fields: elevation plus an optional bedrock/soil split.
///
/// Every mutable access bumps `revision`, which the hillslope components
/// compare against the revision a flow graph was built from.
/// When the split is present, `with_soil`, `set_node_elevation` and
/// `uplift_node` keep `elevation == bedrock + soil`. Writing through
/// `elevation_mut` or `field_mut` bypasses the split and is the caller's
/// responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Surface {
    elevation: Vec<f64>,
    bedrock: Option<Vec<f64>>,
    soil_depth: Option<Vec<f64>>,
    #[serde(default)]
    revision: u64,
}

impl Surface {
    /// A surface of `node_count` nodes filled with `fill`.
    pub fn new(node_count: usize, fill: f64) -> Self {
        Self::from_elevation(vec![fill; node_count])
    }

    pub fn from_elevation(elevation: Vec<f64>) -> Self {
        Self { elevation, bedrock: None, soil_depth: None, revision: 0 }
    }

    /// Split elevation into bedrock and a soil layer of the given depth.
    pub fn with_soil(mut self, soil_depth: Vec<f64>) -> Result<Self> {
        if soil_depth.len() != self.elevation.len() {
            return Err(TalusError::FieldLength {
                name: SOIL_DEPTH.to_string(),
                expected: self.elevation.len(),
                actual: soil_depth.len(),
            });
        }
        let soil: Vec<f64> = soil_depth.into_iter().map(|d| d.max(0.0)).collect();
        let bedrock = self.elevation.iter().zip(&soil).map(|(z, d)| z - d).collect();
        self.bedrock = Some(bedrock);
        self.soil_depth = Some(soil);
        self.revision += 1;
        Ok(self)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elevation.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elevation.is_empty()
    }

    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[inline]
    pub fn elevation(&self) -> &[f64] {
        &self.elevation
    }

    /// Mutable elevation. Does not touch the bedrock/soil split; callers
    /// that carry one should go through [`Surface::set_node_elevation`] or
    /// [`Surface::uplift_node`].
    pub fn elevation_mut(&mut self) -> &mut [f64] {
        self.revision += 1;
        &mut self.elevation
    }

    pub fn bedrock(&self) -> Option<&[f64]> {
        self.bedrock.as_deref()
    }

    pub fn soil_depth(&self) -> Option<&[f64]> {
        self.soil_depth.as_deref()
    }

    pub fn has_soil(&self) -> bool {
        self.soil_depth.is_some()
    }

    /// Look a field up by its registered name.
    pub fn field(&self, name: &str) -> Option<&[f64]> {
        match name {
            TOPOGRAPHIC_ELEVATION => Some(&self.elevation),
            BEDROCK_ELEVATION => self.bedrock.as_deref(),
            SOIL_DEPTH => self.soil_depth.as_deref(),
            _ => None,
        }
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut [f64]> {
        let field = match name {
            TOPOGRAPHIC_ELEVATION => Some(self.elevation.as_mut_slice()),
            BEDROCK_ELEVATION => self.bedrock.as_deref_mut(),
            SOIL_DEPTH => self.soil_depth.as_deref_mut(),
            _ => None,
        };
        if field.is_some() {
            self.revision += 1;
        }
        field
    }

    /// Like [`Surface::field`] but reports a missing field as an error.
    pub fn require_field(&self, name: &str) -> Result<&[f64]> {
        self.field(name)
            .ok_or_else(|| TalusError::MissingField { name: name.to_string() })
    }

    /// Check that every field has one value per grid node.
    pub fn check_len(&self, node_count: usize) -> Result<()> {
        let fields = [
            (TOPOGRAPHIC_ELEVATION, Some(&self.elevation)),
            (BEDROCK_ELEVATION, self.bedrock.as_ref()),
            (SOIL_DEPTH, self.soil_depth.as_ref()),
        ];
        for (name, values) in fields {
            if let Some(values) = values {
                if values.len() != node_count {
                    return Err(TalusError::FieldLength {
                        name: name.to_string(),
                        expected: node_count,
                        actual: values.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Move node `node` to elevation `z`, keeping the bedrock/soil split
    /// consistent: gains thicken the soil, losses strip soil first and then
    /// cut into bedrock.
    pub fn set_node_elevation(&mut self, node: usize, z: f64) {
        let dz = z - self.elevation[node];
        if let (Some(bedrock), Some(soil)) = (self.bedrock.as_mut(), self.soil_depth.as_mut()) {
            let mut d = soil[node] + dz;
            if d < 0.0 {
                bedrock[node] += d;
                d = 0.0;
            }
            soil[node] = d;
        }
        self.elevation[node] = z;
        self.revision += 1;
    }

    /// Raise a node by `dz`, moving bedrock with it.
    pub fn uplift_node(&mut self, node: usize, dz: f64) {
        if let Some(bedrock) = self.bedrock.as_mut() {
            bedrock[node] += dz;
        }
        self.elevation[node] += dz;
        self.revision += 1;
    }

    pub fn min_elevation(&self) -> f64 {
        self.elevation.iter().cloned().fold(f64::INFINITY, f64::min)
    }

    pub fn max_elevation(&self) -> f64 {
        self.elevation.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Mean elevation over `nodes`, or 0 when `nodes` is empty.
    pub fn mean_elevation_over(&self, nodes: &[usize]) -> f64 {
        if nodes.is_empty() {
            return 0.0;
        }
        nodes.iter().map(|&n| self.elevation[n]).sum::<f64>() / nodes.len() as f64
    }
}
