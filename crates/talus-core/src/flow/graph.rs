//! Single-receiver flow graph with upstream ordering and donor lists.
use crate::error::{Result, TalusError};
use crate::surface::Surface;

/// Receiver map, steepest slopes and topological order for one elevation
/// state.
///
/// `stack` lists every node so that a receiver always comes before its
/// donors: iterate forward for downstream-to-upstream sweeps, in reverse for
/// upstream-to-downstream accumulation. Buffers are reused across rebuilds.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    receivers: Vec<usize>,
    slopes: Vec<f64>,
    /// Length of the link to the receiver (or the reference length of a pit).
    link_lengths: Vec<f64>,
    stack: Vec<usize>,
    /// CSR inverse of `receivers`: donors of `i` are `donors[donor_offsets[i]..donor_offsets[i + 1]]`.
    donor_offsets: Vec<usize>,
    donors: Vec<usize>,
    /// Surface revision the receivers were chosen for; `None` until first built.
    revision: Option<u64>,
    /// Surface revision `slopes` were last rewritten against, when that
    /// happened after routing (threshold clipping).
    slope_revision: Option<u64>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from externally computed routing. Slopes must be
    /// non-negative and lengths positive; the receiver map must be a forest.
    pub fn from_parts(
        receivers: Vec<usize>,
        slopes: Vec<f64>,
        link_lengths: Vec<f64>,
        surface: &Surface,
    ) -> Result<Self> {
        let n = receivers.len();
        for (name, len) in [("slope", slopes.len()), ("link_length", link_lengths.len())] {
            if len != n {
                return Err(TalusError::FieldLength { name: name.to_string(), expected: n, actual: len });
            }
        }
        for (node, &r) in receivers.iter().enumerate() {
            if r >= n {
                return Err(TalusError::NeighborOutOfRange { node, neighbor: r, nodes: n });
            }
            let len = link_lengths[node];
            if !(len.is_finite() && len > 0.0) {
                return Err(TalusError::InvalidLinkLength { node, neighbor: r, length: len });
            }
        }
        let mut graph = Self {
            receivers,
            slopes: slopes.into_iter().map(|s| s.max(0.0)).collect(),
            link_lengths,
            ..Self::default()
        };
        graph.rebuild_order()?;
        graph.stamp(surface.revision());
        Ok(graph)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }

    #[inline]
    pub fn receivers(&self) -> &[usize] {
        &self.receivers
    }

    #[inline]
    pub fn receiver(&self, node: usize) -> usize {
        self.receivers[node]
    }

    #[inline]
    pub fn slopes(&self) -> &[f64] {
        &self.slopes
    }

    #[inline]
    pub fn slope(&self, node: usize) -> f64 {
        self.slopes[node]
    }

    #[inline]
    pub fn link_lengths(&self) -> &[f64] {
        &self.link_lengths
    }

    #[inline]
    pub fn link_length(&self, node: usize) -> f64 {
        self.link_lengths[node]
    }

    /// Nodes ordered receivers-first.
    #[inline]
    pub fn upstream_order(&self) -> &[usize] {
        &self.stack
    }

    /// Nodes that route directly into `node`.
    #[inline]
    pub fn donors_of(&self, node: usize) -> &[usize] {
        &self.donors[self.donor_offsets[node]..self.donor_offsets[node + 1]]
    }

    #[inline]
    pub fn is_pit(&self, node: usize) -> bool {
        self.receivers[node] == node
    }

    /// Self-receiving nodes (outlets, sinks, closed nodes).
    pub fn pits(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(move |&n| self.is_pit(n))
    }

    /// Surface revision the receivers were routed on.
    pub fn revision(&self) -> Option<u64> {
        self.revision
    }

    /// Surface revision the slopes were last refreshed against.
    pub fn slope_revision(&self) -> Option<u64> {
        self.slope_revision.or(self.revision)
    }

    /// Steps needed to reach a self-receiver from `node`, or `None` if the
    /// chain is longer than the node count.
    pub fn receiver_chain_len(&self, node: usize) -> Option<usize> {
        let mut current = node;
        for steps in 0..=self.len() {
            let next = self.receivers[current];
            if next == current {
                return Some(steps);
            }
            current = next;
        }
        None
    }

    /// Fail unless the receivers were routed on the surface's current
    /// revision. A slope refresh alone does not count.
    pub fn ensure_current(&self, surface: &Surface) -> Result<()> {
        if self.revision != Some(surface.revision()) || self.len() != surface.len() {
            return Err(TalusError::StaleFlowGraph {
                graph_revision: self.revision,
                surface_revision: surface.revision(),
            });
        }
        Ok(())
    }

    /// Fail unless either the routing or the last slope refresh matches the
    /// surface's current revision.
    pub fn ensure_slopes_current(&self, surface: &Surface) -> Result<()> {
        let current = Some(surface.revision());
        if self.len() != surface.len() || (self.revision != current && self.slope_revision != current) {
            return Err(TalusError::StaleFlowGraph {
                graph_revision: self.slope_revision(),
                surface_revision: surface.revision(),
            });
        }
        Ok(())
    }

    // ── Crate-internal mutation ──────────────────────────────────────────────

    /// Size all per-node buffers for `n` nodes and mark the graph unbuilt.
    pub(crate) fn reset(&mut self, n: usize) {
        self.receivers.clear();
        self.receivers.extend(0..n);
        self.slopes.clear();
        self.slopes.resize(n, 0.0);
        self.link_lengths.clear();
        self.link_lengths.resize(n, 1.0);
        self.revision = None;
        self.slope_revision = None;
    }

    #[inline]
    pub(crate) fn set_route(&mut self, node: usize, receiver: usize, slope: f64, length: f64) {
        self.receivers[node] = receiver;
        self.slopes[node] = slope;
        self.link_lengths[node] = length;
    }

    #[inline]
    pub(crate) fn set_slope(&mut self, node: usize, slope: f64) {
        self.slopes[node] = slope;
    }

    /// Mark the receivers as routed on `revision`.
    pub(crate) fn stamp(&mut self, revision: u64) {
        self.revision = Some(revision);
        self.slope_revision = None;
    }

    /// Mark the slopes as refreshed against `revision` without touching the
    /// routing stamp.
    pub(crate) fn stamp_slopes(&mut self, revision: u64) {
        self.slope_revision = Some(revision);
    }

    /// Rebuild donor lists and the receivers-first stack from `receivers`.
    ///
    /// Breadth-first from every self-receiver; any node left unvisited sits
    /// on a receiver cycle.
    pub(crate) fn rebuild_order(&mut self) -> Result<()> {
        let n = self.receivers.len();

        // Donor CSR.
        self.donor_offsets.clear();
        self.donor_offsets.resize(n + 1, 0);
        for (donor, &recv) in self.receivers.iter().enumerate() {
            if recv != donor {
                self.donor_offsets[recv + 1] += 1;
            }
        }
        for i in 0..n {
            self.donor_offsets[i + 1] += self.donor_offsets[i];
        }
        self.donors.clear();
        self.donors.resize(self.donor_offsets[n], 0);
        let mut write_pos = self.donor_offsets[..n].to_vec();
        for (donor, &recv) in self.receivers.iter().enumerate() {
            if recv != donor {
                self.donors[write_pos[recv]] = donor;
                write_pos[recv] += 1;
            }
        }

        // Stack.
        self.stack.clear();
        self.stack.extend((0..n).filter(|&i| self.receivers[i] == i));
        let mut head = 0;
        while head < self.stack.len() {
            let node = self.stack[head];
            head += 1;
            for k in self.donor_offsets[node]..self.donor_offsets[node + 1] {
                self.stack.push(self.donors[k]);
            }
        }

        if self.stack.len() < n {
            let mut visited = vec![false; n];
            for &i in &self.stack {
                visited[i] = true;
            }
            let node = visited.iter().position(|&v| !v).unwrap_or(0);
            self.revision = None;
            self.slope_revision = None;
            return Err(TalusError::FlowCycle { node });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_graph(receivers: Vec<usize>) -> Result<FlowGraph> {
        let n = receivers.len();
        let surface = Surface::new(n, 0.0);
        FlowGraph::from_parts(receivers, vec![0.0; n], vec![1.0; n], &surface)
    }

    #[test]
    fn stack_puts_receivers_before_donors() {
        // 0 <- 1 <- 2, 0 <- 3, 4 is its own outlet.
        let g = chain_graph(vec![0, 0, 1, 0, 4]).unwrap();
        let pos: Vec<usize> = {
            let mut p = vec![0; g.len()];
            for (k, &n) in g.upstream_order().iter().enumerate() {
                p[n] = k;
            }
            p
        };
        for n in 0..g.len() {
            assert!(pos[g.receiver(n)] <= pos[n], "receiver of {n} comes after it");
        }
        assert_eq!(g.upstream_order().len(), 5);
    }

    #[test]
    fn donors_invert_receivers() {
        let g = chain_graph(vec![0, 0, 1, 0, 4]).unwrap();
        assert_eq!(g.donors_of(0), &[1, 3]);
        assert_eq!(g.donors_of(1), &[2]);
        assert!(g.donors_of(2).is_empty());
        assert!(g.donors_of(4).is_empty());
        assert_eq!(g.pits().collect::<Vec<_>>(), vec![0, 4]);
    }

    #[test]
    fn cycle_is_detected() {
        // 1 -> 2 -> 1 never reaches the outlet at 0.
        let err = chain_graph(vec![0, 2, 1]).unwrap_err();
        assert_eq!(err, TalusError::FlowCycle { node: 1 });
    }

    #[test]
    fn chain_length_counts_hops_to_outlet() {
        let g = chain_graph(vec![0, 0, 1, 2]).unwrap();
        assert_eq!(g.receiver_chain_len(0), Some(0));
        assert_eq!(g.receiver_chain_len(3), Some(3));
    }

    #[test]
    fn stale_graph_is_rejected() {
        let mut surface = Surface::new(3, 0.0);
        let g = FlowGraph::from_parts(vec![0, 0, 1], vec![0.0; 3], vec![1.0; 3], &surface).unwrap();
        assert!(g.ensure_current(&surface).is_ok());
        surface.elevation_mut()[2] = 1.0;
        assert!(matches!(g.ensure_current(&surface), Err(TalusError::StaleFlowGraph { .. })));
        assert!(matches!(FlowGraph::new().ensure_current(&surface), Err(TalusError::StaleFlowGraph { .. })));
    }

    #[test]
    fn slope_refresh_does_not_refresh_routing() {
        let mut surface = Surface::new(3, 0.0);
        let mut g = FlowGraph::from_parts(vec![0, 0, 1], vec![0.0; 3], vec![1.0; 3], &surface).unwrap();
        surface.elevation_mut()[2] = 1.0;
        g.stamp_slopes(surface.revision());
        assert!(g.ensure_slopes_current(&surface).is_ok());
        assert!(matches!(g.ensure_current(&surface), Err(TalusError::StaleFlowGraph { .. })));
        assert_eq!(g.slope_revision(), Some(surface.revision()));

        surface.elevation_mut()[1] = 0.5;
        assert!(g.ensure_slopes_current(&surface).is_err());
    }
}
