use anyhow::{bail, Result};

/// Transfer factor of the share cascade: each later row donates this
/// fraction of its current share to the row in front of it.
const TRANSFER: f32 = 0.05;

/// Normalized depth fractions for the rows of a perspective grid.
///
/// `forward` runs near-edge 0.0 up to 1.0 at the horizon with increments
/// that shrink toward index 0, so rows bunch together as they approach the
/// vanishing point without ever fully collapsing. `reversed` is derived
/// from the same base computation and is indexed by a row's distance from
/// the near baseline, giving the depth scale for dot size and amplitude.
#[derive(Clone, Debug)]
pub(crate) struct PerspectiveCurve {
    forward: Vec<f32>,
    reversed: Vec<f32>,
}

impl PerspectiveCurve {
    /// Computes both curves for `rows` grid rows. Runs once per layout.
    pub(crate) fn compute(rows: usize) -> Result<Self> {
        if rows == 0 {
            bail!("perspective curve needs at least one row");
        }

        let mut shares = vec![100.0_f32 / rows as f32; rows];

        // Rightward cascade, iteratively: row `base` absorbs 5% of every
        // later share in ascending order, each of which already gave up
        // 5% to the rows before it. Front-loads the 100 budget onto the
        // low indices.
        for base in 0..rows - 1 {
            for inc in base + 1..rows {
                let transfer = shares[inc] * TRANSFER;
                shares[base] += transfer;
                shares[inc] -= transfer;
            }
        }

        // Largest share last, then cumulative-sum and normalize so the
        // increments grow from horizon to near edge.
        shares.reverse();
        let mut acc = 0.0;
        let cumulative: Vec<f32> = shares
            .iter()
            .map(|share| {
                acc += share;
                acc / 100.0
            })
            .collect();

        let mut forward = Vec::with_capacity(rows + 1);
        forward.push(0.0);
        forward.extend_from_slice(&cumulative);

        let mut reversed = Vec::with_capacity(rows + 1);
        reversed.push(1.0);
        reversed.extend(cumulative.iter().rev());

        Ok(Self { forward, reversed })
    }

    pub(crate) fn forward(&self) -> &[f32] {
        &self.forward
    }

    /// Depth scale by distance from the near baseline: 1.0 for the
    /// nearest row, shrinking toward the horizon.
    pub(crate) fn reversed(&self) -> &[f32] {
        &self.reversed
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.forward.len()
    }
}
