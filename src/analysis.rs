//! Quantitative metrics over read-back fields.
//!
//! The solver lives on the GPU; these helpers run over the f32 snapshots
//! [`crate::FluidEffect::read_velocity`] and `read_dye` return, for tests
//! and the headless demo run.

/// Summary statistics for one frame's velocity and dye snapshot.
#[derive(Debug, Clone)]
pub struct FieldMetrics {
    pub max_speed: f32,
    pub avg_speed: f32,
    /// L2 norm of the discrete central-difference divergence over interior
    /// cells. Zero for a perfectly projected field.
    pub divergence_l2: f32,
    pub max_divergence: f32,
    pub total_dye: f32,
    pub frame: usize,
}

impl FieldMetrics {
    pub fn analyze(
        velocity: &[[f32; 2]],
        dye: &[f32],
        width: usize,
        height: usize,
        frame: usize,
    ) -> Self {
        let mut max_speed: f32 = 0.0;
        let mut speed_sum: f32 = 0.0;
        for v in velocity {
            let speed = (v[0] * v[0] + v[1] * v[1]).sqrt();
            max_speed = max_speed.max(speed);
            speed_sum += speed;
        }

        let div = divergence(velocity, width, height);
        let mut divergence_sq = 0.0;
        let mut max_divergence: f32 = 0.0;
        for d in &div {
            divergence_sq += d * d;
            max_divergence = max_divergence.max(d.abs());
        }

        Self {
            max_speed,
            avg_speed: speed_sum / velocity.len().max(1) as f32,
            divergence_l2: divergence_sq.sqrt(),
            max_divergence,
            total_dye: dye.iter().sum(),
            frame,
        }
    }

    pub fn print_summary(&self) {
        println!("Frame {} Metrics:", self.frame);
        println!("  Max Speed: {:.6}", self.max_speed);
        println!("  Avg Speed: {:.6}", self.avg_speed);
        println!("  Divergence L2: {:.6}", self.divergence_l2);
        println!("  Max |Divergence|: {:.6}", self.max_divergence);
        println!("  Total Dye: {:.6}", self.total_dye);
        println!();
    }
}

/// Central-difference divergence over interior cells, row-major, zero on
/// the boundary ring.
pub fn divergence(velocity: &[[f32; 2]], width: usize, height: usize) -> Vec<f32> {
    let mut out = vec![0.0; width * height];
    if width < 3 || height < 3 {
        return out;
    }
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let idx = y * width + x;
            out[idx] = 0.5
                * (velocity[idx + 1][0] - velocity[idx - 1][0] + velocity[idx + width][1]
                    - velocity[idx - width][1]);
        }
    }
    out
}

/// L2 norm of the interior divergence; the projection-quality number the
/// tests assert on.
pub fn divergence_l2(velocity: &[[f32; 2]], width: usize, height: usize) -> f32 {
    divergence(velocity, width, height)
        .iter()
        .map(|d| d * d)
        .sum::<f32>()
        .sqrt()
}
