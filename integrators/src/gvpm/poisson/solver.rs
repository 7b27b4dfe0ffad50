//! Screened Poisson solver

use super::*;

/// Smallest residual used for L1 weights.
const IRLS_EPSILON: f64 = 1e-3;

/// Norm minimised by the reconstruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReconstructionNorm {
    L1,
    L2,
}

impl fmt::Display for ReconstructionNorm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::L1 => write!(f, "L1"),
            Self::L2 => write!(f, "L2"),
        }
    }
}

/// Solves `(alpha^2 W0 + Dx^T Wx Dx + Dy^T Wy Dy) x = alpha^2 W0 t + Dx^T Wx gx + Dy^T Wy gy`
/// per channel with conjugate gradients. The weights are 1 for the L2 norm;
/// the L1 norm reweights them from the residuals of the previous solve.
#[derive(Copy, Clone, Debug)]
pub struct ScreenedPoissonSolver {
    /// Norm to minimise.
    pub norm: ReconstructionNorm,

    /// Conjugate gradient iterations per solve.
    pub max_iterations: usize,

    /// Relative residual at which a solve stops.
    pub tolerance: f64,

    /// Reweighting rounds of the L1 norm.
    pub irls_iterations: usize,
}

impl ScreenedPoissonSolver {
    /// Returns a solver with default iteration counts.
    ///
    /// * `norm` - Norm to minimise.
    pub fn new(norm: ReconstructionNorm) -> Self {
        Self {
            norm,
            max_iterations: 200,
            tolerance: 1e-6,
            irls_iterations: 8,
        }
    }
}

/// Single channel system with per term weights.
struct Channel<'a> {
    width: usize,
    height: usize,
    alpha2: f64,
    t: &'a [f64],
    gx: &'a [f64],
    gy: &'a [f64],
    w0: Vec<f64>,
    wx: Vec<f64>,
    wy: Vec<f64>,
}

impl<'a> Channel<'a> {
    fn new(width: usize, height: usize, alpha: f64, t: &'a [f64], gx: &'a [f64], gy: &'a [f64]) -> Self {
        let n = width * height;
        Self {
            width,
            height,
            alpha2: alpha * alpha,
            t,
            gx,
            gy,
            w0: vec![1.0; n],
            wx: vec![1.0; n],
            wy: vec![1.0; n],
        }
    }

    /// Forward difference along x, zero on the last column.
    fn dx(&self, v: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; v.len()];
        for y in 0..self.height {
            for x in 0..self.width.saturating_sub(1) {
                let i = y * self.width + x;
                out[i] = v[i + 1] - v[i];
            }
        }
        out
    }

    /// Forward difference along y, zero on the last row.
    fn dy(&self, v: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; v.len()];
        for y in 0..self.height.saturating_sub(1) {
            for x in 0..self.width {
                let i = y * self.width + x;
                out[i] = v[i + self.width] - v[i];
            }
        }
        out
    }

    /// Adds `Dx^T g` to `out`.
    fn add_dx_t(&self, g: &[f64], out: &mut [f64]) {
        for y in 0..self.height {
            for x in 0..self.width.saturating_sub(1) {
                let i = y * self.width + x;
                out[i] -= g[i];
                out[i + 1] += g[i];
            }
        }
    }

    /// Adds `Dy^T g` to `out`.
    fn add_dy_t(&self, g: &[f64], out: &mut [f64]) {
        for y in 0..self.height.saturating_sub(1) {
            for x in 0..self.width {
                let i = y * self.width + x;
                out[i] -= g[i];
                out[i + self.width] += g[i];
            }
        }
    }

    /// Applies the system matrix.
    fn apply(&self, v: &[f64]) -> Vec<f64> {
        let mut out: Vec<f64> = v.iter().zip(self.w0.iter()).map(|(v, w)| self.alpha2 * w * v).collect();
        let ddx: Vec<f64> = self.dx(v).iter().zip(self.wx.iter()).map(|(d, w)| d * w).collect();
        let ddy: Vec<f64> = self.dy(v).iter().zip(self.wy.iter()).map(|(d, w)| d * w).collect();
        self.add_dx_t(&ddx, &mut out);
        self.add_dy_t(&ddy, &mut out);
        out
    }

    /// Returns the right hand side.
    fn rhs(&self) -> Vec<f64> {
        let mut out: Vec<f64> = self.t.iter().zip(self.w0.iter()).map(|(t, w)| self.alpha2 * w * t).collect();
        let gx = self.masked_gx();
        let wgx: Vec<f64> = gx.iter().zip(self.wx.iter()).map(|(g, w)| g * w).collect();
        let wgy: Vec<f64> = self.masked_gy().iter().zip(self.wy.iter()).map(|(g, w)| g * w).collect();
        self.add_dx_t(&wgx, &mut out);
        self.add_dy_t(&wgy, &mut out);
        out
    }

    /// Horizontal gradients with the last column zeroed.
    fn masked_gx(&self) -> Vec<f64> {
        let mut g = self.gx.to_vec();
        if self.width > 0 {
            for y in 0..self.height {
                g[y * self.width + self.width - 1] = 0.0;
            }
        }
        g
    }

    /// Vertical gradients with the last row zeroed.
    fn masked_gy(&self) -> Vec<f64> {
        let mut g = self.gy.to_vec();
        if self.height > 0 {
            let start = (self.height - 1) * self.width;
            g[start..].iter_mut().for_each(|v| *v = 0.0);
        }
        g
    }

    /// Recomputes the weights from the residuals of a solution.
    fn reweight(&mut self, x: &[f64]) {
        let gx = self.masked_gx();
        let gy = self.masked_gy();
        let dx = self.dx(x);
        let dy = self.dy(x);
        for i in 0..x.len() {
            self.w0[i] = 1.0 / (x[i] - self.t[i]).abs().max(IRLS_EPSILON);
            self.wx[i] = 1.0 / (dx[i] - gx[i]).abs().max(IRLS_EPSILON);
            self.wy[i] = 1.0 / (dy[i] - gy[i]).abs().max(IRLS_EPSILON);
        }
    }

    /// Conjugate gradients starting from `x`.
    fn conjugate_gradients(&self, x: &mut [f64], max_iterations: usize, tolerance: f64) {
        let b = self.rhs();
        let b_norm = dot(&b, &b).sqrt();
        if b_norm == 0.0 {
            x.iter_mut().for_each(|v| *v = 0.0);
            return;
        }
        let ax = self.apply(x);
        let mut r: Vec<f64> = b.iter().zip(ax.iter()).map(|(b, a)| b - a).collect();
        let mut p = r.clone();
        let mut rr = dot(&r, &r);
        for _ in 0..max_iterations {
            if rr.sqrt() <= tolerance * b_norm {
                break;
            }
            let ap = self.apply(&p);
            let pap = dot(&p, &ap);
            if pap <= 0.0 {
                break;
            }
            let step = rr / pap;
            for i in 0..x.len() {
                x[i] += step * p[i];
                r[i] -= step * ap[i];
            }
            let rr_new = dot(&r, &r);
            let beta = rr_new / rr;
            for i in 0..p.len() {
                p[i] = r[i] + beta * p[i];
            }
            rr = rr_new;
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(a, b)| a * b).sum()
}

impl PoissonSolver for ScreenedPoissonSolver {
    fn solve(
        &self,
        throughput: &[Float],
        dx: &[Float],
        dy: &[Float],
        width: usize,
        height: usize,
        channels: usize,
        alpha: Float,
    ) -> Vec<Float> {
        let n = width * height;
        let mut out = Vec::with_capacity(n * channels);
        for c in 0..channels {
            let range = c * n..(c + 1) * n;
            let to_f64 = |v: &[Float]| v[range.clone()].iter().map(|&x| x as f64).collect::<Vec<f64>>();
            let t = to_f64(throughput);
            let gx = to_f64(dx);
            let gy = to_f64(dy);

            let mut channel = Channel::new(width, height, alpha as f64, &t, &gx, &gy);
            let mut x = t.clone();
            channel.conjugate_gradients(&mut x, self.max_iterations, self.tolerance);
            if self.norm == ReconstructionNorm::L1 {
                for _ in 0..self.irls_iterations {
                    channel.reweight(&x);
                    channel.conjugate_gradients(&mut x, self.max_iterations, self.tolerance);
                }
            }
            out.extend(x.into_iter().map(|v| v as Float));
        }
        out
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn forward_differences(img: &[Float], w: usize, h: usize) -> (Vec<Float>, Vec<Float>) {
        let mut gx = vec![0.0; w * h];
        let mut gy = vec![0.0; w * h];
        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                if x + 1 < w {
                    gx[i] = img[i + 1] - img[i];
                }
                if y + 1 < h {
                    gy[i] = img[i + w] - img[i];
                }
            }
        }
        (gx, gy)
    }

    #[test]
    fn zero_input_gives_zero() {
        let (w, h) = (5, 4);
        let zeros = vec![0.0; w * h * 3];
        for norm in [ReconstructionNorm::L1, ReconstructionNorm::L2] {
            let out = ScreenedPoissonSolver::new(norm).solve(&zeros, &zeros, &zeros, w, h, 3, 0.2);
            assert_eq!(out.len(), zeros.len());
            assert!(out.iter().all(|v| *v == 0.0));
        }
    }

    #[test]
    fn gradients_fix_a_noisy_primal() {
        let (w, h) = (8, 8);
        let clean: Vec<Float> = (0..w * h).map(|i| ((i % w) as Float * 0.3).sin() + 1.5).collect();
        let (gx, gy) = forward_differences(&clean, w, h);
        let noisy: Vec<Float> = clean
            .iter()
            .enumerate()
            .map(|(i, v)| v + if i % 2 == 0 { 0.4 } else { -0.4 })
            .collect();

        let error = |img: &[Float]| -> Float { img.iter().zip(clean.iter()).map(|(a, b)| (a - b).abs()).sum() };
        for norm in [ReconstructionNorm::L1, ReconstructionNorm::L2] {
            let out = ScreenedPoissonSolver::new(norm).solve(&noisy, &gx, &gy, w, h, 1, 0.2);
            assert!(error(&out) < 0.25 * error(&noisy), "{}", norm);
        }
    }

    #[test]
    fn last_column_gradients_are_ignored() {
        let (w, h) = (3, 2);
        let t = vec![1.0; w * h];
        let mut gx = vec![0.0; w * h];
        gx[2] = 100.0;
        gx[5] = -100.0;
        let gy = vec![0.0; w * h];
        let out = ScreenedPoissonSolver::new(ReconstructionNorm::L2).solve(&t, &gx, &gy, w, h, 1, 0.2);
        assert!(out.iter().all(|v| (v - 1.0).abs() < 1e-4));
    }

    proptest! {
        #[test]
        fn l2_solution_satisfies_the_system(
            values in proptest::collection::vec(-2.0..2.0f64, 3 * 16),
            alpha in 0.05..1.0f64,
        ) {
            let (w, h) = (4, 4);
            let t = &values[0..16];
            let gx = &values[16..32];
            let gy = &values[32..48];
            let channel = Channel::new(w, h, alpha, t, gx, gy);
            let mut x = t.to_vec();
            channel.conjugate_gradients(&mut x, 500, 1e-10);
            let ax = channel.apply(&x);
            let b = channel.rhs();
            let res: f64 = ax.iter().zip(b.iter()).map(|(a, b)| (a - b) * (a - b)).sum::<f64>().sqrt();
            let b_norm = dot(&b, &b).sqrt();
            prop_assert!(res <= 1e-6 * b_norm.max(1.0));
        }
    }
}
