//! CPU reference for the two FXAA shader passes, used by the software host.
//! Pixels are RGBA f32 in row-major order; reads outside the image clamp to
//! the border.

/// Rec.601 luma weights.
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

const EDGE_STEPS: i64 = 10;
/// Assumed extra distance when the edge end is not found within the walk.
const EDGE_GUESS: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendParams {
    pub contrast_threshold: f32,
    pub relative_threshold: f32,
    pub subpixel_blending: f32,
}

pub fn luminance(c: [f32; 4]) -> f32 {
    (c[0] * LUMA_WEIGHTS[0] + c[1] * LUMA_WEIGHTS[1] + c[2] * LUMA_WEIGHTS[2]).clamp(0.0, 1.0)
}

/// Pass 0: write luma into the red channel of `out`.
pub fn luminance_pass(src: &[[f32; 4]], out: &mut [[f32; 4]]) {
    for (o, c) in out.iter_mut().zip(src) {
        *o = [luminance(*c), 0.0, 0.0, 1.0];
    }
}

struct Plane<'a, T> {
    data: &'a [T],
    width: i64,
    height: i64,
}

impl<T: Copy> Plane<'_, T> {
    fn at(&self, x: i64, y: i64) -> T {
        let x = x.clamp(0, self.width - 1);
        let y = y.clamp(0, self.height - 1);
        self.data[(y * self.width + x) as usize]
    }
}

fn smoothstep(t: f32) -> f32 { t * t * (3.0 - 2.0 * t) }

fn lerp(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

/// Pass 1: contrast-gated edge-aware blend. `luma` holds one value per pixel.
pub fn blend_pass(src: &[[f32; 4]], luma: &[f32], width: u32, height: u32, params: &BlendParams, out: &mut [[f32; 4]]) {
    let color = Plane { data: src, width: width as i64, height: height as i64 };
    let l = Plane { data: luma, width: width as i64, height: height as i64 };

    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let idx = (y * width as i64 + x) as usize;
            out[idx] = blend_pixel(&color, &l, x, y, params);
        }
    }
}

fn blend_pixel(color: &Plane<'_, [f32; 4]>, l: &Plane<'_, f32>, x: i64, y: i64, params: &BlendParams) -> [f32; 4] {
    let m = l.at(x, y);
    let n = l.at(x, y - 1);
    let s = l.at(x, y + 1);
    let e = l.at(x + 1, y);
    let w = l.at(x - 1, y);

    let highest = m.max(n).max(s).max(e).max(w);
    let lowest = m.min(n).min(s).min(e).min(w);
    let contrast = highest - lowest;
    let threshold = params.contrast_threshold.max(params.relative_threshold * highest);
    if contrast < threshold || contrast <= 0.0 {
        return color.at(x, y);
    }

    let ne = l.at(x + 1, y - 1);
    let nw = l.at(x - 1, y - 1);
    let se = l.at(x + 1, y + 1);
    let sw = l.at(x - 1, y + 1);

    let filter = (2.0 * (n + e + s + w) + ne + nw + se + sw) / 12.0;
    let filter = ((filter - m).abs() / contrast).clamp(0.0, 1.0);
    let sub = smoothstep(filter);
    let sub_blend = sub * sub * params.subpixel_blending;

    let horizontal = 2.0 * (n + s - 2.0 * m).abs() + (ne + se - 2.0 * e).abs() + (nw + sw - 2.0 * w).abs();
    let vertical = 2.0 * (e + w - 2.0 * m).abs() + (ne + nw - 2.0 * n).abs() + (se + sw - 2.0 * s).abs();
    let is_horizontal = horizontal >= vertical;

    // Pick the neighbour across the edge with the steeper gradient.
    let (p_luma, n_luma) = if is_horizontal { (n, s) } else { (e, w) };
    let p_grad = (p_luma - m).abs();
    let n_grad = (n_luma - m).abs();
    let ((sx, sy), opposite, gradient) = match (is_horizontal, p_grad >= n_grad) {
        (true, true) => ((0, -1), n, p_grad),
        (true, false) => ((0, 1), s, n_grad),
        (false, true) => ((1, 0), e, p_grad),
        (false, false) => ((-1, 0), w, n_grad),
    };

    // Walk along the edge in both directions to find where it ends.
    let (ax, ay) = if is_horizontal { (1, 0) } else { (0, 1) };
    let edge_luma = (m + opposite) * 0.5;
    let gradient_threshold = gradient * 0.25;
    let walk = |dir: i64| -> (f32, f32) {
        let mut delta = 0.0;
        for k in 1..=EDGE_STEPS {
            let (px, py) = (x + ax * k * dir, y + ay * k * dir);
            delta = (l.at(px, py) + l.at(px + sx, py + sy)) * 0.5 - edge_luma;
            if delta.abs() >= gradient_threshold {
                return (k as f32, delta);
            }
        }
        (EDGE_STEPS as f32 + EDGE_GUESS, delta)
    };
    let (p_dist, p_delta) = walk(1);
    let (n_dist, n_delta) = walk(-1);

    let (shortest, delta_sign) = if p_dist <= n_dist { (p_dist, p_delta >= 0.0) } else { (n_dist, n_delta >= 0.0) };
    let edge_blend = if delta_sign == (m - edge_luma >= 0.0) {
        0.0
    } else {
        0.5 - shortest / (p_dist + n_dist)
    };

    let blend = edge_blend.max(sub_blend);
    lerp(color.at(x, y), color.at(x + sx, y + sy), blend)
}
