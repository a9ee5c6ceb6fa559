//! SSE register layout shared by the renderer and the reference model.
//!
//! The renderer prints these constants into generated code and
//! [`crate::simulate`] executes them, so a wrong lane order or slope factor
//! shows up as a numeric mismatch against the portable kernels.

/// `float` lanes per `__m128`.
pub const REGISTER_WIDTH: usize = 4;

/// Elements per iteration of the runtime loop (`samples_per_loop`).
pub const SAMPLES_PER_LOOP: usize = 8;

/// Ramp offsets in `_mm_set_ps` argument order.
///
/// `_mm_set_ps(e3, e2, e1, e0)` puts its last argument in lane 0, the lane
/// stored first, so the list runs from the largest offset down to zero.
pub const RAMP_SET_ORDER: [usize; REGISTER_WIDTH] = [3, 2, 1, 0];

/// Slope multiplier applied to a ramp register after each register step.
pub const RAMP_STEP: usize = REGISTER_WIDTH;

/// Register steps per runtime loop iteration.
pub const STEPS_PER_LOOP: usize = SAMPLES_PER_LOOP / REGISTER_WIDTH;

/// Element offsets visited by the compile-time unroller instantiated at `n`.
///
/// Mirrors `f<n>` processing one register and recursing on `f<n-4>` down to
/// the empty `f<0>`. Returns `None` when `n` never reaches the base case.
pub fn unroll_schedule(n: usize) -> Option<Vec<usize>> {
    if n == 0 {
        return Some(Vec::new());
    }
    if n < REGISTER_WIDTH {
        return None;
    }
    let mut rest = unroll_schedule(n - REGISTER_WIDTH)?;
    for offset in &mut rest {
        *offset += REGISTER_WIDTH;
    }
    rest.insert(0, 0);
    Some(rest)
}

/// Model of one `__m128` register holding four `float` lanes, lane 0 first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct F32x4(pub [f32; REGISTER_WIDTH]);

impl F32x4 {
    /// `_mm_set_ps(e3, e2, e1, e0)`.
    pub fn set_ps(e3: f32, e2: f32, e1: f32, e0: f32) -> Self {
        Self([e0, e1, e2, e3])
    }

    /// `_mm_set_ps1(value)`.
    pub fn splat(value: f32) -> Self {
        Self([value; REGISTER_WIDTH])
    }

    /// `_mm_load_ps(src)`.
    pub fn load(src: &[f32]) -> Self {
        let mut lanes = [0.0; REGISTER_WIDTH];
        lanes.copy_from_slice(&src[..REGISTER_WIDTH]);
        Self(lanes)
    }

    /// `_mm_store_ps(out, self)`.
    pub fn store(self, out: &mut [f32]) {
        out[..REGISTER_WIDTH].copy_from_slice(&self.0);
    }

    pub fn map2(self, other: Self, f: impl Fn(f32, f32) -> f32) -> Self {
        let mut lanes = [0.0; REGISTER_WIDTH];
        for (i, lane) in lanes.iter_mut().enumerate() {
            *lane = f(self.0[i], other.0[i]);
        }
        Self(lanes)
    }

    pub fn add(self, other: Self) -> Self {
        self.map2(other, |a, b| a + b)
    }

    pub fn sub(self, other: Self) -> Self {
        self.map2(other, |a, b| a - b)
    }

    pub fn mul(self, other: Self) -> Self {
        self.map2(other, |a, b| a * b)
    }

    pub fn div(self, other: Self) -> Self {
        self.map2(other, |a, b| a / b)
    }

    /// `_mm_min_ps`: the second operand wins unless the first is smaller.
    pub fn min(self, other: Self) -> Self {
        self.map2(other, |a, b| if a < b { a } else { b })
    }

    /// `_mm_max_ps`: the second operand wins unless the first is larger.
    pub fn max(self, other: Self) -> Self {
        self.map2(other, |a, b| if a > b { a } else { b })
    }

    /// `_mm_cmp*_ps`: all bits set where `pred` holds, zero elsewhere.
    pub fn compare(self, other: Self, pred: impl Fn(f32, f32) -> bool) -> Self {
        self.map2(other, |a, b| {
            if pred(a, b) {
                f32::from_bits(u32::MAX)
            } else {
                0.0
            }
        })
    }

    /// `_mm_and_ps`.
    pub fn and(self, other: Self) -> Self {
        self.map2(other, |a, b| f32::from_bits(a.to_bits() & b.to_bits()))
    }
}
