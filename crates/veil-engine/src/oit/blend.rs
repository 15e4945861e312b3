//! Weighted blended order-independent transparency.
//!
//! Translucent fragments are not sorted. Each one adds its weighted premultiplied
//! color to an accumulation target and scales a revealage target by `1 - alpha`.
//! Sum and product are both commutative, so the resolved image does not depend
//! on draw order.
//!
//! The CPU reference below feeds the fragment outputs of `shaders/oit_common.wgsl`
//! through the same [`wgpu::ColorTargetState`]s the translucent pipelines use, and
//! resolves with the formula of `shaders/composite.wgsl`.

use super::targets::{ACCUM_FORMAT, DEPTH_FORMAT, OPAQUE_FORMAT, REVEAL_FORMAT};
use crate::paint::Color;

/// Smallest accumulated weight the resolve divides by.
pub const MIN_ACCUM_WEIGHT: f32 = 1e-5;

/// Largest finite value of the half-float accumulation target.
///
/// A single fragment weighs at most `3e3 * alpha^2`, so a few dozen strongly
/// weighted layers on one pixel overflow to infinity. The resolve clamps to this
/// value first; the pixel then shows a saturated average instead of NaN.
pub const ACCUM_MAX: f32 = 65504.0;

/// Depth weight of a fragment at view distance `depth` with coverage `alpha`.
///
/// `w = alpha * clamp(0.03 / (1e-5 + (depth / 200)^4), 1e-2, 3e3)`
#[inline]
pub fn weight(depth: f32, alpha: f32) -> f32 {
    let d = depth / 200.0;
    alpha * (0.03 / (1e-5 + d * d * d * d)).clamp(1e-2, 3e3)
}

// ── CPU reference ─────────────────────────────────────────────────────────

/// One translucent fragment: premultiplied color and positive view distance.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Fragment {
    pub color: Color,
    pub depth: f32,
}

impl Fragment {
    pub const fn new(color: Color, depth: f32) -> Self {
        Self { color, depth }
    }
}

/// Contents of one pixel of the accumulation and revealage targets.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Accumulator {
    pub accum: [f32; 4],
    pub reveal: f32,
}

impl Default for Accumulator {
    /// The cleared state: accumulation `0`, revealage `1`.
    fn default() -> Self {
        Self {
            accum: [0.0; 4],
            reveal: 1.0,
        }
    }
}

impl Accumulator {
    /// Blends one fragment in through [`translucent_color_targets`].
    pub fn add(&mut self, fragment: Fragment) {
        let c = fragment.color;
        let w = weight(fragment.depth, c.a);
        let [accum_target, reveal_target] = translucent_color_targets();

        // Outputs of `oit_output`: @location(0) accumulation, @location(1) revealage.
        let accum_src = [c.r * w, c.g * w, c.b * w, c.a * w];
        let reveal_src = [c.a, 0.0, 0.0, 0.0];

        if let Some(target) = &accum_target {
            self.accum = blend_target(target, accum_src, self.accum);
        }
        if let Some(target) = &reveal_target {
            // Single-channel target: missing channels read back as (0, 0, 1).
            self.reveal = blend_target(target, reveal_src, [self.reveal, 0.0, 0.0, 1.0])[0];
        }
    }

    pub fn extend<I: IntoIterator<Item = Fragment>>(&mut self, fragments: I) {
        for f in fragments {
            self.add(f);
        }
    }

    /// Resolves this pixel over `opaque`.
    pub fn resolve(&self, opaque: Color) -> Color {
        composite(opaque, self.accum, self.reveal)
    }
}

/// Composite of one pixel; alpha of the result is always 1.
///
/// `avg = accum.rgb / max(accum.a, 1e-5)`,
/// `out = opaque * reveal + avg * (1 - reveal)`.
///
/// `accum` is clamped to [`ACCUM_MAX`] first.
pub fn composite(opaque: Color, accum: [f32; 4], reveal: f32) -> Color {
    let accum = accum.map(|v| v.min(ACCUM_MAX));
    let inv = 1.0 / accum[3].max(MIN_ACCUM_WEIGHT);
    let t = 1.0 - reveal;
    Color::from_premul(
        opaque.r * reveal + accum[0] * inv * t,
        opaque.g * reveal + accum[1] * inv * t,
        opaque.b * reveal + accum[2] * inv * t,
        1.0,
    )
}

// ── fixed-function blending ───────────────────────────────────────────────

const CHANNEL_WRITES: [wgpu::ColorWrites; 4] = [
    wgpu::ColorWrites::RED,
    wgpu::ColorWrites::GREEN,
    wgpu::ColorWrites::BLUE,
    wgpu::ColorWrites::ALPHA,
];

/// What the blender stores for `src` over `dst` on a color target.
///
/// The blend constant is taken as zero, wgpu's default. Dual-source factors are
/// not modeled.
pub(crate) fn blend_target(
    target: &wgpu::ColorTargetState,
    src: [f32; 4],
    dst: [f32; 4],
) -> [f32; 4] {
    std::array::from_fn(|ch| {
        if !target.write_mask.contains(CHANNEL_WRITES[ch]) {
            return dst[ch];
        }
        match &target.blend {
            None => src[ch],
            Some(blend) => {
                let component = if ch == 3 { &blend.alpha } else { &blend.color };
                blend_channel(component, src, dst, ch)
            }
        }
    })
}

fn blend_channel(c: &wgpu::BlendComponent, src: [f32; 4], dst: [f32; 4], ch: usize) -> f32 {
    let s = src[ch] * blend_factor(c.src_factor, src, dst, ch);
    let d = dst[ch] * blend_factor(c.dst_factor, src, dst, ch);
    match c.operation {
        wgpu::BlendOperation::Add => s + d,
        wgpu::BlendOperation::Subtract => s - d,
        wgpu::BlendOperation::ReverseSubtract => d - s,
        wgpu::BlendOperation::Min => src[ch].min(dst[ch]),
        wgpu::BlendOperation::Max => src[ch].max(dst[ch]),
    }
}

fn blend_factor(factor: wgpu::BlendFactor, src: [f32; 4], dst: [f32; 4], ch: usize) -> f32 {
    use wgpu::BlendFactor as F;
    match factor {
        F::Zero | F::Constant => 0.0,
        F::One | F::OneMinusConstant => 1.0,
        F::Src => src[ch],
        F::OneMinusSrc => 1.0 - src[ch],
        F::SrcAlpha => src[3],
        F::OneMinusSrcAlpha => 1.0 - src[3],
        F::Dst => dst[ch],
        F::OneMinusDst => 1.0 - dst[ch],
        F::DstAlpha => dst[3],
        F::OneMinusDstAlpha => 1.0 - dst[3],
        F::SrcAlphaSaturated if ch == 3 => 1.0,
        F::SrcAlphaSaturated => src[3].min(1.0 - dst[3]),
        _ => 0.0,
    }
}

// ── GPU state for shader pipelines ────────────────────────────────────────

/// Accumulation target blend: `dst += src` on all channels.
pub fn accum_blend() -> wgpu::BlendState {
    let add = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: add,
        alpha: add,
    }
}

/// Revealage target blend: `dst *= 1 - src`.
pub fn reveal_blend() -> wgpu::BlendState {
    let scale = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Zero,
        dst_factor: wgpu::BlendFactor::OneMinusSrc,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: scale,
        alpha: scale,
    }
}

pub fn opaque_color_target() -> [Option<wgpu::ColorTargetState>; 1] {
    [Some(wgpu::ColorTargetState {
        format: OPAQUE_FORMAT,
        blend: None,
        write_mask: wgpu::ColorWrites::ALL,
    })]
}

/// Targets of a translucent pipeline: `@location(0)` accumulation,
/// `@location(1)` revealage.
pub fn translucent_color_targets() -> [Option<wgpu::ColorTargetState>; 2] {
    [
        Some(wgpu::ColorTargetState {
            format: ACCUM_FORMAT,
            blend: Some(accum_blend()),
            write_mask: wgpu::ColorWrites::ALL,
        }),
        Some(wgpu::ColorTargetState {
            format: REVEAL_FORMAT,
            blend: Some(reveal_blend()),
            write_mask: wgpu::ColorWrites::RED,
        }),
    ]
}

/// Standard depth testing for opaque geometry.
pub fn opaque_depth_state() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::LessEqual,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Translucent geometry is tested against opaque depth but never writes it.
pub fn translucent_depth_state() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        depth_write_enabled: false,
        ..opaque_depth_state()
    }
}
