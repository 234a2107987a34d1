//! WGSL sources for every pass.
//!
//! Fragment bodies are written against one of two binding headers (one or
//! two sampled textures) plus a shared uniform block; [`one_texture`] and
//! [`two_texture`] assemble the full module source. Variant-bearing bodies
//! (`ADVECTION`, `DISPLAY`) carry `#ifdef` blocks that the preprocessor in
//! [`crate::shader`] resolves before compilation.

/// Fullscreen triangle, shared by every pass.
pub const VERTEX: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    var out: VertexOutput;
    let corner = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    out.uv = corner;
    out.position = vec4<f32>(corner * 2.0 - 1.0, 0.0, 1.0);
    return out;
}
"#;

/// One uniform block covers every pass; each fragment reads the fields it
/// needs and ignores the rest.
const UNIFORMS: &str = r#"
struct PassUniforms {
    texel: vec2<f32>,
    dye_texel: vec2<f32>,
    point: vec2<f32>,
    dt: f32,
    dissipation: f32,
    color: vec4<f32>,
    radius: f32,
    aspect: f32,
    curl: f32,
    value: f32,
};

@group(0) @binding(0) var<uniform> u: PassUniforms;
"#;

const ONE_TEXTURE: &str = r#"
@group(0) @binding(1) var tex_a: texture_2d<f32>;
@group(0) @binding(2) var samp: sampler;
"#;

const TWO_TEXTURE: &str = r#"
@group(0) @binding(1) var tex_a: texture_2d<f32>;
@group(0) @binding(2) var tex_b: texture_2d<f32>;
@group(0) @binding(3) var samp: sampler;
"#;

pub fn one_texture(body: &str) -> String {
    format!("{UNIFORMS}{ONE_TEXTURE}{body}")
}

pub fn two_texture(body: &str) -> String {
    format!("{UNIFORMS}{TWO_TEXTURE}{body}")
}

pub const COPY: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSampleLevel(tex_a, samp, uv, 0.0);
}
"#;

/// Scales the sampled field by `u.value`; used to attenuate the previous
/// frame's pressure before relaxation starts.
pub const CLEAR: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return u.value * textureSampleLevel(tex_a, samp, uv, 0.0);
}
"#;

/// Radial Gaussian-weighted injection added on top of the sampled base.
pub const SPLAT: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    var p = uv - u.point;
    p.x *= u.aspect;
    let splat = exp(-dot(p, p) / u.radius) * u.color.rgb;
    let base = textureSampleLevel(tex_a, samp, uv, 0.0).rgb;
    return vec4<f32>(base + splat, 1.0);
}
"#;

/// Semi-Lagrangian advection. `tex_a` is velocity, `tex_b` the advected
/// quantity. The MANUAL_FILTERING variant replaces hardware bilinear
/// sampling with a four-texel in-shader interpolation.
pub const ADVECTION: &str = r#"
fn bilerp(t: texture_2d<f32>, uv: vec2<f32>, tsize: vec2<f32>) -> vec4<f32> {
    let st = uv / tsize - 0.5;
    let iuv = floor(st);
    let fuv = fract(st);

    let a = textureSampleLevel(t, samp, (iuv + vec2<f32>(0.5, 0.5)) * tsize, 0.0);
    let b = textureSampleLevel(t, samp, (iuv + vec2<f32>(1.5, 0.5)) * tsize, 0.0);
    let c = textureSampleLevel(t, samp, (iuv + vec2<f32>(0.5, 1.5)) * tsize, 0.0);
    let d = textureSampleLevel(t, samp, (iuv + vec2<f32>(1.5, 1.5)) * tsize, 0.0);

    return mix(mix(a, b, fuv.x), mix(c, d, fuv.x), fuv.y);
}

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
#ifdef MANUAL_FILTERING
    let coord = uv - u.dt * bilerp(tex_a, uv, u.texel).xy * u.texel;
    let result = bilerp(tex_b, coord, u.dye_texel);
#else
    let coord = uv - u.dt * textureSampleLevel(tex_a, samp, uv, 0.0).xy * u.texel;
    let result = textureSampleLevel(tex_b, samp, coord, 0.0);
#endif
    let decay = 1.0 + u.dissipation * u.dt;
    return result / decay;
}
"#;

/// Central-difference divergence of velocity. Boundary cells reflect the
/// outward-facing component so walls stay non-penetrating.
pub const DIVERGENCE: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let left = uv - vec2<f32>(u.texel.x, 0.0);
    let right = uv + vec2<f32>(u.texel.x, 0.0);
    let top = uv + vec2<f32>(0.0, u.texel.y);
    let bottom = uv - vec2<f32>(0.0, u.texel.y);

    var l = textureSampleLevel(tex_a, samp, left, 0.0).x;
    var r = textureSampleLevel(tex_a, samp, right, 0.0).x;
    var t = textureSampleLevel(tex_a, samp, top, 0.0).y;
    var b = textureSampleLevel(tex_a, samp, bottom, 0.0).y;

    let center = textureSampleLevel(tex_a, samp, uv, 0.0).xy;
    if (left.x < 0.0) { l = -center.x; }
    if (right.x > 1.0) { r = -center.x; }
    if (top.y > 1.0) { t = -center.y; }
    if (bottom.y < 0.0) { b = -center.y; }

    let div = 0.5 * (r - l + t - b);
    return vec4<f32>(div, 0.0, 0.0, 1.0);
}
"#;

/// Discrete curl from central differences of the neighboring velocity
/// components.
pub const CURL: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let l = textureSampleLevel(tex_a, samp, uv - vec2<f32>(u.texel.x, 0.0), 0.0).y;
    let r = textureSampleLevel(tex_a, samp, uv + vec2<f32>(u.texel.x, 0.0), 0.0).y;
    let t = textureSampleLevel(tex_a, samp, uv + vec2<f32>(0.0, u.texel.y), 0.0).x;
    let b = textureSampleLevel(tex_a, samp, uv - vec2<f32>(0.0, u.texel.y), 0.0).x;
    let vorticity = r - l - t + b;
    return vec4<f32>(0.5 * vorticity, 0.0, 0.0, 1.0);
}
"#;

/// Vorticity confinement: push velocity along the rotated gradient of
/// |curl|, clamped so the correction can never blow the field up.
/// `tex_a` is velocity, `tex_b` curl.
pub const VORTICITY: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let l = textureSampleLevel(tex_b, samp, uv - vec2<f32>(u.texel.x, 0.0), 0.0).x;
    let r = textureSampleLevel(tex_b, samp, uv + vec2<f32>(u.texel.x, 0.0), 0.0).x;
    let t = textureSampleLevel(tex_b, samp, uv + vec2<f32>(0.0, u.texel.y), 0.0).x;
    let b = textureSampleLevel(tex_b, samp, uv - vec2<f32>(0.0, u.texel.y), 0.0).x;
    let c = textureSampleLevel(tex_b, samp, uv, 0.0).x;

    var force = 0.5 * vec2<f32>(abs(t) - abs(b), abs(r) - abs(l));
    force /= length(force) + 0.0001;
    force *= u.curl * c;
    force.y *= -1.0;

    var velocity = textureSampleLevel(tex_a, samp, uv, 0.0).xy;
    velocity += force * u.dt;
    velocity = clamp(velocity, vec2<f32>(-1000.0), vec2<f32>(1000.0));
    return vec4<f32>(velocity, 0.0, 1.0);
}
"#;

/// One Jacobi relaxation step. `tex_a` is pressure, `tex_b` divergence.
pub const PRESSURE: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let l = textureSampleLevel(tex_a, samp, uv - vec2<f32>(u.texel.x, 0.0), 0.0).x;
    let r = textureSampleLevel(tex_a, samp, uv + vec2<f32>(u.texel.x, 0.0), 0.0).x;
    let t = textureSampleLevel(tex_a, samp, uv + vec2<f32>(0.0, u.texel.y), 0.0).x;
    let b = textureSampleLevel(tex_a, samp, uv - vec2<f32>(0.0, u.texel.y), 0.0).x;
    let divergence = textureSampleLevel(tex_b, samp, uv, 0.0).x;
    let pressure = (l + r + b + t - divergence) * 0.25;
    return vec4<f32>(pressure, 0.0, 0.0, 1.0);
}
"#;

/// Projects velocity onto its divergence-free component by subtracting the
/// pressure gradient. `tex_a` is pressure, `tex_b` velocity.
pub const GRADIENT_SUBTRACT: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let l = textureSampleLevel(tex_a, samp, uv - vec2<f32>(u.texel.x, 0.0), 0.0).x;
    let r = textureSampleLevel(tex_a, samp, uv + vec2<f32>(u.texel.x, 0.0), 0.0).x;
    let t = textureSampleLevel(tex_a, samp, uv + vec2<f32>(0.0, u.texel.y), 0.0).x;
    let b = textureSampleLevel(tex_a, samp, uv - vec2<f32>(0.0, u.texel.y), 0.0).x;
    var velocity = textureSampleLevel(tex_b, samp, uv, 0.0).xy;
    velocity -= vec2<f32>(r - l, t - b);
    return vec4<f32>(velocity, 0.0, 1.0);
}
"#;

/// Composite: dye with optional normal-approximated shading; alpha is the
/// maximum channel so blending reads as additive over the backdrop.
pub const DISPLAY: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    var c = textureSampleLevel(tex_a, samp, uv, 0.0).rgb;
#ifdef SHADING
    let lc = textureSampleLevel(tex_a, samp, uv - vec2<f32>(u.texel.x, 0.0), 0.0).rgb;
    let rc = textureSampleLevel(tex_a, samp, uv + vec2<f32>(u.texel.x, 0.0), 0.0).rgb;
    let tc = textureSampleLevel(tex_a, samp, uv + vec2<f32>(0.0, u.texel.y), 0.0).rgb;
    let bc = textureSampleLevel(tex_a, samp, uv - vec2<f32>(0.0, u.texel.y), 0.0).rgb;

    let dx = length(rc) - length(lc);
    let dy = length(tc) - length(bc);

    let n = normalize(vec3<f32>(dx, dy, length(u.texel)));
    let light = vec3<f32>(0.0, 0.0, 1.0);
    let diffuse = clamp(dot(n, light) + 0.7, 0.7, 1.0);
    c *= diffuse;
#endif
    let a = max(c.r, max(c.g, c.b));
    return vec4<f32>(c, a);
}
"#;
