//! The simulation handle and frame driver.
//!
//! [`FluidEffect`] owns everything: context, targets, programs, pointers,
//! and the clock. Every pipeline function receives it explicitly; there is
//! no module-level mutable state. One `update()` call is one frame tick.

use std::time::Instant;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::capture::{self, FrameCapture};
use crate::color::{Rgb, splat_color, wrap};
use crate::config::{MAX_FRAME_TIME, SimulationConfig, grid_resolution};
use crate::context::GpuContext;
use crate::error::FluidError;
use crate::passes::{Material, PassUniforms, Passes};
use crate::pointer::{
    InputQueue, Pointer, PointerEvent, SYNTHETIC_POINTER_ID, correct_radius,
};
use crate::shaders;
use crate::targets::{DoubleBuffer, RenderTarget};

const CLEAR: wgpu::LoadOp<wgpu::Color> = wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT);

/// Clamps a raw wall-clock delta to the stable step range.
pub fn clamp_delta(seconds: f32) -> f32 {
    seconds.clamp(0.0, MAX_FRAME_TIME)
}

/// Wall-clock frame timing plus the color-cycle accumulator.
pub struct FrameClock {
    last: Instant,
    pub color_timer: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            color_timer: 0.0,
        }
    }

    /// Seconds since the previous tick, clamped.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last).as_secs_f32();
        self.last = now;
        clamp_delta(dt)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// The grids the solver runs over: a coarse simulation set and a finer dye
/// buffer.
struct FieldTargets {
    dye: DoubleBuffer,
    velocity: DoubleBuffer,
    pressure: DoubleBuffer,
    divergence: RenderTarget,
    curl: RenderTarget,
}

impl FieldTargets {
    fn create(ctx: &GpuContext, config: &SimulationConfig, width: u32, height: u32) -> Self {
        let (sim_w, sim_h) = grid_resolution(config.sim_resolution, width, height);
        let (dye_w, dye_h) = grid_resolution(config.dye_resolution, width, height);
        let device = &ctx.device;
        let formats = ctx.formats;
        Self {
            dye: DoubleBuffer::new(device, "Dye", dye_w, dye_h, formats.rgba),
            velocity: DoubleBuffer::new(device, "Velocity", sim_w, sim_h, formats.rg),
            pressure: DoubleBuffer::new(device, "Pressure", sim_w, sim_h, formats.r),
            divergence: RenderTarget::new(device, "Divergence", sim_w, sim_h, formats.r),
            curl: RenderTarget::new(device, "Curl", sim_w, sim_h, formats.r),
        }
    }

    /// Resizes the grids for a new surface size. Matching dimensions are a
    /// no-op. Dye content is copied across; the transient simulation fields
    /// restart from zero.
    fn resize(
        &mut self,
        ctx: &GpuContext,
        passes: &Passes,
        config: &SimulationConfig,
        width: u32,
        height: u32,
    ) {
        let (sim_w, sim_h) = grid_resolution(config.sim_resolution, width, height);
        let (dye_w, dye_h) = grid_resolution(config.dye_resolution, width, height);
        let device = &ctx.device;
        let formats = ctx.formats;

        if (dye_w, dye_h) != (self.dye.width(), self.dye.height()) {
            let read = RenderTarget::new(device, "Dye A", dye_w, dye_h, formats.rgba);
            passes.blit(
                ctx,
                &passes.copy,
                &read.view,
                &[&self.dye.read().view],
                PassUniforms::default(),
                CLEAR,
            );
            let write = RenderTarget::new(device, "Dye B", dye_w, dye_h, formats.rgba);
            self.dye.replace([read, write]);
        }

        if (sim_w, sim_h) != (self.velocity.width(), self.velocity.height()) {
            self.velocity = DoubleBuffer::new(device, "Velocity", sim_w, sim_h, formats.rg);
            self.pressure = DoubleBuffer::new(device, "Pressure", sim_w, sim_h, formats.r);
            self.divergence = RenderTarget::new(device, "Divergence", sim_w, sim_h, formats.r);
            self.curl = RenderTarget::new(device, "Curl", sim_w, sim_h, formats.r);
        }
    }
}

struct SurfaceState {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

/// The opaque simulation handle the host drives.
pub struct FluidEffect {
    ctx: GpuContext,
    surface: Option<SurfaceState>,
    /// Composite destination when there is no surface (tests, capture-only
    /// hosts).
    offscreen: Option<RenderTarget>,
    display_format: wgpu::TextureFormat,
    passes: Passes,
    display: Material,
    fields: FieldTargets,
    capture: Option<FrameCapture>,
    pointers: Vec<Pointer>,
    input: InputQueue,
    clock: FrameClock,
    rng: StdRng,
    surface_size: (u32, u32),
    pending_size: Option<(u32, u32)>,
    config: SimulationConfig,
}

impl FluidEffect {
    /// Initializes the effect on a host surface. `width`/`height` are the
    /// surface's current backing pixel dimensions.
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        config: SimulationConfig,
    ) -> Result<Self, FluidError> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(target)
            .map_err(|e| FluidError::ContextCreation(e.to_string()))?;
        let ctx = GpuContext::new(&instance, Some(&surface)).await?;

        let caps = surface.get_capabilities(&ctx.adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(caps.formats[0]);
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&ctx.device, &surface_config);

        Self::build(
            ctx,
            Some(SurfaceState {
                surface,
                config: surface_config,
            }),
            format,
            width,
            height,
            config,
        )
    }

    /// Initializes without a surface; the composite lands in an offscreen
    /// target instead of a swapchain.
    pub async fn headless(
        width: u32,
        height: u32,
        config: SimulationConfig,
    ) -> Result<Self, FluidError> {
        let instance = wgpu::Instance::default();
        let ctx = GpuContext::new(&instance, None).await?;
        Self::build(ctx, None, wgpu::TextureFormat::Rgba8Unorm, width, height, config)
    }

    fn build(
        ctx: GpuContext,
        surface: Option<SurfaceState>,
        display_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        config: SimulationConfig,
    ) -> Result<Self, FluidError> {
        let passes = Passes::new(&ctx);
        let display = Material::new(
            "display",
            shaders::one_texture(shaders::DISPLAY),
            display_format,
            Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
        );
        let fields = FieldTargets::create(&ctx, &config, width, height);
        let offscreen = surface.is_none().then(|| {
            RenderTarget::new(&ctx.device, "Display Target", width, height, display_format)
        });

        Ok(Self {
            ctx,
            surface,
            offscreen,
            display_format,
            passes,
            display,
            fields,
            capture: None,
            pointers: vec![Pointer::default()],
            input: InputQueue::default(),
            clock: FrameClock::new(),
            rng: StdRng::from_entropy(),
            surface_size: (width.max(1), height.max(1)),
            pending_size: None,
            config,
        })
    }

    // ---- host-facing operations -------------------------------------------

    /// Queues a pointer-down at device-pixel coordinates.
    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.input.push(PointerEvent::Down { x, y });
    }

    /// Queues a pointer-move at device-pixel coordinates.
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.input.push(PointerEvent::Move { x, y });
    }

    pub fn pointer_up(&mut self) {
        self.input.push(PointerEvent::Up);
    }

    /// Notifies the effect of new surface backing dimensions; reconciled at
    /// the start of the next tick, so a resize observed mid-frame is benign.
    pub fn resize_surface(&mut self, width: u32, height: u32) {
        self.pending_size = Some((width, height));
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.config.paused = paused;
    }

    /// One frame tick: dt, resize reconciliation, color cycle, input,
    /// solver, composite. Frame-level failures degrade and log; they never
    /// propagate to the host.
    pub fn update(&mut self) {
        let dt = self.clock.tick();
        self.reconcile_size();
        self.update_colors(dt);
        self.apply_inputs();
        if !self.config.paused {
            self.advance(dt);
        }
        self.render();
    }

    /// Stops the effect and releases its GPU resources. Dropping the handle
    /// does the same; this is the explicit end of the effect's lifetime.
    pub fn teardown(self) {
        log::debug!("splash effect torn down");
    }

    // ---- accessors --------------------------------------------------------

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    /// Velocity/pressure grid dimensions.
    pub fn sim_size(&self) -> (u32, u32) {
        (self.fields.velocity.width(), self.fields.velocity.height())
    }

    /// Dye grid dimensions.
    pub fn dye_size(&self) -> (u32, u32) {
        (self.fields.dye.width(), self.fields.dye.height())
    }

    // ---- frame internals --------------------------------------------------

    fn reconcile_size(&mut self) {
        let Some((width, height)) = self.pending_size.take() else {
            return;
        };
        if (width, height) == self.surface_size || width == 0 || height == 0 {
            return;
        }
        self.surface_size = (width, height);

        if let Some(state) = &mut self.surface {
            state.config.width = width;
            state.config.height = height;
            state.surface.configure(&self.ctx.device, &state.config);
        }
        if self.offscreen.is_some() {
            self.offscreen = Some(RenderTarget::new(
                &self.ctx.device,
                "Display Target",
                width,
                height,
                self.display_format,
            ));
        }
        self.fields
            .resize(&self.ctx, &self.passes, &self.config, width, height);
        // Capture target aspect is stale now; rebuilt on next use.
        self.capture = None;
    }

    fn update_colors(&mut self, dt: f32) {
        if self.config.color_update_speed <= 0.0 {
            return;
        }
        self.clock.color_timer += dt * self.config.color_update_speed;
        if self.clock.color_timer >= 1.0 {
            self.clock.color_timer = wrap(self.clock.color_timer, 0.0, 1.0);
            for pointer in &mut self.pointers {
                pointer.color = splat_color(&mut self.rng);
            }
        }
    }

    /// Drains the event queue, then splats for every pointer that is down
    /// and has moved since the last frame.
    fn apply_inputs(&mut self) {
        let (w, h) = self.surface_size;
        let surface = Vec2::new(w as f32, h as f32);

        let events: Vec<PointerEvent> = self.input.drain().collect();
        for event in events {
            match event {
                PointerEvent::Down { x, y } => {
                    let color = splat_color(&mut self.rng);
                    self.pointers[0].press(SYNTHETIC_POINTER_ID, Vec2::new(x, y), surface, color);
                    self.click_splat(0);
                }
                PointerEvent::Move { x, y } => {
                    self.pointers[0].advance(Vec2::new(x, y), surface);
                }
                PointerEvent::Up => self.pointers[0].release(),
            }
        }

        for index in 0..self.pointers.len() {
            let (texcoord, delta, color) = {
                let pointer = &mut self.pointers[index];
                if !(pointer.down && pointer.moved) {
                    continue;
                }
                pointer.moved = false;
                (pointer.texcoord, pointer.delta, pointer.color)
            };
            let force = self.config.splat_force;
            self.splat_at(texcoord.x, texcoord.y, delta.x * force, delta.y * force, color);
        }
    }

    /// The burst fired the instant a pointer goes down: brightened color and
    /// a small random kick.
    fn click_splat(&mut self, index: usize) {
        let (x, y, color) = {
            let pointer = &self.pointers[index];
            (pointer.texcoord.x, pointer.texcoord.y, pointer.color.scaled(10.0))
        };
        let dx = 10.0 * (self.rng.gen_range(0.0f32..1.0) - 0.5);
        let dy = 30.0 * (self.rng.gen_range(0.0f32..1.0) - 0.5);
        self.splat_at(x, y, dx, dy, color);
    }

    /// Injects a radially-weighted force into velocity and color into dye,
    /// centered at normalized `(x, y)`.
    pub fn splat_at(&mut self, x: f32, y: f32, dx: f32, dy: f32, color: Rgb) {
        let (w, h) = self.surface_size;
        let aspect = w as f32 / h as f32;
        let radius = correct_radius(self.config.splat_radius / 100.0, aspect);

        self.passes.blit(
            &self.ctx,
            &self.passes.splat_velocity,
            &self.fields.velocity.write().view,
            &[&self.fields.velocity.read().view],
            PassUniforms {
                point: [x, y],
                aspect,
                radius,
                color: [dx, dy, 0.0, 1.0],
                ..Default::default()
            },
            CLEAR,
        );
        self.fields.velocity.swap();

        self.passes.blit(
            &self.ctx,
            &self.passes.splat_dye,
            &self.fields.dye.write().view,
            &[&self.fields.dye.read().view],
            PassUniforms {
                point: [x, y],
                aspect,
                radius,
                color: [color.r, color.g, color.b, 1.0],
                ..Default::default()
            },
            CLEAR,
        );
        self.fields.dye.swap();
    }

    /// Scatters `count` random splats; the start-up burst.
    pub fn multiple_splats(&mut self, count: u32) {
        for _ in 0..count {
            let color = splat_color(&mut self.rng).scaled(10.0);
            let x = self.rng.gen_range(0.0f32..1.0);
            let y = self.rng.gen_range(0.0f32..1.0);
            let dx = 1000.0 * (self.rng.gen_range(0.0f32..1.0) - 0.5);
            let dy = 1000.0 * (self.rng.gen_range(0.0f32..1.0) - 0.5);
            self.splat_at(x, y, dx, dy, color);
        }
    }

    /// One solver step over the grids, in the fixed pass order. Each pass
    /// samples the read targets of the previous pass and publishes through
    /// a swap.
    pub fn advance(&mut self, dt: f32) {
        let texel = self.fields.velocity.texel_size();

        // 1. Curl of the velocity field.
        self.passes.blit(
            &self.ctx,
            &self.passes.curl,
            &self.fields.curl.view,
            &[&self.fields.velocity.read().view],
            PassUniforms {
                texel,
                ..Default::default()
            },
            CLEAR,
        );

        // 2. Vorticity confinement.
        self.passes.blit(
            &self.ctx,
            &self.passes.vorticity,
            &self.fields.velocity.write().view,
            &[&self.fields.velocity.read().view, &self.fields.curl.view],
            PassUniforms {
                texel,
                curl: self.config.curl,
                dt,
                ..Default::default()
            },
            CLEAR,
        );
        self.fields.velocity.swap();

        // 3a. Advect velocity along itself.
        self.passes.blit(
            &self.ctx,
            &self.passes.advect_velocity,
            &self.fields.velocity.write().view,
            &[
                &self.fields.velocity.read().view,
                &self.fields.velocity.read().view,
            ],
            PassUniforms {
                texel,
                dye_texel: texel,
                dt,
                dissipation: self.config.velocity_dissipation,
                ..Default::default()
            },
            CLEAR,
        );
        self.fields.velocity.swap();

        // 3b. Advect dye through the velocity field.
        self.passes.blit(
            &self.ctx,
            &self.passes.advect_dye,
            &self.fields.dye.write().view,
            &[
                &self.fields.velocity.read().view,
                &self.fields.dye.read().view,
            ],
            PassUniforms {
                texel,
                dye_texel: self.fields.dye.texel_size(),
                dt,
                dissipation: self.config.density_dissipation,
                ..Default::default()
            },
            CLEAR,
        );
        self.fields.dye.swap();

        // 4. Divergence of the advected velocity.
        self.passes.blit(
            &self.ctx,
            &self.passes.divergence,
            &self.fields.divergence.view,
            &[&self.fields.velocity.read().view],
            PassUniforms {
                texel,
                ..Default::default()
            },
            CLEAR,
        );

        // 5. Pressure: attenuate last frame's solution, then Jacobi-relax.
        self.passes.blit(
            &self.ctx,
            &self.passes.clear,
            &self.fields.pressure.write().view,
            &[&self.fields.pressure.read().view],
            PassUniforms {
                value: self.config.pressure,
                ..Default::default()
            },
            CLEAR,
        );
        self.fields.pressure.swap();

        for _ in 0..self.config.pressure_iterations {
            self.passes.blit(
                &self.ctx,
                &self.passes.pressure,
                &self.fields.pressure.write().view,
                &[
                    &self.fields.pressure.read().view,
                    &self.fields.divergence.view,
                ],
                PassUniforms {
                    texel,
                    ..Default::default()
                },
                CLEAR,
            );
            self.fields.pressure.swap();
        }

        // 6. Subtract the pressure gradient; velocity leaves divergence-free.
        self.passes.blit(
            &self.ctx,
            &self.passes.gradient_subtract,
            &self.fields.velocity.write().view,
            &[
                &self.fields.pressure.read().view,
                &self.fields.velocity.read().view,
            ],
            PassUniforms {
                texel,
                ..Default::default()
            },
            CLEAR,
        );
        self.fields.velocity.swap();
    }

    fn background_load(&self) -> wgpu::LoadOp<wgpu::Color> {
        if self.config.transparent {
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)
        } else {
            let back = self.config.back_color;
            wgpu::LoadOp::Clear(wgpu::Color {
                r: back.r as f64,
                g: back.g as f64,
                b: back.b as f64,
                a: 1.0,
            })
        }
    }

    /// Composites the dye field to the surface (or the offscreen display
    /// target). Surface loss reconfigures and skips the frame.
    fn render(&mut self) {
        let keywords: &[&str] = if self.config.shading { &["SHADING"] } else { &[] };
        self.display.set_keywords(&self.ctx, &self.passes, keywords);

        let uniforms = PassUniforms {
            texel: self.fields.dye.texel_size(),
            ..Default::default()
        };
        let load = self.background_load();
        let Some(program) = self.display.active_program() else {
            return;
        };
        let dye_view = &self.fields.dye.read().view;

        match &self.surface {
            Some(state) => match state.surface.get_current_texture() {
                Ok(frame) => {
                    let view = frame
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default());
                    self.passes
                        .blit_program(&self.ctx, program, &view, &[dye_view], uniforms, load);
                    frame.present();
                }
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    state.surface.configure(&self.ctx.device, &state.config);
                }
                Err(error) => log::warn!("skipping frame: {error}"),
            },
            None => {
                if let Some(target) = &self.offscreen {
                    self.passes.blit_program(
                        &self.ctx,
                        program,
                        &target.view,
                        &[dye_view],
                        uniforms,
                        load,
                    );
                }
            }
        }
    }

    // ---- readback & capture -----------------------------------------------

    /// Reads a field back as tightly packed f32 RGBA texels, blitting
    /// through an f32 target so the negotiated field format never matters
    /// to the caller.
    async fn read_field(&self, source: &RenderTarget) -> Result<Vec<f32>, FluidError> {
        let staging = RenderTarget::new(
            &self.ctx.device,
            "Readback Blit",
            source.width,
            source.height,
            wgpu::TextureFormat::Rgba32Float,
        );
        self.passes.blit(
            &self.ctx,
            &self.passes.copy_f32,
            &staging.view,
            &[&source.view],
            PassUniforms::default(),
            CLEAR,
        );
        let bytes = capture::read_texture(&self.ctx, &staging, 16).await?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    /// Current velocity field, row-major `[u, v]` per cell.
    pub async fn read_velocity(&self) -> Result<Vec<[f32; 2]>, FluidError> {
        let data = self.read_field(self.fields.velocity.read()).await?;
        Ok(data.chunks_exact(4).map(|c| [c[0], c[1]]).collect())
    }

    /// Current dye field, row-major RGBA per cell.
    pub async fn read_dye(&self) -> Result<Vec<f32>, FluidError> {
        self.read_field(self.fields.dye.read()).await
    }

    /// Renders and reads back one composite frame at the configured capture
    /// resolution.
    pub async fn capture_frame(&mut self) -> Result<image::RgbaImage, FluidError> {
        let (w, h) = self.surface_size;
        let load = self.background_load();
        let capture = self
            .capture
            .get_or_insert_with(|| FrameCapture::new(&self.ctx, &self.config, w, h));
        capture
            .shoot(
                &self.ctx,
                &self.passes,
                &self.fields.dye.read().view,
                self.fields.dye.texel_size(),
                &self.config,
                load,
            )
            .await
    }

    /// Dimensions of the capture target, deriving it if needed.
    pub fn capture_size(&mut self) -> (u32, u32) {
        let (w, h) = self.surface_size;
        self.capture
            .get_or_insert_with(|| FrameCapture::new(&self.ctx, &self.config, w, h))
            .size()
    }
}
