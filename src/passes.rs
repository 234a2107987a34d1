//! Compiled pass programs and the machinery to run them.
//!
//! Every pass is a fullscreen-triangle render pipeline drawing into an
//! offscreen target: uniforms are written, a bind group is assembled from
//! the pass's input views, and the encoder is submitted immediately, so
//! each pass observes the previous pass's output through the double-buffer
//! swap and nothing else.

use std::collections::{BTreeSet, HashMap};

use bytemuck::{Pod, Zeroable};

use crate::context::GpuContext;
use crate::shader;
use crate::shaders;

/// The single uniform block shared by all passes. Each pass fills in the
/// fields it reads and leaves the rest zero.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub(crate) struct PassUniforms {
    pub texel: [f32; 2],
    pub dye_texel: [f32; 2],
    pub point: [f32; 2],
    pub dt: f32,
    pub dissipation: f32,
    pub color: [f32; 4],
    pub radius: f32,
    pub aspect: f32,
    pub curl: f32,
    pub value: f32,
}

/// How many sampled textures a pass binds; selects the bind group layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arity {
    One,
    Two,
}

/// A linked pipeline plus its private uniform buffer.
pub(crate) struct Program {
    pipeline: wgpu::RenderPipeline,
    uniforms: wgpu::Buffer,
    arity: Arity,
    label: &'static str,
}

impl Program {
    /// Builds a pipeline inside a validation error scope so a link failure
    /// degrades to a skipped pass instead of a crash.
    fn new(
        device: &wgpu::Device,
        label: &'static str,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
        layout: &wgpu::BindGroupLayout,
        arity: Arity,
        format: wgpu::TextureFormat,
        blend: Option<wgpu::BlendState>,
    ) -> Option<Self> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: vertex,
                entry_point: "vs_main",
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: fragment,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            log::error!("program '{label}' failed to link: {error}");
            return None;
        }

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<PassUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Some(Self {
            pipeline,
            uniforms,
            arity,
            label,
        })
    }
}

/// A pass slot. `program` is `None` when compilation failed; running such a
/// pass is a logged no-op for the frame.
pub(crate) struct Pass {
    program: Option<Program>,
}

/// All fixed-function pass programs plus the shared vertex stage, layouts,
/// and sampler.
pub(crate) struct Passes {
    vertex: wgpu::ShaderModule,
    layout_one: wgpu::BindGroupLayout,
    layout_two: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    pub copy: Pass,
    /// Copy into an f32 target; the readback path goes through this so
    /// mapped bytes are plain f32 regardless of the negotiated field format.
    pub copy_f32: Pass,
    pub clear: Pass,
    pub splat_velocity: Pass,
    pub splat_dye: Pass,
    pub advect_velocity: Pass,
    pub advect_dye: Pass,
    pub divergence: Pass,
    pub curl: Pass,
    pub vorticity: Pass,
    pub pressure: Pass,
    pub gradient_subtract: Pass,
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn uniform_entry() -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

impl Passes {
    pub fn new(ctx: &GpuContext) -> Self {
        let device = &ctx.device;
        let formats = ctx.formats;

        let layout_one = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Pass Layout (1 texture)"),
            entries: &[uniform_entry(), texture_entry(1), sampler_entry(2)],
        });
        let layout_two = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Pass Layout (2 textures)"),
            entries: &[
                uniform_entry(),
                texture_entry(1),
                texture_entry(2),
                sampler_entry(3),
            ],
        });

        // When linear filtering is unavailable the sampler degrades to
        // nearest and advection compiles its manual-bilerp variant.
        let filter = if ctx.linear_filtering {
            wgpu::FilterMode::Linear
        } else {
            wgpu::FilterMode::Nearest
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Pass Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        });

        let vertex = shader::compile_module(device, "vertex", shaders::VERTEX)
            .expect("built-in vertex shader is valid");

        let advection_keywords = if ctx.linear_filtering {
            shader::keyword_set(&[])
        } else {
            shader::keyword_set(&["MANUAL_FILTERING"])
        };

        let make = |label: &'static str,
                    source: String,
                    keywords: &BTreeSet<String>,
                    arity: Arity,
                    format: wgpu::TextureFormat|
         -> Pass {
            let layout = match arity {
                Arity::One => &layout_one,
                Arity::Two => &layout_two,
            };
            let program = shader::compile_module(device, label, &shader::apply_keywords(&source, keywords))
                .ok()
                .and_then(|fragment| {
                    Program::new(device, label, &vertex, &fragment, layout, arity, format, None)
                });
            if program.is_none() {
                log::error!("pass '{label}' disabled for this session");
            }
            Pass { program }
        };

        let none = shader::keyword_set(&[]);
        let copy = make("copy", shaders::one_texture(shaders::COPY), &none, Arity::One, formats.rgba);
        let copy_f32 = make(
            "copy_f32",
            shaders::one_texture(shaders::COPY),
            &none,
            Arity::One,
            wgpu::TextureFormat::Rgba32Float,
        );
        let clear = make("clear", shaders::one_texture(shaders::CLEAR), &none, Arity::One, formats.r);
        let splat_velocity = make(
            "splat_velocity",
            shaders::one_texture(shaders::SPLAT),
            &none,
            Arity::One,
            formats.rg,
        );
        let splat_dye = make(
            "splat_dye",
            shaders::one_texture(shaders::SPLAT),
            &none,
            Arity::One,
            formats.rgba,
        );
        let advect_velocity = make(
            "advect_velocity",
            shaders::two_texture(shaders::ADVECTION),
            &advection_keywords,
            Arity::Two,
            formats.rg,
        );
        let advect_dye = make(
            "advect_dye",
            shaders::two_texture(shaders::ADVECTION),
            &advection_keywords,
            Arity::Two,
            formats.rgba,
        );
        let divergence = make(
            "divergence",
            shaders::one_texture(shaders::DIVERGENCE),
            &none,
            Arity::One,
            formats.r,
        );
        let curl = make("curl", shaders::one_texture(shaders::CURL), &none, Arity::One, formats.r);
        let vorticity = make(
            "vorticity",
            shaders::two_texture(shaders::VORTICITY),
            &none,
            Arity::Two,
            formats.rg,
        );
        let pressure = make(
            "pressure",
            shaders::two_texture(shaders::PRESSURE),
            &none,
            Arity::Two,
            formats.r,
        );
        let gradient_subtract = make(
            "gradient_subtract",
            shaders::two_texture(shaders::GRADIENT_SUBTRACT),
            &none,
            Arity::Two,
            formats.rg,
        );

        Self {
            copy,
            copy_f32,
            clear,
            splat_velocity,
            splat_dye,
            advect_velocity,
            advect_dye,
            divergence,
            curl,
            vorticity,
            pressure,
            gradient_subtract,
            vertex,
            layout_one,
            layout_two,
            sampler,
        }
    }

    /// Runs one pass: write uniforms, bind inputs, draw the fullscreen
    /// triangle into `target`, submit. Skips silently if the pass has no
    /// program.
    pub fn blit(
        &self,
        ctx: &GpuContext,
        pass: &Pass,
        target: &wgpu::TextureView,
        textures: &[&wgpu::TextureView],
        uniforms: PassUniforms,
        load: wgpu::LoadOp<wgpu::Color>,
    ) {
        let Some(program) = &pass.program else {
            return;
        };
        self.blit_program(ctx, program, target, textures, uniforms, load);
    }

    pub fn blit_program(
        &self,
        ctx: &GpuContext,
        program: &Program,
        target: &wgpu::TextureView,
        textures: &[&wgpu::TextureView],
        uniforms: PassUniforms,
        load: wgpu::LoadOp<wgpu::Color>,
    ) {
        debug_assert_eq!(
            textures.len(),
            match program.arity {
                Arity::One => 1,
                Arity::Two => 2,
            },
            "pass '{}' bound with the wrong texture count",
            program.label
        );

        ctx.queue
            .write_buffer(&program.uniforms, 0, bytemuck::bytes_of(&uniforms));

        let layout = match program.arity {
            Arity::One => &self.layout_one,
            Arity::Two => &self.layout_two,
        };
        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: program.uniforms.as_entire_binding(),
        }];
        for (i, texture) in textures.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: 1 + i as u32,
                resource: wgpu::BindingResource::TextureView(texture),
            });
        }
        entries.push(wgpu::BindGroupEntry {
            binding: 1 + textures.len() as u32,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(program.label),
            layout,
            entries: &entries,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(program.label),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(program.label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(&program.pipeline);
            render_pass.set_bind_group(0, &bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));
    }
}

/// A fragment template with keyword-selected variants, cached by the
/// canonical keyword set. Compilation failures cache as `None` so a broken
/// variant is skipped every frame instead of recompiled every frame.
pub(crate) struct Material {
    label: &'static str,
    template: String,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    variants: HashMap<BTreeSet<String>, Option<Program>>,
    active: BTreeSet<String>,
}

impl Material {
    pub fn new(
        label: &'static str,
        template: String,
        format: wgpu::TextureFormat,
        blend: Option<wgpu::BlendState>,
    ) -> Self {
        Self {
            label,
            template,
            format,
            blend,
            variants: HashMap::new(),
            active: BTreeSet::new(),
        }
    }

    /// Selects (compiling on first use) the variant for `keywords`.
    pub fn set_keywords(&mut self, ctx: &GpuContext, passes: &Passes, keywords: &[&str]) {
        let key = shader::keyword_set(keywords);
        if !self.variants.contains_key(&key) {
            let source = shader::apply_keywords(&self.template, &key);
            let program = shader::compile_module(&ctx.device, self.label, &source)
                .ok()
                .and_then(|fragment| {
                    Program::new(
                        &ctx.device,
                        self.label,
                        &passes.vertex,
                        &fragment,
                        &passes.layout_one,
                        Arity::One,
                        self.format,
                        self.blend,
                    )
                });
            self.variants.insert(key.clone(), program);
        }
        self.active = key;
    }

    /// The active compiled variant, or `None` if it failed to compile (the
    /// caller skips the pass for the frame).
    pub fn active_program(&self) -> Option<&Program> {
        self.variants.get(&self.active)?.as_ref()
    }
}
