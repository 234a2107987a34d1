//! Offscreen frame capture and raw texture readback.

use crate::config::{SimulationConfig, grid_resolution};
use crate::context::GpuContext;
use crate::error::FluidError;
use crate::passes::{Material, PassUniforms, Passes};
use crate::shaders;
use crate::targets::RenderTarget;

/// Copies a texture into a mapped buffer and strips the 256-byte row
/// padding the copy requires. Returns tightly packed rows.
pub(crate) async fn read_texture(
    ctx: &GpuContext,
    target: &RenderTarget,
    bytes_per_texel: u32,
) -> Result<Vec<u8>, FluidError> {
    let unpadded = target.width * bytes_per_texel;
    let padded =
        unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

    let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback"),
        size: padded as u64 * target.height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture: &target.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(target.height),
            },
        },
        wgpu::Extent3d {
            width: target.width,
            height: target.height,
            depth_or_array_layers: 1,
        },
    );
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (sender, receiver) = tokio::sync::oneshot::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    ctx.device.poll(wgpu::Maintain::Wait);
    receiver
        .await
        .map_err(|_| FluidError::Capture("readback channel closed".into()))?
        .map_err(|e| FluidError::Capture(e.to_string()))?;

    let data = slice.get_mapped_range();
    let mut out = Vec::with_capacity(unpadded as usize * target.height as usize);
    for row in data.chunks(padded as usize) {
        out.extend_from_slice(&row[..unpadded as usize]);
    }
    drop(data);
    buffer.unmap();
    Ok(out)
}

/// Renders the composite into an offscreen 8-bit target and reads it back
/// as an image. The target is sized from `CAPTURE_RESOLUTION` and the
/// surface aspect, so captures stay proportional to what's on screen.
pub(crate) struct FrameCapture {
    target: RenderTarget,
    material: Material,
}

impl FrameCapture {
    pub fn new(
        ctx: &GpuContext,
        config: &SimulationConfig,
        surface_width: u32,
        surface_height: u32,
    ) -> Self {
        let (width, height) =
            grid_resolution(config.capture_resolution, surface_width, surface_height);
        let target = RenderTarget::new(
            &ctx.device,
            "Capture Target",
            width,
            height,
            wgpu::TextureFormat::Rgba8Unorm,
        );
        let material = Material::new(
            "capture_display",
            shaders::one_texture(shaders::DISPLAY),
            wgpu::TextureFormat::Rgba8Unorm,
            Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
        );
        Self { target, material }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.target.width, self.target.height)
    }

    pub async fn shoot(
        &mut self,
        ctx: &GpuContext,
        passes: &Passes,
        dye_view: &wgpu::TextureView,
        dye_texel: [f32; 2],
        config: &SimulationConfig,
        load: wgpu::LoadOp<wgpu::Color>,
    ) -> Result<image::RgbaImage, FluidError> {
        let keywords: &[&str] = if config.shading { &["SHADING"] } else { &[] };
        self.material.set_keywords(ctx, passes, keywords);
        let Some(program) = self.material.active_program() else {
            return Err(FluidError::Capture("display shader unavailable".into()));
        };

        let uniforms = PassUniforms {
            texel: dye_texel,
            ..Default::default()
        };
        passes.blit_program(ctx, program, &self.target.view, &[dye_view], uniforms, load);

        let bytes = read_texture(ctx, &self.target, 4).await?;
        image::RgbaImage::from_raw(self.target.width, self.target.height, bytes)
            .ok_or_else(|| FluidError::Capture("capture buffer size mismatch".into()))
    }
}
