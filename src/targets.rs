//! Offscreen render targets and double buffering.

/// A single offscreen target: texture, sampling view, and dimensions.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

impl RenderTarget {
    /// Allocates a zero-initialized target.
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
            format,
        }
    }

    /// `(1/width, 1/height)`, the per-texel step the shaders use for
    /// neighbor lookups.
    pub fn texel_size(&self) -> [f32; 2] {
        [1.0 / self.width as f32, 1.0 / self.height as f32]
    }
}

/// Two-slot read/write cursor. `swap` exchanges the roles in O(1) and is
/// its own inverse; read and write never alias.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PingPong {
    flipped: bool,
}

impl PingPong {
    pub fn read(self) -> usize {
        self.flipped as usize
    }

    pub fn write(self) -> usize {
        1 - self.read()
    }

    pub fn swap(&mut self) {
        self.flipped = !self.flipped;
    }
}

/// A pair of identically-sized targets with ping-pong roles: passes sample
/// from `read` and draw into `write`, then `swap` publishes the result.
pub struct DoubleBuffer {
    targets: [RenderTarget; 2],
    cursor: PingPong,
}

impl DoubleBuffer {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            targets: [
                RenderTarget::new(device, &format!("{label} A"), width, height, format),
                RenderTarget::new(device, &format!("{label} B"), width, height, format),
            ],
            cursor: PingPong::default(),
        }
    }

    pub fn read(&self) -> &RenderTarget {
        &self.targets[self.cursor.read()]
    }

    pub fn write(&self) -> &RenderTarget {
        &self.targets[self.cursor.write()]
    }

    pub fn swap(&mut self) {
        self.cursor.swap();
    }

    /// Replaces both targets (resize). The cursor resets so `read` is the
    /// first of the new pair.
    pub fn replace(&mut self, targets: [RenderTarget; 2]) {
        self.targets = targets;
        self.cursor = PingPong::default();
    }

    pub fn width(&self) -> u32 {
        self.targets[0].width
    }

    pub fn height(&self) -> u32 {
        self.targets[0].height
    }

    pub fn texel_size(&self) -> [f32; 2] {
        self.targets[0].texel_size()
    }
}
