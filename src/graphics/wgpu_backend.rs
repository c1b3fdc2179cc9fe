//! wgpu implementation of [`Graphics`].
//!
//! Draw calls are turned into clip-space vertices immediately and grouped into
//! passes. Nothing touches the GPU until [`Graphics::end_frame`], which uploads
//! the frame's vertices once and replays the passes in order into a single
//! command buffer.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use glam::{UVec2, Vec2};
use log::{debug, warn};
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::sprite_pass::SpritePass;
use super::{Graphics, ImageSource, TargetDescriptor, TargetId, TextureId, Viewport, letterbox};
use crate::draw2d::{Color, Rect, Sprite, Vertex2d, sprite_vertices};
use crate::error::GraphicsError;
use crate::gpu::GpuContext;

struct GpuImage {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
    size: UVec2,
}

struct GpuTarget {
    desc: TargetDescriptor,
    image: GpuImage,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BatchSource {
    Image(ImageSource),
    White,
}

struct Batch {
    source: BatchSource,
    vertices: Range<u32>,
}

struct RecordedPass {
    target: Option<TargetId>,
    clear: Option<Color>,
    size: Vec2,
    batches: Vec<Batch>,
}

/// Renders to a window through wgpu.
pub struct GpuGraphics {
    gpu: GpuContext,
    sprites: SpritePass,
    resolution: UVec2,
    view_padding: f32,
    next_id: u32,
    targets: HashMap<TargetId, GpuTarget>,
    textures: HashMap<TextureId, GpuImage>,
    white: GpuImage,
    vertices: Vec<Vertex2d>,
    passes: Vec<RecordedPass>,
}

impl GpuGraphics {
    /// Create the device for `window` and the sprite pipeline.
    ///
    /// `resolution` is the fixed game resolution; the screen is letterboxed to
    /// it with `view_padding` pixels of border.
    pub fn new(
        window: Arc<Window>,
        resolution: UVec2,
        vsync: bool,
        view_padding: f32,
    ) -> Result<Self, GraphicsError> {
        let gpu = GpuContext::new(window, vsync)?;
        let sprites = SpritePass::new(&gpu);
        let white = upload_texture(&gpu, &sprites, &[255; 4], 1, 1, "White Texture");

        Ok(Self {
            gpu,
            sprites,
            resolution,
            view_padding,
            next_id: 1,
            targets: HashMap::new(),
            textures: HashMap::new(),
            white,
            vertices: Vec::with_capacity(super::sprite_pass::INITIAL_VERTICES),
            passes: Vec::new(),
        })
    }

    /// Resize the window surface. Render targets keep the game resolution.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
    }

    /// The letterboxed area of the window the game is drawn into.
    pub fn viewport(&self) -> Viewport {
        letterbox(
            UVec2::new(self.gpu.width(), self.gpu.height()),
            self.resolution,
            self.view_padding,
        )
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn source_size(&self, source: ImageSource) -> Option<UVec2> {
        match source {
            ImageSource::Target(id) => self.targets.get(&id).map(|t| t.image.size),
            ImageSource::Texture(id) => self.textures.get(&id).map(|t| t.size),
        }
    }

    fn push_quad(&mut self, source: BatchSource, verts: [Vertex2d; 6]) {
        let Some(pass) = self.passes.last_mut() else {
            warn!("draw call with no bound target");
            return;
        };
        let start = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&verts);
        let end = self.vertices.len() as u32;

        match pass.batches.last_mut() {
            Some(batch) if batch.source == source && batch.vertices.end == start => {
                batch.vertices.end = end;
            }
            _ => pass.batches.push(Batch {
                source,
                vertices: start..end,
            }),
        }
    }

    fn bind_group(&self, source: BatchSource) -> Option<&wgpu::BindGroup> {
        match source {
            BatchSource::White => Some(&self.white.bind_group),
            BatchSource::Image(ImageSource::Target(id)) => {
                self.targets.get(&id).map(|t| &t.image.bind_group)
            }
            BatchSource::Image(ImageSource::Texture(id)) => {
                self.textures.get(&id).map(|t| &t.bind_group)
            }
        }
    }

    fn acquire_frame(&self) -> Result<Option<wgpu::SurfaceTexture>, GraphicsError> {
        match self.gpu.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("surface lost, reconfiguring");
                self.gpu.reconfigure();
                Err(GraphicsError::SurfaceLost)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("timed out acquiring the next frame, skipping present");
                Ok(None)
            }
            Err(e) => Err(GraphicsError::Surface(e.to_string())),
        }
    }

    fn submit(&mut self, passes: &[RecordedPass]) -> Result<(), GraphicsError> {
        let frame = if passes.iter().any(|p| p.target.is_none()) {
            self.acquire_frame()?
        } else {
            None
        };
        let surface_view = frame
            .as_ref()
            .map(|f| f.texture.create_view(&wgpu::TextureViewDescriptor::default()));

        self.sprites.reserve(&self.gpu.device, self.vertices.len());
        if !self.vertices.is_empty() {
            self.gpu.queue.write_buffer(
                &self.sprites.vertex_buffer,
                0,
                bytemuck::cast_slice(&self.vertices),
            );
        }

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let viewport = self.viewport();
        for pass in passes {
            let (view, preserve) = match pass.target {
                Some(id) => match self.targets.get(&id) {
                    Some(target) => (&target.image.view, target.desc.preserve_contents),
                    None => {
                        warn!("render target {id:?} was disposed before submit");
                        continue;
                    }
                },
                None => match &surface_view {
                    Some(view) => (view, true),
                    None => continue,
                },
            };

            let load = match pass.clear {
                Some(color) => wgpu::LoadOp::Clear(color.into()),
                None if preserve => wgpu::LoadOp::Load,
                None => wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            };

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Sprite Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if pass.batches.is_empty() {
                continue;
            }

            render_pass.set_pipeline(&self.sprites.pipeline);
            render_pass.set_vertex_buffer(0, self.sprites.vertex_buffer.slice(..));
            if pass.target.is_none() {
                render_pass.set_viewport(
                    viewport.x,
                    viewport.y,
                    viewport.width,
                    viewport.height,
                    0.0,
                    1.0,
                );
            }

            for batch in &pass.batches {
                let Some(bind_group) = self.bind_group(batch.source) else {
                    continue;
                };
                render_pass.set_bind_group(0, bind_group, &[]);
                render_pass.draw(batch.vertices.clone(), 0..1);
            }
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        if let Some(frame) = frame {
            frame.present();
        }
        Ok(())
    }
}

impl Graphics for GpuGraphics {
    fn resolution(&self) -> UVec2 {
        self.resolution
    }

    fn create_target(&mut self, desc: &TargetDescriptor) -> Result<TargetId, GraphicsError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(GraphicsError::InvalidSize {
                width: desc.width,
                height: desc.height,
            });
        }
        let image = create_target_image(&self.gpu, &self.sprites, desc);
        let id = TargetId(self.allocate_id());
        self.targets.insert(
            id,
            GpuTarget {
                desc: desc.clone(),
                image,
            },
        );
        Ok(id)
    }

    fn reload_target(&mut self, id: TargetId) -> Result<(), GraphicsError> {
        let target = self
            .targets
            .get_mut(&id)
            .ok_or(GraphicsError::UnknownTarget(id))?;
        target.image = create_target_image(&self.gpu, &self.sprites, &target.desc);
        debug!("recreated storage for '{}'", target.desc.label);
        Ok(())
    }

    fn dispose_target(&mut self, id: TargetId) {
        self.targets.remove(&id);
    }

    fn target_size(&self, id: TargetId) -> Option<UVec2> {
        self.targets.get(&id).map(|t| t.image.size)
    }

    fn create_texture(
        &mut self,
        rgba: &[u8],
        width: u32,
        height: u32,
        label: &str,
    ) -> Result<TextureId, GraphicsError> {
        super::check_rgba(rgba, width, height)?;
        let image = upload_texture(&self.gpu, &self.sprites, rgba, width, height, label);
        let id = TextureId(self.allocate_id());
        self.textures.insert(id, image);
        Ok(id)
    }

    fn texture_size(&self, id: TextureId) -> Option<UVec2> {
        self.textures.get(&id).map(|t| t.size)
    }

    fn dispose_texture(&mut self, id: TextureId) {
        self.textures.remove(&id);
    }

    fn begin_pass(
        &mut self,
        target: Option<TargetId>,
        clear: Option<Color>,
    ) -> Result<(), GraphicsError> {
        let size = match target {
            Some(id) => self
                .target_size(id)
                .ok_or(GraphicsError::UnknownTarget(id))?,
            None => self.resolution,
        };
        self.passes.push(RecordedPass {
            target,
            clear,
            size: size.as_vec2(),
            batches: Vec::new(),
        });
        Ok(())
    }

    fn draw_image(&mut self, source: ImageSource, sprite: &Sprite) {
        let Some(pass) = self.passes.last() else {
            warn!("draw call with no bound target");
            return;
        };
        if matches!(source, ImageSource::Target(id) if pass.target == Some(id)) {
            warn!("skipping draw that samples its own render target");
            return;
        }
        let target_size = pass.size;
        let Some(source_size) = self.source_size(source) else {
            warn!("skipping draw from unknown image {source:?}");
            return;
        };
        let verts = sprite_vertices(sprite, source_size.as_vec2(), target_size);
        self.push_quad(BatchSource::Image(source), verts);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some(pass) = self.passes.last() else {
            warn!("draw call with no bound target");
            return;
        };
        let sprite = Sprite::new(rect).tint(color);
        let verts = sprite_vertices(&sprite, Vec2::ONE, pass.size);
        self.push_quad(BatchSource::White, verts);
    }

    fn end_frame(&mut self) -> Result<(), GraphicsError> {
        let passes = std::mem::take(&mut self.passes);
        let result = if passes.is_empty() {
            Ok(())
        } else {
            self.submit(&passes)
        };
        self.vertices.clear();
        result
    }
}

fn create_target_image(gpu: &GpuContext, sprites: &SpritePass, desc: &TargetDescriptor) -> GpuImage {
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&desc.label),
        size: wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: gpu.format(),
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = sprites.bind_image(&gpu.device, &view, &sprites.target_sampler, &desc.label);
    GpuImage {
        texture,
        view,
        bind_group,
        size: desc.size(),
    }
}

fn upload_texture(
    gpu: &GpuContext,
    sprites: &SpritePass,
    rgba: &[u8],
    width: u32,
    height: u32,
    label: &str,
) -> GpuImage {
    let texture = gpu.device.create_texture_with_data(
        &gpu.queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        rgba,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = sprites.bind_image(&gpu.device, &view, &sprites.texture_sampler, label);
    GpuImage {
        texture,
        view,
        bind_group,
        size: UVec2::new(width, height),
    }
}
