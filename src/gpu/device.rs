use wgpu::util::DeviceExt;

/// The one GPU operation the resource builder needs.
///
/// Implemented for [`wgpu::Device`]; tests substitute a recording device.
pub trait GpuDevice {
    type Buffer;

    fn upload_buffer(&self, label: &str, usage: wgpu::BufferUsages, contents: &[u8]) -> Self::Buffer;
}

impl GpuDevice for wgpu::Device {
    type Buffer = wgpu::Buffer;

    fn upload_buffer(&self, label: &str, usage: wgpu::BufferUsages, contents: &[u8]) -> wgpu::Buffer {
        self.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage,
        })
    }
}

/// Creates a device with no surface, for uploading outside of a render loop.
pub async fn headless_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::default();
    let adapter = instance.request_adapter(&Default::default()).await?;
    adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("glb headless device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            },
            None,
        )
        .await
        .ok()
}
