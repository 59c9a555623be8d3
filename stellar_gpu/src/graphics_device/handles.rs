/// Opaque GPU object handles
///
/// Every native object is referred to by a `Copy` newtype over `u64`. The
/// backend maps them to its own handle types (for Vulkan, the raw handle
/// value). `NULL` (0) never names a live object.

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(u64);

        impl $name {
            /// Handle that names no object
            pub const NULL: Self = Self(0);

            /// Wrap a raw backend handle value
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Raw backend handle value
            pub const fn as_raw(self) -> u64 {
                self.0
            }

            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

define_handle!(
    /// Presentable-surface image chain
    SwapchainHandle
);
define_handle!(
    /// Image (owned or swapchain-provided)
    ImageHandle
);
define_handle!(
    /// Device memory block backing an owned image
    MemoryHandle
);
define_handle!(ImageViewHandle);
define_handle!(SamplerHandle);
define_handle!(FramebufferHandle);
define_handle!(RenderPassHandle);
define_handle!(CommandBufferHandle);
define_handle!(FenceHandle);
define_handle!(SemaphoreHandle);
define_handle!(ShaderModuleHandle);
define_handle!(PipelineHandle);
define_handle!(PipelineLayoutHandle);
define_handle!(DescriptorSetLayoutHandle);
define_handle!(DescriptorPoolHandle);
define_handle!(DescriptorSetHandle);
define_handle!(
    /// Host-visible buffer (memory is managed by the backend)
    BufferHandle
);
