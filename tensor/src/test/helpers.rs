use std::sync::Arc;

use ferry_device::{registry, DeviceContext, SoftRuntime};

/// Fresh device context on its own stream, so parallel tests never share
/// a queue. Kind names mirror a multi-backend process ("gcu", "sdaa");
/// cross-kind failures just need a second kind to exist.
pub fn device_context(kind: &'static str, id: usize) -> DeviceContext {
    DeviceContext::new(Arc::new(SoftRuntime::new(kind, 4)), id).unwrap()
}

/// The process-wide host context. Host paths never touch its stream, so
/// sharing it across tests is safe.
pub fn host_context() -> Arc<DeviceContext> {
    registry::host().unwrap()
}
