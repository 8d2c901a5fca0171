//! Segmentation service backed by a JS model.
//!
//! The host passes an object with three functions:
//!
//! ```typescript
//! const service = new SegmentationService({
//!   isReady: () => typeof window.ort !== 'undefined',
//!   loadModel: () => loadBackgroundRemoval(),          // Promise<void>
//!   generateMask: (src) => removeBackgroundToUrl(src), // Promise<string>
//! });
//! const bitmap = await service.generateMask(image.src);
//! session.addSubjectMask(bitmap);
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use darkroom_core::mask::BitmapHandle;
use darkroom_core::segmentation::{
    ModelState, SegmentationBackend, SegmentationError, SegmentationService,
};
use darkroom_core::ImageHandle;
use futures::future::{AbortHandle, LocalBoxFuture};
use futures::FutureExt;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

use crate::session::config_from_js;
use crate::types::js_error;

struct JsSegmentationBackend {
    is_ready: js_sys::Function,
    load_model: js_sys::Function,
    generate_mask: js_sys::Function,
}

fn function(object: &JsValue, name: &str) -> Result<js_sys::Function, JsValue> {
    js_sys::Reflect::get(object, &JsValue::from_str(name))?
        .dyn_into::<js_sys::Function>()
        .map_err(|_| JsValue::from_str(&format!("segmentation backend is missing `{}`", name)))
}

fn message(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", value))
}

async fn settle(returned: Result<JsValue, JsValue>) -> Result<JsValue, JsValue> {
    JsFuture::from(js_sys::Promise::resolve(&returned?)).await
}

impl SegmentationBackend for JsSegmentationBackend {
    fn runtime_ready(&self) -> bool {
        self.is_ready
            .call0(&JsValue::NULL)
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn load_model(&self) -> LocalBoxFuture<'_, Result<(), SegmentationError>> {
        async move {
            settle(self.load_model.call0(&JsValue::NULL))
                .await
                .map(|_| ())
                .map_err(|e| SegmentationError::LoadFailed(message(&e)))
        }
        .boxed_local()
    }

    fn infer<'a>(
        &'a self,
        image: &'a ImageHandle,
    ) -> LocalBoxFuture<'a, Result<BitmapHandle, SegmentationError>> {
        async move {
            let src = JsValue::from_str(image.as_str());
            let value = settle(self.generate_mask.call1(&JsValue::NULL, &src))
                .await
                .map_err(|e| SegmentationError::InferenceFailed(message(&e)))?;
            value
                .as_string()
                .map(BitmapHandle::new)
                .ok_or_else(|| SegmentationError::InferenceFailed("mask is not a string".to_string()))
        }
        .boxed_local()
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'_, ()> {
        let ms = duration.as_millis().min(i32::MAX as u128) as i32;
        async move {
            let promise = js_sys::Promise::new(&mut |resolve, _reject| {
                let scheduled = web_sys::window().map(|window| {
                    window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
                });
                if !matches!(scheduled, Some(Ok(_))) {
                    let _ = resolve.call0(&JsValue::NULL);
                }
            });
            let _ = JsFuture::from(promise).await;
        }
        .boxed_local()
    }
}

/// The running `generateMask` request, tagged so a finished request only
/// clears its own entry.
#[derive(Default)]
struct PendingRequest {
    next_token: u64,
    current: Option<(u64, AbortHandle)>,
}

impl PendingRequest {
    /// Track a new request, aborting the one it replaces.
    fn start(&mut self, handle: AbortHandle) -> u64 {
        self.next_token += 1;
        if let Some((_, previous)) = self.current.replace((self.next_token, handle)) {
            previous.abort();
        }
        self.next_token
    }

    fn finish(&mut self, token: u64) {
        if matches!(self.current, Some((current, _)) if current == token) {
            self.current = None;
        }
    }

    fn cancel(&mut self) -> bool {
        match self.current.take() {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

#[wasm_bindgen(js_name = SegmentationService)]
pub struct JsSegmentationService {
    inner: Rc<SegmentationService<JsSegmentationBackend>>,
    pending: Rc<RefCell<PendingRequest>>,
}

#[wasm_bindgen(js_class = SegmentationService)]
impl JsSegmentationService {
    /// Wrap a JS backend. `config` is an optional partial `EditorConfig`
    /// (only the model polling fields are read).
    #[wasm_bindgen(constructor)]
    pub fn new(backend: JsValue, config: JsValue) -> Result<JsSegmentationService, JsValue> {
        let config = config_from_js(config)?;
        let backend = JsSegmentationBackend {
            is_ready: function(&backend, "isReady")?,
            load_model: function(&backend, "loadModel")?,
            generate_mask: function(&backend, "generateMask")?,
        };
        Ok(Self {
            inner: Rc::new(SegmentationService::new(backend, &config)),
            pending: Rc::new(RefCell::new(PendingRequest::default())),
        })
    }

    /// "uninitialized", "loading", "ready" or "failed".
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        match self.inner.state() {
            ModelState::Uninitialized => "uninitialized",
            ModelState::Loading => "loading",
            ModelState::Ready => "ready",
            ModelState::Failed(_) => "failed",
        }
        .to_string()
    }

    /// Load the model ahead of the first request.
    pub fn preload(&self) -> js_sys::Promise {
        let service = Rc::clone(&self.inner);
        future_to_promise(async move {
            service.ensure_loaded().await.map_err(js_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Resolve with the mask bitmap for an image, or reject.
    ///
    /// Never resolves with an empty placeholder. Only the latest request
    /// runs: starting a new one rejects the previous promise as cancelled.
    /// The model load itself is shared between requests.
    #[wasm_bindgen(js_name = generateMask)]
    pub fn generate_mask(&self, image_src: String) -> js_sys::Promise {
        let service = Rc::clone(&self.inner);
        let pending = Rc::clone(&self.pending);
        future_to_promise(async move {
            let image = ImageHandle::new(image_src);
            let (task, handle) = service.generate_mask_abortable(&image);
            let token = pending.borrow_mut().start(handle);
            let result = task.await;
            pending.borrow_mut().finish(token);
            let bitmap = result.map_err(js_error)?;
            Ok(JsValue::from_str(bitmap.as_str()))
        })
    }

    /// Abort the in-flight `generateMask`; its promise rejects.
    pub fn cancel(&self) {
        if self.pending.borrow_mut().cancel() {
            log::info!("Mask generation cancel requested");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::future::{ready, AbortRegistration, Abortable};

    fn aborted(registration: AbortRegistration) -> bool {
        block_on(Abortable::new(ready(()), registration)).is_err()
    }

    #[test]
    fn test_new_request_aborts_previous() {
        let mut pending = PendingRequest::default();
        let (first, first_reg) = AbortHandle::new_pair();
        let (second, second_reg) = AbortHandle::new_pair();
        pending.start(first);
        pending.start(second);
        assert!(aborted(first_reg));
        assert!(!aborted(second_reg));
    }

    #[test]
    fn test_stale_finish_keeps_current_request() {
        let mut pending = PendingRequest::default();
        let (first, _first_reg) = AbortHandle::new_pair();
        let (second, second_reg) = AbortHandle::new_pair();
        let first_token = pending.start(first);
        pending.start(second);

        // The replaced request settles after the new one started
        pending.finish(first_token);
        assert!(pending.cancel());
        assert!(aborted(second_reg));
    }

    #[test]
    fn test_finish_clears_own_request() {
        let mut pending = PendingRequest::default();
        let (handle, registration) = AbortHandle::new_pair();
        let token = pending.start(handle);
        pending.finish(token);
        assert!(!pending.cancel());
        assert!(!aborted(registration));
    }
}
