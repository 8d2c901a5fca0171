//! Subject segmentation service.
//!
//! The model itself is an external collaborator behind
//! [`SegmentationBackend`]. [`SegmentationService`] adds the lifecycle
//! around it:
//!
//! ```text
//! Uninitialized -> Loading -> Ready
//!                          -> Failed -> (next request) Loading ...
//! ```
//!
//! The model is loaded lazily on the first request. Loading is serialized by
//! an async mutex so concurrent requests share a single load. Before loading,
//! the backend runtime is polled for readiness a bounded number of times.
//!
//! Everything here is single-threaded; futures are `!Send` so a browser
//! backend can hold JS values.

use std::cell::RefCell;
use std::time::Duration;

use futures::future::{AbortHandle, Abortable, LocalBoxFuture};
use futures::lock::Mutex;
use thiserror::Error;

use crate::mask::BitmapHandle;
use crate::{EditorConfig, ImageHandle};

/// Errors from mask generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentationError {
    /// The backend runtime never became ready.
    #[error("Segmentation model unavailable after {attempts} readiness checks")]
    ModelUnavailable { attempts: u32 },

    /// The runtime was ready but the model failed to load.
    #[error("Segmentation model failed to load: {0}")]
    LoadFailed(String),

    /// The model ran but produced no usable mask.
    #[error("Segmentation inference failed: {0}")]
    InferenceFailed(String),

    /// The request was aborted by the caller.
    #[error("Segmentation cancelled")]
    Cancelled,
}

/// Model lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModelState {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    /// Last load attempt failed; the next request retries
    Failed(String),
}

/// Host-provided segmentation model.
pub trait SegmentationBackend {
    /// Whether the runtime that hosts the model is available yet.
    fn runtime_ready(&self) -> bool;

    /// Load the model. Called at most once per successful lifecycle.
    fn load_model(&self) -> LocalBoxFuture<'_, Result<(), SegmentationError>>;

    /// Produce a foreground mask for an image.
    fn infer<'a>(
        &'a self,
        image: &'a ImageHandle,
    ) -> LocalBoxFuture<'a, Result<BitmapHandle, SegmentationError>>;

    /// Wait between readiness polls.
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'_, ()>;
}

/// Lazily loaded, explicitly stateful wrapper around a backend.
pub struct SegmentationService<B> {
    backend: B,
    state: RefCell<ModelState>,
    load_guard: Mutex<()>,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl<B: SegmentationBackend> SegmentationService<B> {
    pub fn new(backend: B, config: &EditorConfig) -> Self {
        Self {
            backend,
            state: RefCell::new(ModelState::Uninitialized),
            load_guard: Mutex::new(()),
            poll_attempts: config.model_poll_attempts,
            poll_interval: config.model_poll_interval(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> ModelState {
        self.state.borrow().clone()
    }

    fn set_state(&self, state: ModelState) {
        *self.state.borrow_mut() = state;
    }

    /// Make sure the model is loaded, loading it if needed.
    ///
    /// Concurrent callers wait for the in-flight load instead of starting
    /// their own.
    pub async fn ensure_loaded(&self) -> Result<(), SegmentationError> {
        let _guard = self.load_guard.lock().await;
        if self.state() == ModelState::Ready {
            return Ok(());
        }

        self.set_state(ModelState::Loading);
        log::info!("Loading segmentation model");

        let mut attempts = 0;
        while !self.backend.runtime_ready() {
            if attempts >= self.poll_attempts {
                let err = SegmentationError::ModelUnavailable { attempts };
                log::error!("{}", err);
                self.set_state(ModelState::Failed(err.to_string()));
                return Err(err);
            }
            self.backend.sleep(self.poll_interval).await;
            attempts += 1;
        }

        match self.backend.load_model().await {
            Ok(()) => {
                log::info!("Segmentation model ready");
                self.set_state(ModelState::Ready);
                Ok(())
            }
            Err(err) => {
                log::error!("Failed to load segmentation model: {}", err);
                self.set_state(ModelState::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    /// Generate a subject mask bitmap for an image.
    ///
    /// Never returns an empty placeholder: every failure is an error.
    pub async fn generate_mask(&self, image: &ImageHandle) -> Result<BitmapHandle, SegmentationError> {
        self.ensure_loaded().await?;
        let bitmap = self.backend.infer(image).await?;
        if bitmap.as_str().is_empty() {
            return Err(SegmentationError::InferenceFailed(
                "backend returned an empty bitmap".to_string(),
            ));
        }
        Ok(bitmap)
    }

    /// Like [`generate_mask`](Self::generate_mask), with a handle to abort it.
    ///
    /// Aborting resolves the future to [`SegmentationError::Cancelled`]. An
    /// aborted load leaves the model unloaded; the next request starts over.
    pub fn generate_mask_abortable<'a>(
        &'a self,
        image: &'a ImageHandle,
    ) -> (
        impl std::future::Future<Output = Result<BitmapHandle, SegmentationError>> + 'a,
        AbortHandle,
    ) {
        let (handle, registration) = AbortHandle::new_pair();
        let task = Abortable::new(self.generate_mask(image), registration);
        let fut = async move {
            match task.await {
                Ok(result) => result,
                Err(_aborted) => {
                    log::info!("Mask generation cancelled");
                    if self.state() == ModelState::Loading {
                        self.set_state(ModelState::Uninitialized);
                    }
                    Err(SegmentationError::Cancelled)
                }
            }
        };
        (fut, handle)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fake backend shared by segmentation and session tests.

    use std::cell::Cell;
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use futures::FutureExt;

    use super::*;

    /// Returns `Pending` once, waking itself, so other futures get a turn.
    pub struct YieldNow(bool);

    impl Future for YieldNow {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                Poll::Ready(())
            } else {
                self.0 = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    pub fn yield_now() -> YieldNow {
        YieldNow(false)
    }

    pub struct FakeBackend {
        /// Polls until the runtime reports ready
        pub ready_after: Cell<u32>,
        pub load_fails: Cell<bool>,
        pub infer_result: RefCell<Result<BitmapHandle, SegmentationError>>,
        pub loads: Cell<u32>,
        pub sleeps: Cell<u32>,
        pub inferences: Cell<u32>,
    }

    impl Default for FakeBackend {
        fn default() -> Self {
            Self {
                ready_after: Cell::new(0),
                load_fails: Cell::new(false),
                infer_result: RefCell::new(Ok(BitmapHandle::new("blob:mask"))),
                loads: Cell::new(0),
                sleeps: Cell::new(0),
                inferences: Cell::new(0),
            }
        }
    }

    impl FakeBackend {
        pub fn never_ready() -> Self {
            let backend = Self::default();
            backend.ready_after.set(u32::MAX);
            backend
        }
    }

    impl SegmentationBackend for FakeBackend {
        fn runtime_ready(&self) -> bool {
            self.sleeps.get() >= self.ready_after.get()
        }

        fn load_model(&self) -> LocalBoxFuture<'_, Result<(), SegmentationError>> {
            async move {
                self.loads.set(self.loads.get() + 1);
                yield_now().await;
                if self.load_fails.get() {
                    Err(SegmentationError::LoadFailed("weights missing".to_string()))
                } else {
                    Ok(())
                }
            }
            .boxed_local()
        }

        fn infer<'a>(
            &'a self,
            _image: &'a ImageHandle,
        ) -> LocalBoxFuture<'a, Result<BitmapHandle, SegmentationError>> {
            async move {
                self.inferences.set(self.inferences.get() + 1);
                self.infer_result.borrow().clone()
            }
            .boxed_local()
        }

        fn sleep(&self, _duration: Duration) -> LocalBoxFuture<'_, ()> {
            async move {
                self.sleeps.set(self.sleeps.get() + 1);
                yield_now().await;
            }
            .boxed_local()
        }
    }
}
