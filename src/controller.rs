use crate::{
    client::ImageLoader,
    error::{ImageError, Result},
    models::{GeneratedImage, ImageModel, ImageSize, LoadState},
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::{runtime::Handle, sync::watch};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;

/// What observers see when a new cycle starts on top of a finished one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReloadPolicy {
    /// Publish `Loading` on every start.
    #[default]
    Reset,
    /// Leave a `Loaded`/`Failed` state visible until the new cycle ends.
    KeepPrevious,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    token: Option<CancellationToken>,
}

struct Shared {
    slot: Mutex<Slot>,
    state: watch::Sender<LoadState>,
}

impl Shared {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies a finished cycle. The generation check and the publish share
    /// one critical section with `start`, so a superseded cycle can never
    /// overwrite a newer one.
    fn complete(
        &self,
        generation: u64,
        token: &CancellationToken,
        outcome: Option<Result<GeneratedImage>>,
    ) {
        let mut slot = self.slot();

        if token.is_cancelled() || slot.generation != generation {
            log::debug!(
                "Discarding superseded fetch [generation:{} current:{}]",
                generation,
                slot.generation
            );
            return;
        }
        slot.token = None;

        let next = match outcome {
            Some(Ok(image)) => {
                log::info!("✅ Image loaded [generation:{}]", generation);
                LoadState::Loaded(image)
            }
            Some(Err(error)) if error.is_cancellation() => {
                log::debug!("Loader reported cancellation [generation:{}]", generation);
                return;
            }
            Some(Err(error)) => {
                log::error!("❌ Image fetch failed [generation:{}]: {}", generation, error);
                LoadState::Failed(error)
            }
            None => return,
        };

        self.state.send_replace(next);
    }
}

/// Owns the current fetch for the current input.
///
/// `start` and `cancel` return immediately; the fetch itself runs as a task on
/// the Tokio runtime and reports back through a `watch` channel. Only the most
/// recent `start` is ever allowed to change the published [`LoadState`].
pub struct LoadController {
    loader: Arc<dyn ImageLoader>,
    shared: Arc<Shared>,
    runtime: Handle,
    policy: ReloadPolicy,
}

impl LoadController {
    /// Binds to the runtime of the calling context. Off-runtime callers, such
    /// as a UI thread, should pass a handle to [`LoadController::with_handle`].
    pub fn new(loader: Arc<dyn ImageLoader>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            ImageError::Config(format!("No Tokio runtime to run image fetches on: {}", e))
        })?;
        Ok(Self::with_handle(loader, runtime))
    }

    pub fn with_handle(loader: Arc<dyn ImageLoader>, runtime: Handle) -> Self {
        let (state, _) = watch::channel(LoadState::Loading);
        Self {
            loader,
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::default()),
                state,
            }),
            runtime,
            policy: ReloadPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReloadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ReloadPolicy {
        self.policy
    }

    /// Cancels whatever is in flight and begins a new cycle.
    pub fn start(&self, prompt: impl Into<String>, size: ImageSize, model: ImageModel) {
        let prompt = prompt.into();
        let mut slot = self.shared.slot();

        if let Some(previous) = slot.token.take() {
            previous.cancel();
            log::debug!("✋ Superseded fetch [generation:{}]", slot.generation);
        }

        slot.generation += 1;
        let generation = slot.generation;
        let token = CancellationToken::new();
        slot.token = Some(token.clone());

        let keep_previous = self.policy == ReloadPolicy::KeepPrevious
            && self.shared.state.borrow().is_terminal();
        if !keep_previous {
            self.shared.state.send_replace(LoadState::Loading);
        }
        drop(slot);

        log::info!(
            "🔄 Starting image fetch [generation:{}] size={} model={}",
            generation,
            size,
            model
        );

        let loader = Arc::clone(&self.loader);
        let shared = Arc::clone(&self.shared);
        self.runtime.spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                result = loader.load(&prompt, size, model) => Some(result),
            };
            shared.complete(generation, &token, outcome);
        });
    }

    /// Drops the in-flight fetch, if any. The published state is left as is.
    pub fn cancel(&self) {
        let mut slot = self.shared.slot();
        if let Some(token) = slot.token.take() {
            token.cancel();
            log::debug!("✋ Cancelled fetch [generation:{}]", slot.generation);
        }
    }

    pub fn state(&self) -> LoadState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.shared.state.subscribe()
    }

    /// Current state first, then every change.
    pub fn states(&self) -> WatchStream<LoadState> {
        WatchStream::new(self.subscribe())
    }

    pub fn generation(&self) -> u64 {
        self.shared.slot().generation
    }

    pub fn is_in_flight(&self) -> bool {
        self.shared.slot().token.is_some()
    }
}

impl Drop for LoadController {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for LoadController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadController")
            .field("generation", &self.generation())
            .field("in_flight", &self.is_in_flight())
            .field("policy", &self.policy)
            .finish()
    }
}

/// Waits for the first `Loaded`/`Failed` value the receiver sees.
///
/// Under [`ReloadPolicy::KeepPrevious`] the previous cycle's terminal state
/// stays published while a new cycle runs, so this returns that older value
/// immediately. Use [`ReloadPolicy::Reset`] or `wait_for` with a predicate on
/// the expected image when the new cycle's result is needed.
pub async fn wait_until_settled(receiver: &mut watch::Receiver<LoadState>) -> Result<LoadState> {
    let state = receiver
        .wait_for(LoadState::is_terminal)
        .await
        .map_err(|_| ImageError::Cancelled)?;
    Ok((*state).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::{sleep, timeout};

    type Reply = Result<GeneratedImage>;

    #[derive(Default)]
    struct GatedLoader {
        gates: Mutex<HashMap<String, oneshot::Receiver<Reply>>>,
    }

    impl GatedLoader {
        fn gate(&self, prompt: &str) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(prompt.to_string(), rx);
            tx
        }
    }

    #[async_trait]
    impl ImageLoader for GatedLoader {
        async fn load(&self, prompt: &str, _: ImageSize, _: ImageModel) -> Reply {
            let gate = self.gates.lock().unwrap().remove(prompt);
            match gate {
                Some(rx) => rx.await.unwrap_or(Err(ImageError::Cancelled)),
                None => Err(ImageError::Transport(format!("no gate for {}", prompt))),
            }
        }
    }

    fn image(tag: u8) -> GeneratedImage {
        GeneratedImage::new(vec![tag])
    }

    fn controller(loader: &Arc<GatedLoader>) -> LoadController {
        LoadController::new(loader.clone()).unwrap()
    }

    fn start(controller: &LoadController, prompt: &str) {
        controller.start(prompt, ImageSize::default(), ImageModel::default());
    }

    async fn settle(controller: &LoadController) -> LoadState {
        let mut receiver = controller.subscribe();
        timeout(Duration::from_secs(2), wait_until_settled(&mut receiver))
            .await
            .expect("state never settled")
            .unwrap()
    }

    async fn let_tasks_run() {
        sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_start_publishes_loading_synchronously() {
        let loader = Arc::new(GatedLoader::default());
        let _cat = loader.gate("cat");
        let controller = controller(&loader);

        start(&controller, "cat");

        assert_eq!(controller.state(), LoadState::Loading);
        assert!(controller.is_in_flight());
        assert_eq!(controller.generation(), 1);
    }

    #[tokio::test]
    async fn test_success_and_failure_are_published() {
        let loader = Arc::new(GatedLoader::default());
        let controller = controller(&loader);

        let cat = loader.gate("cat");
        start(&controller, "cat");
        cat.send(Ok(image(1))).unwrap();
        assert_eq!(settle(&controller).await, LoadState::Loaded(image(1)));
        assert!(!controller.is_in_flight());

        let dog = loader.gate("dog");
        start(&controller, "dog");
        assert_eq!(controller.state(), LoadState::Loading);
        dog.send(Err(ImageError::NoImagesReturned)).unwrap();
        assert_eq!(
            settle(&controller).await,
            LoadState::Failed(ImageError::NoImagesReturned)
        );
    }

    #[tokio::test]
    async fn test_stale_result_arriving_last_is_ignored() {
        let loader = Arc::new(GatedLoader::default());
        let controller = controller(&loader);
        let cat = loader.gate("cat");
        let dog = loader.gate("dog");

        start(&controller, "cat");
        start(&controller, "dog");

        dog.send(Ok(image(2))).unwrap();
        assert_eq!(settle(&controller).await, LoadState::Loaded(image(2)));

        let _ = cat.send(Ok(image(1)));
        let_tasks_run().await;
        assert_eq!(controller.state(), LoadState::Loaded(image(2)));
    }

    #[tokio::test]
    async fn test_stale_result_arriving_first_is_ignored() {
        let loader = Arc::new(GatedLoader::default());
        let controller = controller(&loader);
        let cat = loader.gate("cat");
        let dog = loader.gate("dog");

        start(&controller, "cat");
        start(&controller, "dog");

        let _ = cat.send(Ok(image(1)));
        let_tasks_run().await;
        assert_eq!(controller.state(), LoadState::Loading);

        dog.send(Ok(image(2))).unwrap();
        assert_eq!(settle(&controller).await, LoadState::Loaded(image(2)));
    }

    #[tokio::test]
    async fn test_only_last_of_many_starts_applies() {
        let loader = Arc::new(GatedLoader::default());
        let controller = controller(&loader);

        let prompts: Vec<String> = (0..8).map(|i| format!("prompt {}", i)).collect();
        let mut gates: Vec<_> = prompts.iter().map(|p| loader.gate(p)).collect();
        for prompt in &prompts {
            start(&controller, prompt);
        }
        assert_eq!(controller.generation(), prompts.len() as u64);

        // Resolve newest first, then every stale one.
        let last = gates.pop().unwrap();
        last.send(Ok(image(7))).unwrap();
        for (i, gate) in gates.into_iter().enumerate().rev() {
            let _ = gate.send(Ok(image(i as u8)));
        }

        assert_eq!(settle(&controller).await, LoadState::Loaded(image(7)));
        let_tasks_run().await;
        assert_eq!(controller.state(), LoadState::Loaded(image(7)));
    }

    #[tokio::test]
    async fn test_cancel_leaves_state_untouched() {
        let loader = Arc::new(GatedLoader::default());
        let controller = controller(&loader);

        let cat = loader.gate("cat");
        start(&controller, "cat");
        cat.send(Ok(image(1))).unwrap();
        settle(&controller).await;

        controller.cancel();
        assert_eq!(controller.state(), LoadState::Loaded(image(1)));

        let dog = loader.gate("dog");
        start(&controller, "dog");
        controller.cancel();
        assert_eq!(controller.state(), LoadState::Loading);
        assert!(!controller.is_in_flight());

        let _ = dog.send(Ok(image(2)));
        let_tasks_run().await;
        assert_eq!(controller.state(), LoadState::Loading);
    }

    #[tokio::test]
    async fn test_cancelled_fetch_never_fails() {
        let loader = Arc::new(GatedLoader::default());
        let controller = controller(&loader);

        let cat = loader.gate("cat");
        start(&controller, "cat");
        controller.cancel();

        let _ = cat.send(Err(ImageError::Transport("connection reset".into())));
        let_tasks_run().await;
        assert_eq!(controller.state(), LoadState::Loading);
    }

    #[tokio::test]
    async fn test_loader_cancellation_is_swallowed() {
        let loader = Arc::new(GatedLoader::default());
        let controller = controller(&loader);

        let cat = loader.gate("cat");
        start(&controller, "cat");
        cat.send(Err(ImageError::Cancelled)).unwrap();
        let_tasks_run().await;

        assert_eq!(controller.state(), LoadState::Loading);
        assert!(!controller.is_in_flight());
    }

    #[tokio::test]
    async fn test_generation_check_rejects_late_completion() {
        let loader = Arc::new(GatedLoader::default());
        let controller = controller(&loader);
        let _cat = loader.gate("cat");
        let _dog = loader.gate("dog");

        start(&controller, "cat");
        start(&controller, "dog");

        // A first-generation completion that slipped past its own token check.
        let live_token = CancellationToken::new();
        controller
            .shared
            .complete(1, &live_token, Some(Ok(image(1))));

        assert_eq!(controller.state(), LoadState::Loading);
        assert!(controller.is_in_flight());
    }

    #[tokio::test]
    async fn test_keep_previous_avoids_loading_flash() {
        let loader = Arc::new(GatedLoader::default());
        let controller = controller(&loader).with_policy(ReloadPolicy::KeepPrevious);

        let cat = loader.gate("cat");
        start(&controller, "cat");
        assert_eq!(controller.state(), LoadState::Loading);
        cat.send(Ok(image(1))).unwrap();
        settle(&controller).await;

        let dog = loader.gate("dog");
        start(&controller, "dog");
        assert_eq!(controller.state(), LoadState::Loaded(image(1)));

        dog.send(Ok(image(2))).unwrap();
        let mut receiver = controller.subscribe();
        let state = timeout(
            Duration::from_secs(2),
            receiver.wait_for(|s| *s == LoadState::Loaded(image(2))),
        )
        .await
        .expect("new image never arrived")
        .map(|s| (*s).clone())
        .unwrap();
        assert_eq!(state, LoadState::Loaded(image(2)));
    }

    #[tokio::test]
    async fn test_settled_wait_returns_kept_result_under_keep_previous() {
        let loader = Arc::new(GatedLoader::default());
        let controller = controller(&loader).with_policy(ReloadPolicy::KeepPrevious);

        let cat = loader.gate("cat");
        start(&controller, "cat");
        cat.send(Ok(image(1))).unwrap();
        settle(&controller).await;

        let _dog = loader.gate("dog");
        start(&controller, "dog");
        assert!(controller.is_in_flight());

        // The dog fetch is still gated, yet the wait finishes on the kept cat.
        assert_eq!(settle(&controller).await, LoadState::Loaded(image(1)));
        assert!(controller.is_in_flight());
    }

    #[test]
    fn test_new_outside_runtime_is_config_error() {
        let loader = Arc::new(GatedLoader::default());
        match LoadController::new(loader) {
            Err(ImageError::Config(message)) => assert!(message.contains("Tokio runtime")),
            other => panic!("expected a config error, got {:?}", other),
        }
    }

    #[test]
    fn test_with_handle_runs_fetches_from_plain_thread() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let loader = Arc::new(GatedLoader::default());
        let controller = LoadController::with_handle(loader.clone(), runtime.handle().clone());

        let cat = loader.gate("cat");
        start(&controller, "cat");
        cat.send(Ok(image(1))).unwrap();

        let state = runtime.block_on(settle(&controller));
        assert_eq!(state, LoadState::Loaded(image(1)));
    }

    #[tokio::test]
    async fn test_drop_cancels_in_flight_fetch() {
        let loader = Arc::new(GatedLoader::default());
        let controller = controller(&loader);
        let receiver = controller.subscribe();

        let cat = loader.gate("cat");
        start(&controller, "cat");
        drop(controller);

        let _ = cat.send(Ok(image(1)));
        let_tasks_run().await;
        assert_eq!(*receiver.borrow(), LoadState::Loading);
    }
}
