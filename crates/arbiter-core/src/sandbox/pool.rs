//! Fixed-size pool of warm sandboxes.
//!
//! The pool is the back-pressure point of the whole worker: it owns every
//! container lifecycle, and `acquire` blocks when all sandboxes are leased,
//! so judging work queues up instead of spawning unbounded containers. All
//! bookkeeping lives behind a bounded channel of handles; no other code
//! path touches it.

use crate::errors::JudgeError;
use crate::sandbox::{ContainerRuntime, SandboxHandle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

pub struct SandboxPool {
    runtime: Arc<dyn ContainerRuntime>,
    capacity: usize,
    idle_tx: mpsc::Sender<SandboxHandle>,
    idle_rx: Mutex<mpsc::Receiver<SandboxHandle>>,
    leased: AtomicUsize,
}

impl SandboxPool {
    /// Create `capacity` warm sandboxes up front. Fails fast if any cannot
    /// be created; a worker with a partial pool would silently under-serve.
    pub async fn initialize(
        runtime: Arc<dyn ContainerRuntime>,
        capacity: usize,
    ) -> Result<Self, JudgeError> {
        if capacity == 0 {
            return Err(JudgeError::PoolError(
                "Pool capacity must be at least 1".to_string(),
            ));
        }
        let (idle_tx, idle_rx) = mpsc::channel(capacity);
        log::info!("Initializing sandbox pool, size {}", capacity);
        for _ in 0..capacity {
            let handle = runtime
                .create_sandbox()
                .await
                .map_err(|e| JudgeError::PoolError(format!("Failed to create sandbox: {}", e)))?;
            idle_tx
                .send(handle)
                .await
                .map_err(|_| JudgeError::PoolError("Pool channel closed".to_string()))?;
        }
        log::info!("Sandbox pool initialized");
        Ok(Self {
            runtime,
            capacity,
            idle_tx,
            idle_rx: Mutex::new(idle_rx),
            leased: AtomicUsize::new(0),
        })
    }

    /// Lease a sandbox, waiting until one is idle.
    pub async fn acquire(&self) -> Result<SandboxHandle, JudgeError> {
        let mut rx = self.idle_rx.lock().await;
        let handle = rx
            .recv()
            .await
            .ok_or_else(|| JudgeError::PoolError("Pool channel closed".to_string()))?;
        self.leased.fetch_add(1, Ordering::SeqCst);
        log::debug!("Leased sandbox {}", handle.id());
        Ok(handle)
    }

    /// Return a healthy sandbox for reuse. The next lessee cleans the
    /// workdir before touching it, so no extra exec round-trip happens here.
    pub async fn release(&self, handle: SandboxHandle) {
        self.leased.fetch_sub(1, Ordering::SeqCst);
        log::debug!("Returning sandbox {}", handle.id());
        if self.idle_tx.send(handle).await.is_err() {
            log::error!("Failed to return sandbox to the pool: channel closed");
        }
    }

    /// Destroy a suspect sandbox and put a fresh replacement into the pool
    /// before returning. If the replacement cannot be created the slot is
    /// dropped and the pool temporarily shrinks; a known-bad handle is never
    /// recycled.
    pub async fn replace(&self, handle: SandboxHandle) {
        self.leased.fetch_sub(1, Ordering::SeqCst);
        log::warn!("Replacing suspect sandbox {}", handle.id());
        if let Err(e) = self.runtime.destroy_sandbox(&handle).await {
            log::error!("Failed to destroy sandbox {}: {}", handle.id(), e);
        }
        match self.runtime.create_sandbox().await {
            Ok(fresh) => {
                if self.idle_tx.send(fresh).await.is_err() {
                    log::error!("Failed to add replacement sandbox: channel closed");
                }
            }
            Err(e) => {
                log::error!("Failed to create replacement sandbox, pool shrinks: {}", e);
            }
        }
    }

    /// Number of handles currently leased out.
    pub fn leased(&self) -> usize {
        self.leased.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Destroy all idle sandboxes. Called on graceful shutdown after the
    /// consumer loops have stopped; leased handles still in flight are the
    /// responsibility of their holders.
    pub async fn drain(&self) {
        let mut rx = self.idle_rx.lock().await;
        while let Ok(handle) = rx.try_recv() {
            if let Err(e) = self.runtime.destroy_sandbox(&handle).await {
                log::error!("Failed to destroy sandbox {} on drain: {}", handle.id(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SandboxError;
    use crate::sandbox::ExecOutput;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    /// In-memory runtime that mints sequential sandbox ids.
    struct FakeRuntime {
        next_id: AtomicUsize,
        destroyed: std::sync::Mutex<Vec<String>>,
        fail_create: AtomicBool,
    }

    impl FakeRuntime {
        fn new() -> Self {
            Self {
                next_id: AtomicUsize::new(0),
                destroyed: std::sync::Mutex::new(Vec::new()),
                fail_create: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn create_sandbox(&self) -> Result<SandboxHandle, SandboxError> {
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(SandboxError::Transport("daemon unavailable".to_string()));
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            Ok(SandboxHandle::new(format!("sandbox-{}", id)))
        }

        async fn destroy_sandbox(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
            self.destroyed.lock().unwrap().push(handle.id().to_string());
            Ok(())
        }

        async fn clean_workdir(&self, _handle: &SandboxHandle) -> Result<(), SandboxError> {
            Ok(())
        }

        async fn upload_file(
            &self,
            _handle: &SandboxHandle,
            _file_name: &str,
            _content: &[u8],
        ) -> Result<(), SandboxError> {
            Ok(())
        }

        async fn exec(
            &self,
            _handle: &SandboxHandle,
            _cmd: &[String],
            _timeout: Duration,
        ) -> Result<ExecOutput, SandboxError> {
            Ok(ExecOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_initialize_creates_capacity_sandboxes() {
        let runtime = Arc::new(FakeRuntime::new());
        let pool = SandboxPool::initialize(runtime.clone(), 3).await.unwrap();
        assert_eq!(pool.capacity(), 3);
        assert_eq!(runtime.next_id.load(Ordering::SeqCst), 3);
        assert_eq!(pool.leased(), 0);
    }

    #[tokio::test]
    async fn test_acquire_and_release_round_trip() {
        let pool = SandboxPool::initialize(Arc::new(FakeRuntime::new()), 2)
            .await
            .unwrap();
        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(pool.leased(), 2);
        pool.release(a).await;
        pool.release(b).await;
        assert_eq!(pool.leased(), 0);
    }

    #[tokio::test]
    async fn test_acquire_blocks_when_exhausted_and_resumes_on_release() {
        let pool = Arc::new(
            SandboxPool::initialize(Arc::new(FakeRuntime::new()), 1)
                .await
                .unwrap(),
        );
        let held = pool.acquire().await.unwrap();

        // Pool exhausted: a second acquire must not complete.
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), pool.acquire()).await;
        assert!(blocked.is_err());

        pool.release(held).await;
        let resumed =
            tokio::time::timeout(Duration::from_millis(200), pool.acquire()).await;
        assert!(resumed.is_ok());
    }

    #[tokio::test]
    async fn test_replace_destroys_and_refills() {
        let runtime = Arc::new(FakeRuntime::new());
        let pool = SandboxPool::initialize(runtime.clone(), 1).await.unwrap();
        let handle = pool.acquire().await.unwrap();
        let suspect_id = handle.id().to_string();

        pool.replace(handle).await;
        assert_eq!(pool.leased(), 0);
        assert_eq!(*runtime.destroyed.lock().unwrap(), vec![suspect_id.clone()]);

        // The replacement is a new sandbox, never the destroyed one.
        let fresh = pool.acquire().await.unwrap();
        assert_ne!(fresh.id(), suspect_id);
    }

    #[tokio::test]
    async fn test_failed_replacement_shrinks_pool() {
        let runtime = Arc::new(FakeRuntime::new());
        let pool = SandboxPool::initialize(runtime.clone(), 1).await.unwrap();
        let handle = pool.acquire().await.unwrap();

        runtime.fail_create.store(true, Ordering::SeqCst);
        pool.replace(handle).await;

        // No handle was recycled and none could be created: the pool is empty.
        let starved =
            tokio::time::timeout(Duration::from_millis(50), pool.acquire()).await;
        assert!(starved.is_err());
    }

    #[tokio::test]
    async fn test_drain_destroys_idle_sandboxes() {
        let runtime = Arc::new(FakeRuntime::new());
        let pool = SandboxPool::initialize(runtime.clone(), 2).await.unwrap();
        pool.drain().await;
        assert_eq!(runtime.destroyed.lock().unwrap().len(), 2);
    }
}
