//! Command dispatch.
//!
//! Runs decoded requests against the shared cache, either on the calling
//! task or on the worker pool.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::cache::SharedCache;
use crate::error::RejectReason;
use crate::executor::TaskExecutor;
use crate::protocol::Request;

/// How requests reach the cache.
#[derive(Clone)]
pub enum Dispatcher {
    /// Execute on the connection task
    Inline { cache: SharedCache },
    /// Hand each request to the worker pool
    Pooled {
        cache: SharedCache,
        executor: Arc<TaskExecutor>,
    },
}

impl Dispatcher {
    pub fn inline(cache: SharedCache) -> Self {
        Dispatcher::Inline { cache }
    }

    pub fn pooled(cache: SharedCache, executor: Arc<TaskExecutor>) -> Self {
        Dispatcher::Pooled { cache, executor }
    }

    pub fn cache(&self) -> &SharedCache {
        match self {
            Dispatcher::Inline { cache } | Dispatcher::Pooled { cache, .. } => cache,
        }
    }

    pub fn executor(&self) -> Option<&Arc<TaskExecutor>> {
        match self {
            Dispatcher::Inline { .. } => None,
            Dispatcher::Pooled { executor, .. } => Some(executor),
        }
    }

    // == Dispatch ==
    /// Executes one request and returns its reply.
    ///
    /// In pooled mode the task holds only the cache lock while it runs and
    /// sends the reply back over a oneshot channel. A rejected submission, or
    /// a task dropped without running, surfaces as the reject reason.
    pub async fn dispatch(&self, request: Request) -> Result<Vec<u8>, RejectReason> {
        let Request { command, argument } = request;

        match self {
            Dispatcher::Inline { cache } => {
                let mut store = cache.lock();
                Ok(command.execute(&mut store, &argument))
            }
            Dispatcher::Pooled { cache, executor } => {
                let (reply_tx, reply_rx) = oneshot::channel();
                let cache = Arc::clone(cache);

                executor.try_submit(move || {
                    let reply = {
                        let mut store = cache.lock();
                        command.execute(&mut store, &argument)
                    };
                    // Receiver is gone if the client disconnected meanwhile.
                    let _ = reply_tx.send(reply);
                })?;

                reply_rx.await.map_err(|_| RejectReason::NotRunning)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::cache::{self, CacheStore};
    use crate::executor::ExecutorConfig;
    use crate::protocol::{command, Command};

    fn set(key: &str, value: &[u8]) -> Request {
        Request {
            command: Command::Set {
                key: key.to_string(),
                bytes: value.len(),
            },
            argument: value.to_vec(),
        }
    }

    fn get(key: &str) -> Request {
        Request {
            command: Command::Get {
                keys: vec![key.to_string()],
            },
            argument: Vec::new(),
        }
    }

    fn executor(low: usize, high: usize, queue: usize) -> Arc<TaskExecutor> {
        let executor = TaskExecutor::new(ExecutorConfig {
            name: "dispatch-test".to_string(),
            max_queue_size: queue,
            high_watermark: high,
            low_watermark: low,
            idle_timeout: Duration::from_millis(50),
        });
        executor.start().unwrap();
        Arc::new(executor)
    }

    #[tokio::test]
    async fn test_inline_dispatch() {
        let dispatcher = Dispatcher::inline(cache::shared(CacheStore::new(100)));

        assert_eq!(dispatcher.dispatch(set("k", b"v")).await.unwrap(), command::STORED);
        assert_eq!(
            dispatcher.dispatch(get("k")).await.unwrap(),
            b"VALUE k 0 1\r\nv\r\nEND\r\n"
        );
        assert!(dispatcher.executor().is_none());
    }

    #[tokio::test]
    async fn test_pooled_dispatch_shares_cache() {
        let cache = cache::shared(CacheStore::new(100));
        let dispatcher = Dispatcher::pooled(Arc::clone(&cache), executor(1, 4, 16));

        assert_eq!(dispatcher.dispatch(set("k", b"v")).await.unwrap(), command::STORED);
        assert!(cache.lock().contains("k"));
        assert_eq!(
            dispatcher.dispatch(get("k")).await.unwrap(),
            b"VALUE k 0 1\r\nv\r\nEND\r\n"
        );
    }

    #[tokio::test]
    async fn test_pooled_dispatch_after_stop_is_rejected() {
        let pool = executor(1, 1, 4);
        let dispatcher = Dispatcher::pooled(cache::shared(CacheStore::new(100)), Arc::clone(&pool));
        pool.stop(true);

        assert_eq!(
            dispatcher.dispatch(get("k")).await,
            Err(RejectReason::NotRunning)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pooled_dispatch_concurrent_writers() {
        let cache = cache::shared(CacheStore::new(10_000));
        let dispatcher = Dispatcher::pooled(Arc::clone(&cache), executor(2, 4, 1_000));

        let mut handles = Vec::new();
        for i in 0..50 {
            let dispatcher = dispatcher.clone();
            handles.push(tokio::spawn(async move {
                dispatcher.dispatch(set(&format!("key{i}"), b"value")).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), command::STORED);
        }

        assert_eq!(cache.lock().len(), 50);
    }
}
