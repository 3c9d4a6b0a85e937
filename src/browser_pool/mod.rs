//! Browser pool (C5): own exactly one headless browser process at a time.
//!
//! State machine per spec §4.5: `none | launching(future) | ready(handle)`.
//! Concurrent `acquire()` calls during a cold start all await the same
//! in-flight launch; once the browser has served `budget` requests the next
//! `acquire()` recycles it. A disconnect event only clears state if the
//! disconnected handle is still the current one — stale disconnects from an
//! already-replaced browser must not clobber a newer handle.
//!
//! Reuses `browser_setup::launch_browser` and
//! `browser_profile::create_unique_profile_with_prefix` for the actual
//! process spawn, the way the teacher's pool does, but replaces the
//! multi-instance scaling model with the single-browser-with-budget model
//! the spec calls for.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chromiumoxide::browser::Browser;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::browser_profile::{self, BrowserProfile};
use crate::browser_setup;

/// A live, owned browser process plus its background event-handler task and
/// the sidecar task that watches it for a genuine disconnect.
pub struct BrowserHandle {
    id: u64,
    browser: Arc<Browser>,
    handler_abort: AbortHandle,
    watcher: JoinHandle<()>,
    _profile: BrowserProfile,
}

impl BrowserHandle {
    /// Identity used to distinguish this handle from a subsequent one, so a
    /// stale disconnect event can be told apart from a current one.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn browser(&self) -> Arc<Browser> {
        Arc::clone(&self.browser)
    }
}

impl Drop for BrowserHandle {
    fn drop(&mut self) {
        // Order matters: abort the CDP event-draining task first so the
        // watcher observes a cancellation rather than a natural completion
        // and does not mistake this intentional teardown for a disconnect.
        self.handler_abort.abort();
        self.watcher.abort();
    }
}

enum State {
    None,
    Launching(Arc<tokio::sync::Mutex<()>>),
    Ready(Arc<BrowserHandle>, u64),
}

/// Process-wide singleton browser owner.
pub struct BrowserPool {
    state: Mutex<State>,
    next_id: AtomicU64,
    budget: u64,
    headless: bool,
}

impl BrowserPool {
    #[must_use]
    pub fn new(budget: u64, headless: bool) -> Self {
        Self {
            state: Mutex::new(State::None),
            next_id: AtomicU64::new(1),
            budget: budget.max(1),
            headless,
        }
    }

    /// Acquire the current browser handle, launching one if necessary and
    /// recycling it if its request budget has been exhausted.
    pub async fn acquire(self: &Arc<Self>) -> Result<Arc<BrowserHandle>> {
        loop {
            let launching_lock = {
                let mut guard = self.state.lock().await;
                match &*guard {
                    State::Ready(handle, served) if *served >= self.budget => {
                        info!(
                            browser_id = handle.id(),
                            served = *served,
                            "browser request budget exhausted, recycling"
                        );
                        let old = std::mem::replace(&mut *guard, State::None);
                        drop(guard);
                        if let State::Ready(handle, _) = old {
                            // Fire-and-forget close; dropping aborts the handler task.
                            drop(handle);
                        }
                        continue;
                    }
                    State::Ready(handle, served) => {
                        let handle = Arc::clone(handle);
                        let served = served + 1;
                        *guard = State::Ready(Arc::clone(&handle), served);
                        return Ok(handle);
                    }
                    State::Launching(lock) => Arc::clone(lock),
                    State::None => {
                        let lock = Arc::new(tokio::sync::Mutex::new(()));
                        *guard = State::Launching(Arc::clone(&lock));
                        lock
                    }
                }
            };

            // Only the task that transitioned None->Launching holds the
            // lock unlocked; everyone else blocks here until it resolves.
            let _permit = launching_lock.lock().await;

            // Re-check state: either another task already finished the
            // launch (state is Ready) while we waited on the launch lock,
            // or we are the one holding the launch lock and must do it.
            let mut guard = self.state.lock().await;
            let is_launcher = matches!(&*guard, State::Launching(lock) if Arc::ptr_eq(lock, &launching_lock));

            if let State::Ready(handle, served) = &mut *guard {
                *served += 1;
                return Ok(Arc::clone(handle));
            }

            if is_launcher {
                drop(guard);
                let result = self.launch_one().await;
                let mut guard = self.state.lock().await;
                return match result {
                    Ok(handle) => {
                        let handle = Arc::new(handle);
                        *guard = State::Ready(Arc::clone(&handle), 1);
                        Ok(handle)
                    }
                    Err(err) => {
                        *guard = State::None;
                        Err(err)
                    }
                };
            }
        }
    }

    async fn launch_one(self: &Arc<Self>) -> Result<BrowserHandle> {
        let profile = browser_profile::create_unique_profile_with_prefix("citescrape_chrome")
            .context("failed to allocate browser profile directory")?;
        let profile_path: PathBuf = profile.path().to_path_buf();

        let (browser, handler, _) = browser_setup::launch_browser(self.headless, Some(profile_path))
            .await
            .context("failed to launch browser")?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        info!(browser_id = id, "launched new browser process");

        // `handler` drains chromiumoxide's CDP event stream and returns when
        // the WS connection closes, which happens on both an intentional
        // abort (recycle/close) and a genuine browser-side disconnect. The
        // watcher distinguishes the two: an aborted `handler` resolves with
        // `Err`, a natural stream-end resolves with `Ok(())`, only the
        // latter is reported to the pool (spec §4.5, §5).
        let handler_abort = handler.abort_handle();
        let pool = Arc::clone(self);
        let watcher = tokio::spawn(async move {
            if let Ok(()) = handler.await {
                pool.on_disconnect(id).await;
            }
        });

        Ok(BrowserHandle {
            id,
            browser: Arc::new(browser),
            handler_abort,
            watcher,
            _profile: profile,
        })
    }

    /// Handle a disconnect event. Only clears state if `disconnected_id`
    /// still matches the current handle — a disconnect from a browser that
    /// was already recycled must not clobber a newer one.
    pub async fn on_disconnect(&self, disconnected_id: u64) {
        let mut guard = self.state.lock().await;
        if let State::Ready(handle, _) = &*guard
            && handle.id() == disconnected_id
        {
            warn!(browser_id = disconnected_id, "browser disconnected, clearing pool state");
            *guard = State::None;
        } else {
            debug!(
                browser_id = disconnected_id,
                "ignoring stale disconnect event for a non-current browser"
            );
        }
    }

    /// Gracefully shut down the current browser, if any, and reset to `none`.
    pub async fn close(&self) {
        let mut guard = self.state.lock().await;
        let old = std::mem::replace(&mut *guard, State::None);
        drop(guard);

        let State::Ready(handle, _) = old else {
            return;
        };

        match Arc::try_unwrap(handle) {
            Ok(mut handle) => match Arc::get_mut(&mut handle.browser) {
                Some(browser) => {
                    if let Err(err) = browser.close().await {
                        warn!(browser_id = handle.id, error = %err, "failed to close browser gracefully");
                    } else if let Err(err) = browser.wait().await {
                        debug!(browser_id = handle.id, error = %err, "browser process wait failed after close");
                    }
                }
                None => {
                    warn!(
                        browser_id = handle.id,
                        "browser has outstanding context references, skipping graceful close"
                    );
                }
            },
            Err(handle) => {
                warn!(
                    browser_id = handle.id(),
                    "browser handle has outstanding references, skipping graceful close"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // These tests exercise the state-machine transitions without actually
    // launching a browser process, by constructing the pool and driving
    // concurrent disconnect/recycle logic against synthetic handles would
    // require a live chromiumoxide::Browser; the acquire() path itself is
    // covered at the integration level. Here we test the parts that don't
    // require an actual browser: budget clamping and id monotonicity.

    #[test]
    fn budget_is_clamped_to_at_least_one() {
        let pool = BrowserPool::new(0, true);
        assert_eq!(pool.budget, 1);
    }

    #[test]
    fn ids_are_monotonically_increasing() {
        let pool = BrowserPool::new(10, true);
        let counter = AtomicUsize::new(0);
        for _ in 0..5 {
            let id = pool.next_id.fetch_add(1, Ordering::SeqCst);
            assert!(id >= counter.load(Ordering::SeqCst) as u64);
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}
