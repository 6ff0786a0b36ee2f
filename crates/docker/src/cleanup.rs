//! Container cleanup
//!
//! Every delegated call runs in a throwaway container. Containers started
//! from the b2 image can outlive the call when the client is interrupted, so
//! the section of the program that starts them is wrapped in
//! [`with_cleanup`], which sweeps them away exactly once however that section
//! ends, including on SIGINT/SIGTERM and on panic.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use b2u_core::ContainerRuntime;

/// Outcome of a cleanup sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Containers found for the image
    pub found: usize,
    /// Containers removed
    pub removed: usize,
    /// Runtime calls that failed
    pub failed: usize,
}

impl SweepReport {
    /// Whether every runtime call of the sweep succeeded
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Finds and removes containers created from an image
pub struct Janitor<'a, R: ?Sized> {
    runtime: &'a R,
    image: &'a str,
}

impl<'a, R: ContainerRuntime + ?Sized> Janitor<'a, R> {
    pub fn new(runtime: &'a R, image: &'a str) -> Self {
        Self { runtime, image }
    }

    /// Stop and remove every container of the image
    ///
    /// Failures are logged and counted, never returned; finding nothing is a
    /// no-op.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();

        let ids = match self.runtime.list_by_ancestor(self.image).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(
                    image = %self.image,
                    error = %e,
                    "could not list containers for cleanup"
                );
                report.failed += 1;
                return report;
            }
        };
        report.found = ids.len();

        for id in &ids {
            if let Err(e) = self.runtime.stop(id).await {
                tracing::debug!(container = %id, error = %e, "stop failed, removing anyway");
            }
            match self.runtime.remove(id).await {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    tracing::warn!(container = %id, error = %e, "could not remove container");
                    report.failed += 1;
                }
            }
        }

        if report.found > 0 {
            tracing::info!(
                image = %self.image,
                removed = report.removed,
                failed = report.failed,
                "cleaned up containers"
            );
        } else {
            tracing::debug!(image = %self.image, "no containers to clean up");
        }
        report
    }
}

/// How a cleanup-scoped section ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scoped<T> {
    /// The section ran to completion and produced a value
    Completed(T),
    /// A termination signal arrived first
    Interrupted,
}

/// Run `body`, then sweep containers of `image` exactly once
///
/// If `interrupt` resolves first, `body` is dropped (which kills any
/// in-flight runtime client) and the sweep still runs before
/// [`Scoped::Interrupted`] is returned. A panic in `body` is resumed after
/// the sweep.
///
/// A terminal Ctrl+C reaches the runtime client too, so `body` may fail in
/// the same wakeup that `interrupt` resolves; the interrupt wins.
pub async fn with_cleanup<R, F, S>(
    runtime: &R,
    image: &str,
    body: F,
    interrupt: S,
) -> (Scoped<F::Output>, SweepReport)
where
    R: ContainerRuntime + ?Sized,
    F: Future,
    S: Future<Output = ()>,
{
    let outcome = tokio::select! {
        biased;
        () = interrupt => None,
        result = AssertUnwindSafe(body).catch_unwind() => Some(result),
    };

    if outcome.is_none() {
        tracing::warn!("interrupted, cleaning up containers");
    }
    let sweep = Janitor::new(runtime, image).sweep().await;

    match outcome {
        Some(Ok(value)) => (Scoped::Completed(value), sweep),
        Some(Err(panic)) => std::panic::resume_unwind(panic),
        None => (Scoped::Interrupted, sweep),
    }
}

/// Resolves on the first SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
