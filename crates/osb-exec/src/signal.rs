//! A cheaply-cloneable, async-awaitable boolean flag used for
//! `cancel_signal` and `complete_signal`. Backed by a
//! `tokio::sync::watch` channel so a suspended executor wakes promptly as
//! soon as the flag flips, rather than polling.

use tokio::sync::watch;

#[derive(Clone)]
pub struct Signal {
    tx: std::sync::Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Signal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
            rx,
        }
    }

    /// Sets the flag. Idempotent; every suspended waiter wakes.
    pub fn set(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_set(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves immediately if already set; otherwise waits for `set`.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_resolves_immediately_once_set() {
        let signal = Signal::new();
        signal.set();
        tokio::time::timeout(Duration::from_millis(50), signal.wait())
        .await
        .expect("wait should resolve immediately");
    }

    #[tokio::test]
    async fn a_waiter_wakes_promptly_when_set_from_elsewhere() {
        let signal = Signal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move {
                waiter.wait().await;
            });
        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.set();
        tokio::time::timeout(Duration::from_millis(50), handle)
        .await
        .expect("waiter task should finish")
        .expect("task should not panic");
    }

    #[test]
    fn not_set_by_default() {
        let signal = Signal::new();
        assert!(!signal.is_set());
    }
}
