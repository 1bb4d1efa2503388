use tokio::sync::watch;

/// One-shot latch that holds back the session check until the host has
/// restored its persisted client state.
///
/// Starts closed, opens exactly once, never closes again. Each mount gets its
/// own gate.
#[derive(Debug)]
pub struct HydrationGate {
    open: watch::Sender<bool>,
}

impl Default for HydrationGate {
    fn default() -> Self {
        Self::new()
    }
}

impl HydrationGate {
    pub fn new() -> Self {
        let (open, _) = watch::channel(false);
        Self { open }
    }

    /// Flip the gate. Returns `true` only for the call that actually opened it.
    pub fn open(&self) -> bool {
        let flipped = self.open.send_if_modified(|open| {
            if *open {
                false
            } else {
                *open = true;
                true
            }
        });
        if flipped {
            tracing::debug!("hydration gate opened");
        }
        flipped
    }

    pub fn is_open(&self) -> bool {
        *self.open.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.open.subscribe()
    }

    /// Resolve once the gate is open (immediately if it already is).
    pub async fn opened(&self) {
        let mut rx = self.subscribe();
        // the sender lives in `self`, so this cannot observe a closed channel
        let _ = rx.wait_for(|open| *open).await;
    }
}

/// Wait on a receiver obtained from [`HydrationGate::subscribe`].
///
/// Returns `false` if the gate was dropped without ever opening.
pub(crate) async fn wait_until_open(rx: &mut watch::Receiver<bool>) -> bool {
    rx.wait_for(|open| *open).await.is_ok()
}
