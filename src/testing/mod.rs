use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::auth::Principal;
use crate::navigation::Navigator;
use crate::provider::{IdentityProvider, ProviderError};

#[derive(Debug, Clone)]
struct Step {
    delay: Option<Duration>,
    result: Result<Principal, ProviderError>,
}

/// Identity provider that replays a fixed script of answers.
///
/// Once the script runs out the last step repeats, so `always(..)` is just a
/// one-step script.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicU32,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn always(result: Result<Principal, ProviderError>) -> Self {
        Self::new().then(result)
    }

    pub fn then(self, result: Result<Principal, ProviderError>) -> Self {
        self.push(Step { delay: None, result })
    }

    /// Answer only after `delay` has passed on the tokio clock.
    pub fn then_after(self, delay: Duration, result: Result<Principal, ProviderError>) -> Self {
        self.push(Step {
            delay: Some(delay),
            result,
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn push(self, step: Step) -> Self {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(step);
        self
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap_or_else(PoisonError::into_inner);
        match steps.len() {
            0 => Step {
                delay: None,
                result: Err(ProviderError::NoSession),
            },
            1 => steps[0].clone(),
            _ => steps.pop_front().expect("non-empty script"),
        }
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    async fn current_principal(&self) -> Result<Principal, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.next_step();
        if let Some(delay) = step.delay {
            tokio::time::sleep(delay).await;
        }
        step.result
    }
}

/// Navigator that only remembers where it was sent.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to(&self, path: &str) {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}
