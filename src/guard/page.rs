use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use super::error::GuardError;
use super::hydration::{wait_until_open, HydrationGate};
use crate::auth::{AccountType, AuthOutcome, Principal, RetryPolicy, SessionProbe, TransientReason};
use crate::config::GuardConfig;
use crate::navigation::Navigator;
use crate::provider::IdentityProvider;

/// Where a guarded page is in its session check.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardState {
    Idle,
    Checking { attempt: u32, max_attempts: u32 },
    Authorized(Principal),
    Forbidden { principal: Principal, required: AccountType },
    Denied,
    Degraded { reason: TransientReason, attempts: u32 },
}

impl GuardState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GuardState::Idle | GuardState::Checking { .. })
    }

    pub fn renders_protected_content(&self) -> bool {
        matches!(self, GuardState::Authorized(_))
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            GuardState::Authorized(principal) => Some(principal),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GuardState::Idle => "idle",
            GuardState::Checking { .. } => "checking",
            GuardState::Authorized(_) => "authorized",
            GuardState::Forbidden { .. } => "forbidden",
            GuardState::Denied => "denied",
            GuardState::Degraded { .. } => "degraded",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GuardOptions {
    pub login_path: String,
    pub required_account_type: Option<AccountType>,
    pub policy: RetryPolicy,
    pub attempt_timeout: Duration,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            required_account_type: None,
            policy: RetryPolicy::default(),
            attempt_timeout: Duration::from_secs(8),
        }
    }
}

impl GuardOptions {
    pub fn from_config(config: &GuardConfig) -> Self {
        Self {
            login_path: config.login_path.clone(),
            required_account_type: None,
            policy: RetryPolicy::from_config(config),
            attempt_timeout: config.attempt_timeout(),
        }
    }

    pub fn require(mut self, account_type: AccountType) -> Self {
        self.required_account_type = Some(account_type);
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    fn resolve(&self, outcome: AuthOutcome) -> GuardState {
        match outcome {
            AuthOutcome::Authenticated(principal) => match &self.required_account_type {
                Some(required) if !principal.has_account_type(required) => GuardState::Forbidden {
                    principal,
                    required: required.clone(),
                },
                _ => GuardState::Authorized(principal),
            },
            AuthOutcome::Unauthenticated => GuardState::Denied,
            AuthOutcome::TransientError(reason) => GuardState::Degraded {
                reason,
                attempts: self.policy.max_attempts(),
            },
        }
    }
}

struct Shared<N> {
    mount_id: Uuid,
    mounted: Mutex<bool>,
    state: watch::Sender<GuardState>,
    navigator: Arc<N>,
    login_path: String,
}

impl<N: Navigator> Shared<N> {
    /// The only place state changes and redirects happen. Nothing gets through after unmount.
    ///
    /// The navigator runs after the lock is released: navigating away may
    /// unmount or drop the page, which takes the same lock.
    fn publish(&self, next: GuardState) -> bool {
        let mounted = self.mounted.lock().unwrap_or_else(PoisonError::into_inner);
        if !*mounted {
            tracing::debug!(state = next.label(), "page unmounted, dropping state update");
            return false;
        }

        if next.is_terminal() {
            tracing::info!(state = next.label(), "session check settled");
        }
        let redirect = matches!(next, GuardState::Denied);
        self.state.send_replace(next);
        drop(mounted);

        if redirect {
            self.navigator.redirect_to(&self.login_path);
        }
        true
    }
}

/// Session gate for one mounted page.
///
/// Mounting spawns the check on the current tokio runtime. The check waits for
/// [`hydrate`](Self::hydrate), then probes the identity provider under the
/// configured retry policy and settles in exactly one terminal state.
/// Protected content may render only while the state is `Authorized`.
pub struct PageGuard<P, N> {
    shared: Arc<Shared<N>>,
    probe: SessionProbe<P>,
    options: GuardOptions,
    gate: HydrationGate,
    task: Option<JoinHandle<()>>,
}

impl<P, N> PageGuard<P, N>
where
    P: IdentityProvider + 'static,
    N: Navigator + 'static,
{
    /// Must be called from within a tokio runtime.
    pub fn mount(provider: Arc<P>, navigator: Arc<N>, options: GuardOptions) -> Self {
        let (state, _) = watch::channel(GuardState::Idle);
        let shared = Arc::new(Shared {
            mount_id: Uuid::new_v4(),
            mounted: Mutex::new(true),
            state,
            navigator,
            login_path: options.login_path.clone(),
        });
        let probe = SessionProbe::new(provider, options.attempt_timeout);

        let mut guard = Self {
            shared,
            probe,
            options,
            gate: HydrationGate::new(),
            task: None,
        };
        tracing::debug!(mount = %guard.shared.mount_id, "page guard mounted");
        guard.spawn_check();
        guard
    }

    /// Retry affordance for the degraded state.
    pub fn retry(&mut self) -> Result<(), GuardError> {
        if !self.is_mounted() {
            return Err(GuardError::Unmounted);
        }
        let current = self.state();
        if !matches!(current, GuardState::Degraded { .. }) {
            return Err(GuardError::NotDegraded(current.label()));
        }

        tracing::info!(mount = %self.shared.mount_id, "retrying session check");
        // leave Degraded before the task is scheduled so settled() waits for the new run
        self.shared.publish(GuardState::Checking {
            attempt: 1,
            max_attempts: self.options.policy.max_attempts(),
        });
        self.spawn_check();
        Ok(())
    }

    fn spawn_check(&mut self) {
        let shared = Arc::clone(&self.shared);
        let probe = self.probe.clone();
        let options = self.options.clone();
        let mut hydrated = self.gate.subscribe();
        let span = tracing::debug_span!("page_guard", mount = %self.shared.mount_id);

        let task = tokio::spawn(
            async move {
                if !wait_until_open(&mut hydrated).await {
                    return;
                }

                let max_attempts = options.policy.max_attempts();
                let outcome = options
                    .policy
                    .run_observed(&probe, |attempt| {
                        shared.publish(GuardState::Checking { attempt, max_attempts });
                    })
                    .await;

                shared.publish(options.resolve(outcome));
            }
            .instrument(span),
        );
        self.task = Some(task);
    }
}

impl<P, N> PageGuard<P, N> {
    pub fn mount_id(&self) -> Uuid {
        self.shared.mount_id
    }

    pub fn hydration(&self) -> &HydrationGate {
        &self.gate
    }

    /// Signal that persisted client state is restored; the check starts now.
    pub fn hydrate(&self) -> bool {
        self.gate.open()
    }

    pub fn state(&self) -> GuardState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GuardState> {
        self.shared.state.subscribe()
    }

    pub fn principal(&self) -> Option<Principal> {
        self.shared.state.borrow().principal().cloned()
    }

    pub fn is_mounted(&self) -> bool {
        *self.shared.mounted.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for a terminal state. On an unmounted guard returns the frozen state.
    pub async fn settled(&self) -> GuardState {
        if !self.is_mounted() {
            return self.state();
        }
        let mut rx = self.subscribe();
        let settled = rx.wait_for(GuardState::is_terminal).await.map(|state| state.clone());
        match settled {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }

    /// Stop the check. Pending probes and timers are cancelled and no later
    /// state update or redirect can happen. Idempotent.
    pub fn unmount(&mut self) {
        {
            let mut mounted = self.shared.mounted.lock().unwrap_or_else(PoisonError::into_inner);
            if !*mounted {
                return;
            }
            *mounted = false;
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        tracing::debug!(mount = %self.shared.mount_id, "page guard unmounted");
    }
}

impl<P, N> Drop for PageGuard<P, N> {
    fn drop(&mut self) {
        self.unmount();
    }
}
