//! Recording collaborators for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use vigil_core::{
    Controller, ExecOutput, Executor, Notice, NotifyError, Prober, RemediationError,
    ResolveError, Resolver, TargetId,
};

use crate::engine::Collaborators;

#[derive(Default)]
pub struct FakeResolver {
    addresses: Mutex<HashMap<TargetId, String>>,
    unavailable_for: Mutex<HashMap<TargetId, u32>>,
    erroring: Mutex<Vec<TargetId>>,
    calls: Mutex<HashMap<TargetId, u32>>,
}

impl FakeResolver {
    pub fn set_address(&self, id: &str, address: &str) {
        self.addresses
            .lock()
            .unwrap()
            .insert(TargetId::from(id), address.to_string());
    }

    /// The next `polls` lookups for `id` report no address.
    pub fn unavailable_for(&self, id: &str, polls: u32) {
        self.unavailable_for
            .lock()
            .unwrap()
            .insert(TargetId::from(id), polls);
    }

    pub fn fail_lookups(&self, id: &str) {
        self.erroring.lock().unwrap().push(TargetId::from(id));
    }

    pub fn calls(&self, id: &str) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(&TargetId::from(id))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Resolver for FakeResolver {
    async fn resolve(&self, target_id: &TargetId) -> Result<Option<String>, ResolveError> {
        *self.calls.lock().unwrap().entry(target_id.clone()).or_default() += 1;

        if self.erroring.lock().unwrap().contains(target_id) {
            return Err(ResolveError("throttled".into()));
        }
        if let Some(left) = self.unavailable_for.lock().unwrap().get_mut(target_id) {
            if *left > 0 {
                *left -= 1;
                return Ok(None);
            }
        }
        Ok(self.addresses.lock().unwrap().get(target_id).cloned())
    }
}

/// Answers from a per-address script, then `true` once the script runs out.
#[derive(Default)]
pub struct FakeProber {
    scripts: Mutex<HashMap<String, VecDeque<bool>>>,
    panics_on: Mutex<Option<String>>,
    probed: Mutex<Vec<String>>,
}

impl FakeProber {
    pub fn script(&self, address: &str, results: &[bool]) {
        self.scripts
            .lock()
            .unwrap()
            .insert(address.to_string(), results.iter().copied().collect());
    }

    pub fn panic_on(&self, address: &str) {
        *self.panics_on.lock().unwrap() = Some(address.to_string());
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe(&self, address: &str) -> bool {
        if self.panics_on.lock().unwrap().as_deref() == Some(address) {
            panic!("prober blew up on {address}");
        }
        self.probed.lock().unwrap().push(address.to_string());
        self.scripts
            .lock()
            .unwrap()
            .get_mut(address)
            .and_then(VecDeque::pop_front)
            .unwrap_or(true)
    }

    fn endpoint(&self, address: &str) -> String {
        format!("http://{address}:8080/")
    }
}

#[derive(Default)]
pub struct FakeExecutor {
    commands: Mutex<Vec<(String, String)>>,
    fail: Mutex<bool>,
}

impl FakeExecutor {
    pub fn fail_all(&self) {
        *self.fail.lock().unwrap() = true;
    }

    pub fn commands(&self) -> Vec<(String, String)> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn exec(&self, address: &str, command: &str) -> Result<ExecOutput, RemediationError> {
        self.commands
            .lock()
            .unwrap()
            .push((address.to_string(), command.to_string()));
        if *self.fail.lock().unwrap() {
            return Err(RemediationError::Connect {
                address: address.to_string(),
                reason: "connection refused".into(),
            });
        }
        Ok(ExecOutput::default())
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    sent: Mutex<Vec<Notice>>,
    failing_body: Mutex<Option<String>>,
}

impl FakeNotifier {
    /// Reject notices whose body mentions `needle`.
    pub fn fail_when_body_contains(&self, needle: &str) {
        *self.failing_body.lock().unwrap() = Some(needle.to_string());
    }

    pub fn sent(&self) -> Vec<Notice> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|n| n.subject).collect()
    }
}

#[async_trait]
impl vigil_core::Notifier for FakeNotifier {
    async fn notify(&self, notice: &Notice) -> Result<(), NotifyError> {
        if let Some(needle) = self.failing_body.lock().unwrap().as_deref() {
            if notice.body.contains(needle) {
                return Err(NotifyError::Transport("421 service not available".into()));
            }
        }
        self.sent.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeController {
    starts: Mutex<Vec<TargetId>>,
    reboots: Mutex<Vec<TargetId>>,
    fail: Mutex<bool>,
}

impl FakeController {
    pub fn fail_all(&self) {
        *self.fail.lock().unwrap() = true;
    }

    pub fn starts(&self) -> Vec<TargetId> {
        self.starts.lock().unwrap().clone()
    }

    pub fn reboots(&self) -> Vec<TargetId> {
        self.reboots.lock().unwrap().clone()
    }

    fn outcome(&self) -> Result<(), RemediationError> {
        if *self.fail.lock().unwrap() {
            Err(RemediationError::ControlPlane("IncorrectInstanceState".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Controller for FakeController {
    async fn start(&self, target_id: &TargetId) -> Result<(), RemediationError> {
        self.starts.lock().unwrap().push(target_id.clone());
        self.outcome()
    }

    async fn reboot(&self, target_id: &TargetId) -> Result<(), RemediationError> {
        self.reboots.lock().unwrap().push(target_id.clone());
        self.outcome()
    }
}

/// One of each fake, shared with the engine under test.
#[derive(Default, Clone)]
pub struct Fakes {
    pub resolver: Arc<FakeResolver>,
    pub prober: Arc<FakeProber>,
    pub executor: Arc<FakeExecutor>,
    pub notifier: Arc<FakeNotifier>,
    pub controller: Arc<FakeController>,
}

impl Fakes {
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            resolver: self.resolver.clone(),
            prober: self.prober.clone(),
            executor: self.executor.clone(),
            notifier: self.notifier.clone(),
            controller: self.controller.clone(),
        }
    }
}
