use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::draw::domain::{
    ActiveMatchView, EngagedCouple, EngagedCoupleId, Generation, MentorCouple, MentorCoupleId,
    MentorRequest, MentorshipMatch,
};
use crate::draw::gateway::{GatewayError, PersistenceGateway};
use crate::draw::memory::InMemoryGateway;
use crate::draw::orchestrator::{DrawOrchestrator, DrawRules};

pub(super) const SEED: u64 = 42;

pub(super) fn engaged_names() -> Vec<String> {
    ["Ana&Bruno", "Carla&Diego", "Eva&Fabio", "Gui&Helo"]
        .into_iter()
        .map(String::from)
        .collect()
}

pub(super) fn two_mentors() -> Vec<MentorRequest> {
    vec![MentorRequest::new("M1", 2), MentorRequest::new("M2", 2)]
}

pub(super) async fn seeded_store(names: &[String]) -> Arc<InMemoryGateway> {
    let store = Arc::new(InMemoryGateway::new());
    for name in names {
        store
            .create_engaged_couple(name)
            .await
            .expect("seed engaged couple");
    }
    store
}

pub(super) fn orchestrator<G: PersistenceGateway + 'static>(gateway: Arc<G>) -> DrawOrchestrator<G> {
    DrawOrchestrator::seeded(gateway, DrawRules::default(), SEED)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum Op {
    ListEngaged,
    FindByName,
    DeactivateMatches,
    DeactivateMentors,
    CreateMentor,
    CreateMatch,
}

/// In-memory store that fails the n-th call (1-based) of one operation.
pub(super) struct FlakyGateway {
    pub(super) inner: InMemoryGateway,
    fail_on: Option<(Op, usize, GatewayError)>,
    calls: Mutex<HashMap<Op, usize>>,
}

impl FlakyGateway {
    pub(super) fn new(inner: InMemoryGateway, op: Op, nth: usize, error: GatewayError) -> Self {
        Self {
            inner,
            fail_on: Some((op, nth, error)),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub(super) fn calls(&self, op: Op) -> usize {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    fn record(&self, op: Op) -> Result<(), GatewayError> {
        let mut calls = self.calls.lock().expect("calls mutex poisoned");
        let count = calls.entry(op).or_insert(0);
        *count += 1;
        match &self.fail_on {
            Some((target, nth, error)) if *target == op && *nth == *count => Err(error.clone()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl PersistenceGateway for FlakyGateway {
    async fn list_engaged_couples(&self) -> Result<Vec<EngagedCouple>, GatewayError> {
        self.record(Op::ListEngaged)?;
        self.inner.list_engaged_couples().await
    }

    async fn create_engaged_couple(&self, name: &str) -> Result<EngagedCouple, GatewayError> {
        self.inner.create_engaged_couple(name).await
    }

    async fn find_engaged_couple_by_name(
        &self,
        name: &str,
    ) -> Result<EngagedCouple, GatewayError> {
        self.record(Op::FindByName)?;
        self.inner.find_engaged_couple_by_name(name).await
    }

    async fn deactivate_all_active_matches(&self) -> Result<(), GatewayError> {
        self.record(Op::DeactivateMatches)?;
        self.inner.deactivate_all_active_matches().await
    }

    async fn deactivate_all_active_mentors(&self) -> Result<(), GatewayError> {
        self.record(Op::DeactivateMentors)?;
        self.inner.deactivate_all_active_mentors().await
    }

    async fn open_generation(&self) -> Result<Generation, GatewayError> {
        self.inner.open_generation().await
    }

    async fn create_mentor_couple(
        &self,
        name: &str,
        capacity: u32,
        generation: Generation,
    ) -> Result<MentorCouple, GatewayError> {
        self.record(Op::CreateMentor)?;
        self.inner
            .create_mentor_couple(name, capacity, generation)
            .await
    }

    async fn create_match(
        &self,
        engaged_couple_id: &EngagedCoupleId,
        mentor_couple_id: &MentorCoupleId,
        generation: Generation,
    ) -> Result<MentorshipMatch, GatewayError> {
        self.record(Op::CreateMatch)?;
        self.inner
            .create_match(engaged_couple_id, mentor_couple_id, generation)
            .await
    }

    async fn list_active_mentors(&self) -> Result<Vec<MentorCouple>, GatewayError> {
        self.inner.list_active_mentors().await
    }

    async fn list_active_matches_joined(&self) -> Result<Vec<ActiveMatchView>, GatewayError> {
        self.inner.list_active_matches_joined().await
    }
}
