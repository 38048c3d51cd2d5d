use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use super::domain::{
    ActiveMatchView, EngagedCouple, EngagedCoupleId, Generation, MatchId, MentorCouple,
    MentorCoupleId, MentorshipMatch,
};
use super::gateway::{GatewayError, PersistenceGateway};

/// Point-in-time copy of every table held by [`InMemoryGateway`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub engaged_couples: Vec<EngagedCouple>,
    pub mentor_couples: Vec<MentorCouple>,
    pub matches: Vec<MentorshipMatch>,
    pub generation: Generation,
}

impl StoreSnapshot {
    pub fn active_mentors(&self) -> impl Iterator<Item = &MentorCouple> {
        self.mentor_couples.iter().filter(|mentor| mentor.active)
    }

    pub fn active_matches(&self) -> impl Iterator<Item = &MentorshipMatch> {
        self.matches.iter().filter(|record| record.active)
    }
}

/// Process-local store used by the default server wiring, the demo command, and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryGateway {
    state: Arc<Mutex<StoreSnapshot>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, StoreSnapshot> {
        self.state.lock().expect("store mutex poisoned")
    }
}

fn next_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn list_engaged_couples(&self) -> Result<Vec<EngagedCouple>, GatewayError> {
        Ok(self.lock().engaged_couples.clone())
    }

    async fn create_engaged_couple(&self, name: &str) -> Result<EngagedCouple, GatewayError> {
        let mut guard = self.lock();
        if guard.engaged_couples.iter().any(|couple| couple.name == name) {
            return Err(GatewayError::ConstraintViolation(format!(
                "engaged couple '{name}' already exists"
            )));
        }

        let couple = EngagedCouple {
            id: EngagedCoupleId(next_id()),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        guard.engaged_couples.push(couple.clone());
        Ok(couple)
    }

    async fn find_engaged_couple_by_name(
        &self,
        name: &str,
    ) -> Result<EngagedCouple, GatewayError> {
        self.lock()
            .engaged_couples
            .iter()
            .find(|couple| couple.name == name)
            .cloned()
            .ok_or(GatewayError::NotFound)
    }

    async fn deactivate_all_active_matches(&self) -> Result<(), GatewayError> {
        let mut guard = self.lock();
        for record in guard.matches.iter_mut().filter(|record| record.active) {
            record.active = false;
        }
        Ok(())
    }

    async fn deactivate_all_active_mentors(&self) -> Result<(), GatewayError> {
        let mut guard = self.lock();
        for mentor in guard.mentor_couples.iter_mut().filter(|mentor| mentor.active) {
            mentor.active = false;
        }
        Ok(())
    }

    async fn open_generation(&self) -> Result<Generation, GatewayError> {
        let mut guard = self.lock();
        guard.generation = guard.generation.next();
        Ok(guard.generation)
    }

    async fn create_mentor_couple(
        &self,
        name: &str,
        capacity: u32,
        generation: Generation,
    ) -> Result<MentorCouple, GatewayError> {
        let mentor = MentorCouple {
            id: MentorCoupleId(next_id()),
            name: name.to_string(),
            capacity,
            active: true,
            generation,
            created_at: Utc::now(),
        };
        self.lock().mentor_couples.push(mentor.clone());
        Ok(mentor)
    }

    async fn create_match(
        &self,
        engaged_couple_id: &EngagedCoupleId,
        mentor_couple_id: &MentorCoupleId,
        generation: Generation,
    ) -> Result<MentorshipMatch, GatewayError> {
        let mut guard = self.lock();
        if !guard
            .engaged_couples
            .iter()
            .any(|couple| &couple.id == engaged_couple_id)
        {
            return Err(GatewayError::ConstraintViolation(format!(
                "unknown engaged couple id {}",
                engaged_couple_id.0
            )));
        }
        if !guard
            .mentor_couples
            .iter()
            .any(|mentor| &mentor.id == mentor_couple_id)
        {
            return Err(GatewayError::ConstraintViolation(format!(
                "unknown mentor couple id {}",
                mentor_couple_id.0
            )));
        }

        let record = MentorshipMatch {
            id: MatchId(next_id()),
            engaged_couple_id: engaged_couple_id.clone(),
            mentor_couple_id: mentor_couple_id.clone(),
            matched_at: Utc::now(),
            active: true,
            generation,
        };
        guard.matches.push(record.clone());
        Ok(record)
    }

    async fn list_active_mentors(&self) -> Result<Vec<MentorCouple>, GatewayError> {
        let guard = self.lock();
        let latest = guard.generation;
        Ok(guard
            .mentor_couples
            .iter()
            .filter(|mentor| mentor.active && mentor.generation == latest)
            .cloned()
            .collect())
    }

    async fn list_active_matches_joined(&self) -> Result<Vec<ActiveMatchView>, GatewayError> {
        let guard = self.lock();
        let latest = guard.generation;

        let rows = guard
            .matches
            .iter()
            .filter(|record| record.active && record.generation == latest)
            .filter_map(|record| {
                let engaged = guard
                    .engaged_couples
                    .iter()
                    .find(|couple| couple.id == record.engaged_couple_id);
                let mentor = guard
                    .mentor_couples
                    .iter()
                    .find(|mentor| mentor.id == record.mentor_couple_id);
                match (engaged, mentor) {
                    (Some(engaged), Some(mentor)) => Some(ActiveMatchView {
                        engaged_name: engaged.name.clone(),
                        mentor_name: mentor.name.clone(),
                        mentor_capacity: mentor.capacity,
                    }),
                    _ => {
                        warn!(match_id = %record.id.0, "active match references a missing couple; skipped");
                        None
                    }
                }
            })
            .collect();

        Ok(rows)
    }
}
