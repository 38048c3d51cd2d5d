use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::assignment::assign;
use super::capacity::{validate_capacity, CapacityMismatch};
use super::domain::{
    DrawResultView, EngagedCouple, Generation, MentorAssignment, MentorRequest, MentorResultView,
};
use super::gateway::{GatewayError, PersistenceGateway};
use super::intake::{IntakeError, IntakeRules};

/// Limits applied to admin input before a draw or intake touches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRules {
    pub max_mentors: usize,
    pub intake: IntakeRules,
}

impl Default for DrawRules {
    fn default() -> Self {
        Self {
            max_mentors: 10,
            intake: IntakeRules::default(),
        }
    }
}

/// Position in the draw state machine, reported with every store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawStage {
    Fetching,
    Validating,
    Assigning,
    Deactivating,
    Persisting,
    Complete,
}

impl DrawStage {
    pub fn label(&self) -> &'static str {
        match self {
            DrawStage::Fetching => "fetching engaged couples",
            DrawStage::Validating => "validating capacities",
            DrawStage::Assigning => "assigning couples",
            DrawStage::Deactivating => "deactivating previous draw",
            DrawStage::Persisting => "persisting new draw",
            DrawStage::Complete => "complete",
        }
    }
}

impl fmt::Display for DrawStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Side effects a draw had already committed when it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrawProgress {
    pub matches_deactivated: bool,
    pub mentors_deactivated: bool,
    pub mentors_written: usize,
    pub matches_written: usize,
}

impl DrawProgress {
    pub fn touched_store(&self) -> bool {
        self.matches_deactivated || self.mentors_deactivated || self.mentors_written > 0
    }
}

/// Result of a completed draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawOutcome {
    pub generation: Generation,
    pub assignments: Vec<MentorAssignment>,
    pub matches_written: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum DrawError {
    #[error(transparent)]
    CapacityMismatch(#[from] CapacityMismatch),
    #[error("at least one named mentor couple is required")]
    NoMentors,
    #[error("at most {maximum} mentor couples can take part in a draw, got {provided}")]
    TooManyMentors { maximum: usize, provided: usize },
    #[error("mentor couple '{0}' appears more than once")]
    DuplicateMentor(String),
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error("engaged couple '{name}' could not be resolved; the draw was aborted")]
    EngagedCoupleNotFound { name: String, progress: DrawProgress },
    #[error("draw failed while {stage}: {source}")]
    Store {
        stage: DrawStage,
        progress: DrawProgress,
        source: GatewayError,
    },
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl DrawError {
    /// True when the store was mutated before the failure and a full re-run is needed.
    pub fn is_partial(&self) -> bool {
        match self {
            DrawError::Store { progress, .. } | DrawError::EngagedCoupleNotFound { progress, .. } => {
                progress.touched_store()
            }
            _ => false,
        }
    }
}

fn store_failure(stage: DrawStage, progress: DrawProgress, source: GatewayError) -> DrawError {
    warn!(%stage, ?progress, error = %source, "draw aborted");
    DrawError::Store {
        stage,
        progress,
        source,
    }
}

/// Coordinates intake, the randomized draw, and the read-back of the active generation.
///
/// Every store call is awaited before the next is issued. Nothing is retried or rolled back:
/// a failure after deactivation leaves a partial generation that the next full draw supersedes.
pub struct DrawOrchestrator<G> {
    gateway: Arc<G>,
    rules: DrawRules,
    rng: Mutex<StdRng>,
}

impl<G> DrawOrchestrator<G>
where
    G: PersistenceGateway + 'static,
{
    pub fn new(gateway: Arc<G>, rules: DrawRules) -> Self {
        Self::with_rng(gateway, rules, StdRng::from_os_rng())
    }

    pub fn seeded(gateway: Arc<G>, rules: DrawRules, seed: u64) -> Self {
        Self::with_rng(gateway, rules, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(gateway: Arc<G>, rules: DrawRules, rng: StdRng) -> Self {
        Self {
            gateway,
            rules,
            rng: Mutex::new(rng),
        }
    }

    /// Register a batch of engaged couples, one store call per name.
    pub async fn register_engaged_couples(
        &self,
        names: Vec<String>,
    ) -> Result<Vec<EngagedCouple>, DrawError> {
        let names = self.rules.intake.normalize_names(names)?;

        let mut created = Vec::with_capacity(names.len());
        for name in &names {
            created.push(self.gateway.create_engaged_couple(name).await?);
        }

        info!(registered = created.len(), "engaged couples registered");
        Ok(created)
    }

    pub async fn engaged_couples(&self) -> Result<Vec<EngagedCouple>, DrawError> {
        Ok(self.gateway.list_engaged_couples().await?)
    }

    /// Run a full draw: validate, assign, retire the active generation, write the new one.
    pub async fn draw(&self, mentors: Vec<MentorRequest>) -> Result<DrawOutcome, DrawError> {
        let mentors = self.normalize_mentors(mentors)?;
        let mut progress = DrawProgress::default();

        debug!(stage = %DrawStage::Fetching, mentors = mentors.len(), "draw started");
        let engaged: Vec<String> = self
            .gateway
            .list_engaged_couples()
            .await
            .map_err(|source| store_failure(DrawStage::Fetching, progress, source))?
            .into_iter()
            .map(|couple| couple.name)
            .collect();

        debug!(stage = %DrawStage::Validating, engaged = engaged.len());
        let capacities: Vec<u32> = mentors.iter().map(|mentor| mentor.capacity).collect();
        if let Err(mismatch) = validate_capacity(engaged.len(), &capacities) {
            warn!(kind = ?mismatch.kind, requested = mismatch.requested, available = mismatch.available, "capacity mismatch");
            return Err(mismatch.into());
        }

        debug!(stage = %DrawStage::Assigning);
        let assignments = {
            let mut rng = self.rng.lock().expect("draw rng mutex poisoned");
            assign(&mut *rng, &engaged, &mentors)
        };

        self.retire_active_generation(&mut progress).await?;
        let generation = self.persist(&assignments, &mut progress).await?;

        info!(
            stage = %DrawStage::Complete,
            %generation,
            mentors = progress.mentors_written,
            matches = progress.matches_written,
            "draw complete"
        );

        Ok(DrawOutcome {
            generation,
            assignments,
            matches_written: progress.matches_written,
        })
    }

    /// Read back the active generation grouped by mentor couple, in creation order.
    pub async fn latest_results(&self) -> Result<DrawResultView, DrawError> {
        let mentors = self.gateway.list_active_mentors().await?;
        let rows = self.gateway.list_active_matches_joined().await?;

        let generation = mentors.iter().map(|mentor| mentor.generation).max();
        let mut views: Vec<MentorResultView> = mentors
            .into_iter()
            .map(|mentor| MentorResultView {
                mentor_name: mentor.name,
                capacity: mentor.capacity,
                assigned: Vec::new(),
            })
            .collect();

        let total_matches = rows.len();
        for row in rows {
            match views.iter_mut().find(|view| view.mentor_name == row.mentor_name) {
                Some(view) => view.assigned.push(row.engaged_name),
                None => views.push(MentorResultView {
                    mentor_name: row.mentor_name,
                    capacity: row.mentor_capacity,
                    assigned: vec![row.engaged_name],
                }),
            }
        }

        Ok(DrawResultView {
            generation,
            mentors: views,
            total_matches,
        })
    }

    fn normalize_mentors(
        &self,
        mentors: Vec<MentorRequest>,
    ) -> Result<Vec<MentorRequest>, DrawError> {
        let named: Vec<MentorRequest> = mentors
            .into_iter()
            .filter_map(|mentor| {
                let name = mentor.name.trim();
                (!name.is_empty()).then(|| MentorRequest::new(name, mentor.capacity))
            })
            .collect();

        if named.is_empty() {
            return Err(DrawError::NoMentors);
        }
        if named.len() > self.rules.max_mentors {
            return Err(DrawError::TooManyMentors {
                maximum: self.rules.max_mentors,
                provided: named.len(),
            });
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = named.iter().find(|mentor| !seen.insert(mentor.name.as_str())) {
            return Err(DrawError::DuplicateMentor(duplicate.name.clone()));
        }

        Ok(named)
    }

    async fn retire_active_generation(&self, progress: &mut DrawProgress) -> Result<(), DrawError> {
        debug!(stage = %DrawStage::Deactivating);

        self.gateway
            .deactivate_all_active_matches()
            .await
            .map_err(|source| store_failure(DrawStage::Deactivating, *progress, source))?;
        progress.matches_deactivated = true;

        self.gateway
            .deactivate_all_active_mentors()
            .await
            .map_err(|source| store_failure(DrawStage::Deactivating, *progress, source))?;
        progress.mentors_deactivated = true;

        Ok(())
    }

    async fn persist(
        &self,
        assignments: &[MentorAssignment],
        progress: &mut DrawProgress,
    ) -> Result<Generation, DrawError> {
        let generation = self
            .gateway
            .open_generation()
            .await
            .map_err(|source| store_failure(DrawStage::Persisting, *progress, source))?;
        debug!(stage = %DrawStage::Persisting, %generation);

        for assignment in assignments {
            let mentor = self
                .gateway
                .create_mentor_couple(&assignment.name, assignment.capacity, generation)
                .await
                .map_err(|source| store_failure(DrawStage::Persisting, *progress, source))?;
            progress.mentors_written += 1;

            for name in &assignment.assigned {
                let couple = match self.gateway.find_engaged_couple_by_name(name).await {
                    Ok(couple) => couple,
                    Err(GatewayError::NotFound) => {
                        warn!(engaged = %name, ?progress, "engaged couple vanished mid-draw");
                        return Err(DrawError::EngagedCoupleNotFound {
                            name: name.clone(),
                            progress: *progress,
                        });
                    }
                    Err(source) => {
                        return Err(store_failure(DrawStage::Persisting, *progress, source))
                    }
                };

                self.gateway
                    .create_match(&couple.id, &mentor.id, generation)
                    .await
                    .map_err(|source| store_failure(DrawStage::Persisting, *progress, source))?;
                progress.matches_written += 1;
            }
        }

        Ok(generation)
    }
}
