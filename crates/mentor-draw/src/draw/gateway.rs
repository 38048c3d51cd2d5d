use async_trait::async_trait;

use super::domain::{
    ActiveMatchView, EngagedCouple, EngagedCoupleId, Generation, MentorCouple, MentorCoupleId,
    MentorshipMatch,
};

/// Record store for the three mentorship entities.
///
/// Records are never hard deleted. Mentor couples and matches carry an `active` flag and the
/// [`Generation`] of the draw that wrote them; reads return only the latest generation.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn list_engaged_couples(&self) -> Result<Vec<EngagedCouple>, GatewayError>;

    async fn create_engaged_couple(&self, name: &str) -> Result<EngagedCouple, GatewayError>;

    /// Returns [`GatewayError::NotFound`] when no couple carries the name.
    async fn find_engaged_couple_by_name(&self, name: &str)
        -> Result<EngagedCouple, GatewayError>;

    /// Idempotent: rows that are already inactive are left alone.
    async fn deactivate_all_active_matches(&self) -> Result<(), GatewayError>;

    /// Idempotent: rows that are already inactive are left alone.
    async fn deactivate_all_active_mentors(&self) -> Result<(), GatewayError>;

    /// Allocate the generation the next set of mentor and match records is written under.
    async fn open_generation(&self) -> Result<Generation, GatewayError>;

    async fn create_mentor_couple(
        &self,
        name: &str,
        capacity: u32,
        generation: Generation,
    ) -> Result<MentorCouple, GatewayError>;

    async fn create_match(
        &self,
        engaged_couple_id: &EngagedCoupleId,
        mentor_couple_id: &MentorCoupleId,
        generation: Generation,
    ) -> Result<MentorshipMatch, GatewayError>;

    /// Active mentors of the latest generation, in creation order.
    async fn list_active_mentors(&self) -> Result<Vec<MentorCouple>, GatewayError>;

    /// Active matches of the latest generation joined with both couples' names.
    async fn list_active_matches_joined(&self) -> Result<Vec<ActiveMatchView>, GatewayError>;
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("record not found")]
    NotFound,
}
