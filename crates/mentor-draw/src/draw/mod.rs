//! Randomized, capacity-constrained assignment of engaged couples to mentor couples.
//!
//! A draw fetches the registered engaged couples, checks that mentor capacities add up to
//! exactly that number, shuffles and slices the couples by capacity, retires the active
//! generation, and writes the new one through a [`PersistenceGateway`].

mod assignment;
mod capacity;
pub mod domain;
pub mod gateway;
mod intake;
pub mod memory;
mod orchestrator;
pub mod rest;
mod roster;
pub mod router;

#[cfg(test)]
mod tests;

pub use assignment::{assign, shuffle};
pub use capacity::{validate_capacity, CapacityMismatch, MismatchKind};
pub use domain::{
    ActiveMatchView, DrawResultView, EngagedCouple, EngagedCoupleId, Generation, MatchId,
    MentorAssignment, MentorCouple, MentorCoupleId, MentorRequest, MentorResultView,
    MentorshipMatch,
};
pub use gateway::{GatewayError, PersistenceGateway};
pub use intake::{IntakeError, IntakeRules};
pub use memory::{InMemoryGateway, StoreSnapshot};
pub use orchestrator::{DrawError, DrawOrchestrator, DrawOutcome, DrawProgress, DrawRules, DrawStage};
pub use rest::RestGateway;
pub use roster::{read_roster, read_roster_file};
pub use router::{draw_router, DrawRequest, RegisterCouplesRequest};
