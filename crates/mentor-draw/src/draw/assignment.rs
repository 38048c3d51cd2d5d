use rand::seq::SliceRandom;
use rand::Rng;

use super::domain::{MentorAssignment, MentorRequest};

/// Uniform Fisher–Yates shuffle into a fresh vector; the input is left untouched.
pub fn shuffle<T, R>(rng: &mut R, items: &[T]) -> Vec<T>
where
    T: Clone,
    R: Rng + ?Sized,
{
    let mut permuted = items.to_vec();
    permuted.shuffle(rng);
    permuted
}

/// Partition the engaged couples across mentors, in mentor order, by declared capacity.
///
/// Capacities are expected to sum to `engaged.len()` (see [`super::validate_capacity`]).
/// Without that guarantee a mentor simply receives whatever names remain.
pub fn assign<R>(rng: &mut R, engaged: &[String], mentors: &[MentorRequest]) -> Vec<MentorAssignment>
where
    R: Rng + ?Sized,
{
    let permuted = shuffle(rng, engaged);
    let mut remaining = permuted.as_slice();

    mentors
        .iter()
        .map(|mentor| {
            let take = remaining.len().min(mentor.capacity as usize);
            let (assigned, rest) = remaining.split_at(take);
            remaining = rest;
            MentorAssignment {
                name: mentor.name.clone(),
                capacity: mentor.capacity,
                assigned: assigned.to_vec(),
            }
        })
        .collect()
}
