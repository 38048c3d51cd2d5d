use crate::infra::parse_mentor;
use clap::Args;
use mentor_draw::draw::{
    read_roster_file, DrawOrchestrator, DrawResultView, DrawRules, InMemoryGateway, MentorRequest,
};
use mentor_draw::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;

const SAMPLE_COUPLES: [&str; 6] = [
    "Ana & Bruno",
    "Carla & Diego",
    "Eva & Fabio",
    "Gui & Helo",
    "Iris & Joao",
    "Lia & Marcos",
];

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// CSV file with a `couple_name` (or `name`) column. Defaults to a built-in sample.
    #[arg(long)]
    pub(crate) couples: Option<PathBuf>,
    /// Mentor couple as NAME=CAPACITY; repeat for each mentor. Defaults to two even halves.
    #[arg(long = "mentor", value_parser = parse_mentor)]
    pub(crate) mentors: Vec<MentorRequest>,
    /// Seed for a reproducible draw.
    #[arg(long)]
    pub(crate) seed: Option<u64>,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        couples,
        mentors,
        seed,
    } = args;

    let names = match couples {
        Some(path) => read_roster_file(&path)?,
        None => SAMPLE_COUPLES.iter().map(|name| name.to_string()).collect(),
    };
    let mentors = if mentors.is_empty() {
        even_split(names.len())
    } else {
        mentors
    };

    let store = Arc::new(InMemoryGateway::new());
    let rules = DrawRules::default();
    let orchestrator = match seed {
        Some(seed) => DrawOrchestrator::seeded(store, rules, seed),
        None => DrawOrchestrator::new(store, rules),
    };

    println!("Mentor draw demo");
    let registered = orchestrator.register_engaged_couples(names).await?;
    println!("Registered {} engaged couples", registered.len());

    orchestrator.draw(mentors).await?;
    let results = orchestrator.latest_results().await?;
    render_results(&results);
    Ok(())
}

fn even_split(total: usize) -> Vec<MentorRequest> {
    let first = total / 2;
    let second = total - first;
    vec![
        MentorRequest::new("Mentor couple A", first as u32),
        MentorRequest::new("Mentor couple B", second as u32),
    ]
}

fn render_results(results: &DrawResultView) {
    match results.generation {
        Some(generation) => println!("\nDraw {generation}: {} matches", results.total_matches),
        None => println!("\nNo active draw"),
    }

    for mentor in &results.mentors {
        println!(
            "- {} ({}/{} couples)",
            mentor.mentor_name,
            mentor.assigned.len(),
            mentor.capacity
        );
        for couple in &mentor.assigned {
            println!("    {couple}");
        }
    }
}
