//! Match Tester CLI Tool
//!
//! Command-line tool for exercising the matchmaking engine end-to-end
//! with a seeded in-memory directory. No broker or backing services are
//! required; events go to the mock publisher and are printed at the end.
//!
//! Usage:
//!   cargo run --bin match-tester -- --help
//!   cargo run --bin match-tester rank --user alice
//!   cargo run --bin match-tester run-scenario --scenario invite-flow
//!   cargo run --bin match-tester run-all-scenarios

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use team_forge::amqp::messages::routing_key_for;
use team_forge::amqp::publisher::MockEventPublisher;
use team_forge::directory::InMemoryDirectory;
use team_forge::matchmaker::MatchmakingService;
use team_forge::types::{
    Decision, Event, ExperienceTier, MatchingPreferences, Profile, TeamDetails, TraitVector,
};

#[derive(Parser)]
#[command(name = "match-tester")]
#[command(about = "Exercises the team-forge engine against a seeded in-memory directory")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank candidates for a seeded user
    Rank {
        /// User ID (one of: alice, bob, carol, dave, erin)
        #[arg(short, long)]
        user: String,
        /// Minimum score
        #[arg(short, long, default_value = "0.0")]
        min_score: f64,
        /// Result limit
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Run a predefined scenario (invite-flow, mutual-match, capacity-race)
    RunScenario {
        #[arg(short, long)]
        scenario: String,
    },
    /// Run all scenarios
    RunAllScenarios,
}

const SEED_EVENT: &str = "hack-2026";

fn seed_profile(id: &str, skills: &[&str], tier: ExperienceTier, traits: f64) -> Profile {
    Profile {
        user_id: id.to_string(),
        display_name: id.to_string(),
        skills: skills.iter().map(|s| s.to_string()).collect(),
        tier: Some(tier),
        traits: Some(TraitVector::uniform(traits)),
        preferences: MatchingPreferences::default(),
    }
}

fn seeded_service() -> Result<(MatchmakingService, Arc<MockEventPublisher>)> {
    let directory = Arc::new(InMemoryDirectory::new());
    let publisher = Arc::new(MockEventPublisher::new());

    directory.upsert_event(Event {
        event_id: SEED_EVENT.to_string(),
        title: "Hack 2026".to_string(),
        min_team_size: 2,
        max_team_size: 5,
        registration_closes_at: None,
        formation_closes_at: None,
    })?;

    for profile in [
        seed_profile("alice", &["React", "Node", "SQL"], ExperienceTier::Mid, 0.6),
        seed_profile("bob", &["React", "Python"], ExperienceTier::Mid, 0.5),
        seed_profile("carol", &["Rust", "Go", "SQL"], ExperienceTier::Senior, 0.7),
        seed_profile("dave", &["React", "Node"], ExperienceTier::Junior, 0.4),
        seed_profile("erin", &["Figma", "CSS"], ExperienceTier::Student, 0.8),
    ] {
        directory.upsert_profile(profile)?;
    }

    let service = MatchmakingService::new(
        directory.clone(),
        directory.clone(),
        publisher.clone(),
    );

    Ok((service, publisher))
}

async fn run_rank(user: &str, min_score: f64, limit: usize) -> Result<()> {
    let (service, _publisher) = seeded_service()?;

    let candidates = service
        .candidates(user, SEED_EVENT, Some(min_score), Some(limit))
        .await?;

    println!("Candidates for {} in {}:", user, SEED_EVENT);
    for candidate in &candidates {
        println!(
            "  {:<8} score {:>5.1}  shared: {:?}",
            candidate.profile.user_id, candidate.score.total, candidate.score.shared_skills
        );
    }
    println!("({} candidates)", candidates.len());
    Ok(())
}

async fn run_invite_flow() -> Result<()> {
    println!("--- Scenario: invite-flow ---");
    let (service, publisher) = seeded_service()?;

    let team = service
        .create_team(
            "alice",
            SEED_EVENT,
            3,
            TeamDetails {
                name: "Night Shippers".to_string(),
                ..Default::default()
            },
        )
        .await?;
    println!("alice created team {} ({})", team.id(), team.status());

    let request = service
        .match_request(
            "alice",
            "bob",
            SEED_EVENT,
            Some(team.id()),
            Some("join us?".to_string()),
        )
        .await?;
    println!(
        "alice invited bob (request {}, score {:.1})",
        request.id, request.score.total
    );

    let resolved = service
        .respond_to_request(request.id, "bob", Decision::Accept)
        .await?;
    println!("bob accepted ({:?})", resolved.status);

    let team = service.get_team(team.id())?.expect("team should exist");
    println!(
        "team now {}/{} members, status {}",
        team.size(),
        team.max_members(),
        team.status()
    );

    println!("published events:");
    for event in publisher.published_events() {
        println!("  {}", routing_key_for(&event));
    }
    Ok(())
}

async fn run_mutual_match() -> Result<()> {
    println!("--- Scenario: mutual-match ---");
    let (service, _publisher) = seeded_service()?;

    let ab = service
        .match_request("alice", "bob", SEED_EVENT, None, None)
        .await?;
    service
        .respond_to_request(ab.id, "bob", Decision::Accept)
        .await?;
    println!("alice -> bob accepted; mutual yet: {:?}", service.mutual_matches("alice")?.len());

    let ba = service
        .match_request("bob", "alice", SEED_EVENT, None, None)
        .await?;
    service
        .respond_to_request(ba.id, "alice", Decision::Accept)
        .await?;

    let mutual = service.mutual_matches("alice")?;
    println!("after reciprocal accept, mutual matches for alice:");
    for m in &mutual {
        println!("  with {} on {}", m.user_id, m.event_id);
    }
    Ok(())
}

async fn run_capacity_race() -> Result<()> {
    println!("--- Scenario: capacity-race ---");
    let (service, _publisher) = seeded_service()?;
    let service = Arc::new(service);

    let team = service
        .create_team("alice", SEED_EVENT, 3, TeamDetails::default())
        .await?;
    service.join_team(team.id(), "bob").await?;
    println!("team at 2/3, three users race for the last seat");

    let mut tasks = Vec::new();
    for user in ["carol", "dave", "erin"] {
        let service = service.clone();
        let team_id = team.id();
        tasks.push(tokio::spawn(
            async move { service.join_team(team_id, user).await },
        ));
    }

    for (user, task) in ["carol", "dave", "erin"].iter().zip(tasks) {
        match task.await? {
            Ok(_) => println!("  {} joined", user),
            Err(e) => println!("  {} rejected: {}", user, e),
        }
    }

    let team = service.get_team(team.id())?.expect("team should exist");
    println!(
        "final size {}/{} ({})",
        team.size(),
        team.max_members(),
        team.status()
    );
    Ok(())
}

async fn run_scenario(name: &str) -> Result<()> {
    match name {
        "invite-flow" => run_invite_flow().await,
        "mutual-match" => run_mutual_match().await,
        "capacity-race" => run_capacity_race().await,
        other => Err(anyhow::anyhow!(
            "Unknown scenario '{}'. Use invite-flow, mutual-match, or capacity-race",
            other
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Rank {
            user,
            min_score,
            limit,
        } => run_rank(&user, min_score, limit).await,
        Commands::RunScenario { scenario } => run_scenario(&scenario).await,
        Commands::RunAllScenarios => {
            run_invite_flow().await?;
            run_mutual_match().await?;
            run_capacity_race().await?;
            Ok(())
        }
    }
}
