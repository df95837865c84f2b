//! Performance benchmarks for compatibility scoring and candidate ranking

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use team_forge::directory::InMemoryDirectory;
use team_forge::matchmaker::{MatchmakingService, RankingConfig};
use team_forge::scoring::CompatibilityScorer;
use team_forge::types::{
    EngineEvent, Event, ExperienceTier, MatchingPreferences, Profile, TraitVector,
};

// Mock event publisher for benchmarks
#[derive(Debug, Clone)]
struct BenchEventPublisher;

#[async_trait::async_trait]
impl team_forge::amqp::publisher::EventPublisher for BenchEventPublisher {
    async fn publish(&self, _event: EngineEvent) -> team_forge::error::Result<()> {
        Ok(())
    }
}

const SKILL_POOL: &[&str] = &[
    "React",
    "Node",
    "Python",
    "Rust",
    "Go",
    "SQL",
    "Docker",
    "Kubernetes",
    "TypeScript",
    "GraphQL",
];

fn bench_profile(index: usize) -> Profile {
    let tier = match index % 5 {
        0 => ExperienceTier::Student,
        1 => ExperienceTier::Junior,
        2 => ExperienceTier::Mid,
        3 => ExperienceTier::Senior,
        _ => ExperienceTier::Lead,
    };

    let skills: Vec<String> = (0..4)
        .map(|offset| SKILL_POOL[(index + offset * 3) % SKILL_POOL.len()].to_string())
        .collect();

    Profile {
        user_id: format!("user-{:05}", index),
        display_name: format!("User {}", index),
        skills,
        tier: Some(tier),
        traits: Some(TraitVector::uniform((index % 10) as f64 / 10.0)),
        preferences: MatchingPreferences::default(),
    }
}

fn bench_event() -> Event {
    Event {
        event_id: "bench-event".to_string(),
        title: "Benchmark Event".to_string(),
        min_team_size: 2,
        max_team_size: 6,
        registration_closes_at: None,
        formation_closes_at: None,
    }
}

fn bench_pairwise_scoring(c: &mut Criterion) {
    let scorer = CompatibilityScorer::new();
    let a = bench_profile(1);
    let b = bench_profile(7);
    let event = bench_event();

    c.bench_function("score_single_pair", |bench| {
        bench.iter(|| {
            let score = scorer.score(black_box(&a), black_box(&b), Some(black_box(&event)));
            black_box(score.total)
        })
    });
}

fn bench_scoring_partial_profiles(c: &mut Criterion) {
    let scorer = CompatibilityScorer::new();
    let mut a = bench_profile(1);
    let mut b = bench_profile(7);
    a.traits = None;
    b.tier = None;

    c.bench_function("score_partial_profiles", |bench| {
        bench.iter(|| {
            let score = scorer.score(black_box(&a), black_box(&b), None);
            black_box(score.total)
        })
    });
}

fn bench_candidate_ranking(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let directory = Arc::new(InMemoryDirectory::new());
    directory.upsert_event(bench_event()).unwrap();
    for i in 0..10_000 {
        directory.upsert_profile(bench_profile(i)).unwrap();
    }

    let service = MatchmakingService::new(
        directory.clone(),
        directory.clone(),
        Arc::new(BenchEventPublisher),
    )
    .with_ranking_config(RankingConfig {
        default_min_score: 50.0,
        max_limit: 25,
    });

    c.bench_function("rank_10k_candidates", |bench| {
        bench.iter(|| {
            let candidates = runtime
                .block_on(service.candidates(
                    black_box("user-00001"),
                    "bench-event",
                    Some(40.0),
                    Some(25),
                ))
                .unwrap();
            black_box(candidates.len())
        })
    });
}

criterion_group!(
    benches,
    bench_pairwise_scoring,
    bench_scoring_partial_profiles,
    bench_candidate_ranking
);
criterion_main!(benches);
