//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the team-forge engine:
//! request lifecycle counters, team membership gauges, scoring
//! distributions, and operation timings.

use crate::types::{RequestKind, RequestStatus, TeamStatus};
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the engine
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    service_metrics: ServiceMetrics,
    request_metrics: RequestMetrics,
    team_metrics: TeamMetrics,
    scoring_metrics: ScoringMetrics,
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// AMQP publish attempts by routing key and status
    pub amqp_publishes_total: IntCounterVec,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// Match-request metrics
#[derive(Clone)]
pub struct RequestMetrics {
    /// Total requests created, by kind
    pub requests_created_total: IntCounterVec,

    /// Total requests resolved, by terminal status
    pub requests_resolved_total: IntCounterVec,

    /// Requests rejected at creation (duplicate, self-request)
    pub create_rejections_total: IntCounterVec,

    /// Currently pending requests
    pub pending_requests: IntGauge,

    /// Mutual matches detected by find_mutual scans
    pub mutual_matches_found_total: IntCounter,
}

/// Team metrics
#[derive(Clone)]
pub struct TeamMetrics {
    /// Number of active teams by status
    pub active_teams: IntGaugeVec,

    /// Total teams created
    pub teams_created_total: IntCounter,

    /// Total teams closed, by terminal status
    pub teams_closed_total: IntCounterVec,

    /// Total members joined across teams
    pub members_joined_total: IntCounter,

    /// Total members that left or were removed
    pub members_left_total: IntCounter,

    /// Join attempts rejected, by reason
    pub join_rejections_total: IntCounterVec,
}

/// Scoring and ranking metrics
#[derive(Clone)]
pub struct ScoringMetrics {
    /// Distribution of computed compatibility scores
    pub score_distribution: Histogram,

    /// Total candidate rankings served
    pub rankings_total: IntCounter,

    /// Candidates scored per ranking
    pub candidates_scored: Histogram,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Engine operation durations by operation name
    pub operation_duration: HistogramVec,

    /// Candidate ranking duration
    pub ranking_duration: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let request_metrics = RequestMetrics::new(&registry)?;
        let team_metrics = TeamMetrics::new(&registry)?;
        let scoring_metrics = ScoringMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            request_metrics,
            team_metrics,
            scoring_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn request(&self) -> &RequestMetrics {
        &self.request_metrics
    }

    pub fn team(&self) -> &TeamMetrics {
        &self.team_metrics
    }

    pub fn scoring(&self) -> &ScoringMetrics {
        &self.scoring_metrics
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a request being created
    pub fn record_request_created(&self, kind: RequestKind, score: f64) {
        let kind_str = match kind {
            RequestKind::DirectMatch => "direct_match",
            RequestKind::TeamInvite => "team_invite",
        };

        self.request_metrics
            .requests_created_total
            .with_label_values(&[kind_str])
            .inc();
        self.request_metrics.pending_requests.inc();
        self.scoring_metrics.score_distribution.observe(score);
    }

    /// Record a request reaching a terminal status
    pub fn record_request_resolved(&self, status: RequestStatus) {
        let status_str = match status {
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Cancelled => "cancelled",
            RequestStatus::Pending => return,
        };

        self.request_metrics
            .requests_resolved_total
            .with_label_values(&[status_str])
            .inc();
        self.request_metrics.pending_requests.dec();
    }

    /// Record a rejected request creation
    pub fn record_create_rejection(&self, reason: &str) {
        self.request_metrics
            .create_rejections_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Record a team being created
    pub fn record_team_created(&self) {
        self.team_metrics.teams_created_total.inc();
        self.team_metrics.members_joined_total.inc();
        self.team_metrics
            .active_teams
            .with_label_values(&["total"])
            .inc();
    }

    /// Record a team closing, by terminal status
    pub fn record_team_closed(&self, status: TeamStatus) {
        let status_str = match status {
            TeamStatus::Completed => "completed",
            TeamStatus::Disbanded => "disbanded",
            _ => return,
        };

        self.team_metrics
            .teams_closed_total
            .with_label_values(&[status_str])
            .inc();
        self.team_metrics
            .active_teams
            .with_label_values(&["total"])
            .dec();
    }

    /// Record a successful member join
    pub fn record_member_joined(&self) {
        self.team_metrics.members_joined_total.inc();
    }

    /// Record a member leaving or being removed
    pub fn record_member_left(&self) {
        self.team_metrics.members_left_total.inc();
    }

    /// Record a rejected join attempt
    pub fn record_join_rejection(&self, reason: &str) {
        self.team_metrics
            .join_rejections_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Record a candidate ranking
    pub fn record_ranking(&self, candidates_scored: usize, duration: Duration) {
        self.scoring_metrics.rankings_total.inc();
        self.scoring_metrics
            .candidates_scored
            .observe(candidates_scored as f64);
        self.performance_metrics
            .ranking_duration
            .observe(duration.as_secs_f64());
    }

    /// Record an engine operation duration
    pub fn record_operation(&self, operation: &str, duration: Duration) {
        self.performance_metrics
            .operation_duration
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }

    /// Record an AMQP publish attempt
    pub fn record_amqp_publish(&self, routing_key: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.service_metrics
            .amqp_publishes_total
            .with_label_values(&[routing_key, status])
            .inc();
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("team_forge_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let amqp_publishes_total = IntCounterVec::new(
            Opts::new(
                "team_forge_amqp_publishes_total",
                "Total AMQP publish attempts",
            ),
            &["routing_key", "status"],
        )?;
        registry.register(Box::new(amqp_publishes_total.clone()))?;

        let health_status = IntGauge::new(
            "team_forge_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("team_forge_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            uptime_seconds,
            amqp_publishes_total,
            health_status,
            component_health,
        })
    }
}

impl RequestMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let requests_created_total = IntCounterVec::new(
            Opts::new(
                "team_forge_requests_created_total",
                "Total match requests created",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(requests_created_total.clone()))?;

        let requests_resolved_total = IntCounterVec::new(
            Opts::new(
                "team_forge_requests_resolved_total",
                "Total match requests resolved",
            ),
            &["status"],
        )?;
        registry.register(Box::new(requests_resolved_total.clone()))?;

        let create_rejections_total = IntCounterVec::new(
            Opts::new(
                "team_forge_request_create_rejections_total",
                "Match request creations rejected",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(create_rejections_total.clone()))?;

        let pending_requests = IntGauge::new(
            "team_forge_pending_requests",
            "Currently pending match requests",
        )?;
        registry.register(Box::new(pending_requests.clone()))?;

        let mutual_matches_found_total = IntCounter::new(
            "team_forge_mutual_matches_found_total",
            "Mutual matches returned by lookups",
        )?;
        registry.register(Box::new(mutual_matches_found_total.clone()))?;

        Ok(Self {
            requests_created_total,
            requests_resolved_total,
            create_rejections_total,
            pending_requests,
            mutual_matches_found_total,
        })
    }
}

impl TeamMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let active_teams = IntGaugeVec::new(
            Opts::new("team_forge_active_teams", "Number of active teams"),
            &["status"],
        )?;
        registry.register(Box::new(active_teams.clone()))?;

        let teams_created_total =
            IntCounter::new("team_forge_teams_created_total", "Total teams created")?;
        registry.register(Box::new(teams_created_total.clone()))?;

        let teams_closed_total = IntCounterVec::new(
            Opts::new("team_forge_teams_closed_total", "Total teams closed"),
            &["status"],
        )?;
        registry.register(Box::new(teams_closed_total.clone()))?;

        let members_joined_total = IntCounter::new(
            "team_forge_members_joined_total",
            "Total team members added",
        )?;
        registry.register(Box::new(members_joined_total.clone()))?;

        let members_left_total = IntCounter::new(
            "team_forge_members_left_total",
            "Total team members removed",
        )?;
        registry.register(Box::new(members_left_total.clone()))?;

        let join_rejections_total = IntCounterVec::new(
            Opts::new(
                "team_forge_join_rejections_total",
                "Team join attempts rejected",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(join_rejections_total.clone()))?;

        Ok(Self {
            active_teams,
            teams_created_total,
            teams_closed_total,
            members_joined_total,
            members_left_total,
            join_rejections_total,
        })
    }
}

impl ScoringMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let score_distribution = Histogram::with_opts(
            HistogramOpts::new(
                "team_forge_score_distribution",
                "Distribution of computed compatibility scores",
            )
            .buckets(vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0]),
        )?;
        registry.register(Box::new(score_distribution.clone()))?;

        let rankings_total = IntCounter::new(
            "team_forge_rankings_total",
            "Total candidate rankings served",
        )?;
        registry.register(Box::new(rankings_total.clone()))?;

        let candidates_scored = Histogram::with_opts(
            HistogramOpts::new(
                "team_forge_candidates_scored",
                "Candidates scored per ranking",
            )
            .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0]),
        )?;
        registry.register(Box::new(candidates_scored.clone()))?;

        Ok(Self {
            score_distribution,
            rankings_total,
            candidates_scored,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "team_forge_operation_duration_seconds",
                "Engine operation durations",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        let ranking_duration = Histogram::with_opts(HistogramOpts::new(
            "team_forge_ranking_duration_seconds",
            "Candidate ranking duration",
        ))?;
        registry.register(Box::new(ranking_duration.clone()))?;

        Ok(Self {
            operation_duration,
            ranking_duration,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        // Fall back to an unregistered collector if registration fails;
        // metrics are observability, not correctness.
        Self::new().unwrap_or_else(|_| {
            let registry = Arc::new(Registry::new());
            Self::with_registry(registry).expect("empty registry cannot collide")
        })
    }
}
