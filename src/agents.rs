//! Runtime wiring for the three engines.
//!
//! [`AgentRuntime::new`] builds and seeds the engines without starting
//! anything. [`AgentRuntime::start`] registers the periodic ticks and
//! [`AgentRuntime::stop`] cancels them and waits for in-flight work.

use crate::acquisition::AcquisitionEngine;
use crate::completion_client::{CompletionClient, CompletionStatus};
use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::ghost_loads::GhostLoadEngine;
use crate::models::{PipelineSummary, RegionSummary};
use crate::scheduler::{Scheduler, TaskStatus};
use crate::wellness::{WellnessEngine, WellnessSummary};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const DEFAULT_DRIVERS: [&str; 12] = [
    "DRV-001", "DRV-002", "DRV-003", "DRV-004", "DRV-005", "DRV-006", "DRV-007", "DRV-008",
    "DRV-009", "DRV-010", "DRV-011", "DRV-012",
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeStatus {
    pub started: bool,
    pub stopped: bool,
    pub completion_enabled: bool,
    pub completion: Option<CompletionStatus>,
    pub prospects: usize,
    pub ghost_loads: usize,
    pub drivers: usize,
    pub tasks: Vec<TaskStatus>,
}

/// Point-in-time rollup across all engines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub generated_at: DateTime<Utc>,
    pub pipeline: PipelineSummary,
    pub regions: Vec<RegionSummary>,
    pub wellness: WellnessSummary,
}

pub struct AgentRuntime {
    pub acquisition: Arc<AcquisitionEngine>,
    pub ghost_loads: Arc<GhostLoadEngine>,
    pub wellness: Arc<WellnessEngine>,
    config: Config,
    completion_enabled: bool,
    scheduler: Scheduler,
    started: AtomicBool,
}

impl AgentRuntime {
    /// Builds and seeds every engine. Nothing is scheduled yet.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let completion = config
            .completion()
            .map(CompletionClient::new)
            .transpose()
            .context("Failed to build completion client")?;
        let completion_enabled = completion.is_some();
        let seed = config.simulation_seed;

        let acquisition = AcquisitionEngine::new(completion, seed);
        acquisition.seed();

        let ghost_loads = GhostLoadEngine::new(seed);
        ghost_loads.discovery_tick();

        let wellness = WellnessEngine::new(seed);
        wellness.seed_drivers(&DEFAULT_DRIVERS);

        tracing::info!(
            completion_enabled,
            seed = ?seed,
            "Agent runtime initialized"
        );

        Ok(Self {
            acquisition: Arc::new(acquisition),
            ghost_loads: Arc::new(ghost_loads),
            wellness: Arc::new(wellness),
            config: config.clone(),
            completion_enabled,
            scheduler: Scheduler::new(),
            started: AtomicBool::new(false),
        })
    }

    /// Registers every periodic task. Must be called from within a Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// `AppError::BadRequest` if the runtime was already started.
    pub fn start(&self) -> Result<(), AppError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(AppError::BadRequest(
                "Agent runtime already started".to_string(),
            ));
        }
        let c = &self.config;

        let acquisition = Arc::clone(&self.acquisition);
        self.scheduler.spawn_periodic(
            "prospect_discovery",
            Config::every(c.prospect_discovery_interval_secs),
            false,
            move || {
                let acquisition = Arc::clone(&acquisition);
                async move {
                    acquisition.discovery_tick().await;
                }
            },
        );

        let acquisition = Arc::clone(&self.acquisition);
        self.scheduler.spawn_periodic(
            "nurture",
            Config::every(c.nurture_interval_secs),
            false,
            move || {
                let acquisition = Arc::clone(&acquisition);
                async move {
                    acquisition.nurture_tick();
                }
            },
        );

        let acquisition = Arc::clone(&self.acquisition);
        self.scheduler.spawn_periodic(
            "campaign",
            Config::every(c.campaign_interval_secs),
            false,
            move || {
                let acquisition = Arc::clone(&acquisition);
                async move {
                    acquisition.campaign_tick();
                }
            },
        );

        let ghost_loads = Arc::clone(&self.ghost_loads);
        self.scheduler.spawn_periodic(
            "ghost_discovery",
            Config::every(c.ghost_discovery_interval_secs),
            false,
            move || {
                let ghost_loads = Arc::clone(&ghost_loads);
                async move {
                    ghost_loads.discovery_tick();
                }
            },
        );

        let ghost_loads = Arc::clone(&self.ghost_loads);
        self.scheduler.spawn_periodic(
            "ghost_optimization",
            Config::every(c.ghost_optimization_interval_secs),
            false,
            move || {
                let ghost_loads = Arc::clone(&ghost_loads);
                async move {
                    ghost_loads.optimization_tick();
                }
            },
        );

        let wellness = Arc::clone(&self.wellness);
        self.scheduler.spawn_periodic(
            "wellness_monitoring",
            Config::every(c.wellness_monitor_interval_secs),
            false,
            move || {
                let wellness = Arc::clone(&wellness);
                async move {
                    wellness.monitoring_tick();
                }
            },
        );

        let wellness = Arc::clone(&self.wellness);
        self.scheduler.spawn_periodic(
            "wellness_engagement",
            Config::every(c.wellness_engagement_interval_secs),
            false,
            move || {
                let wellness = Arc::clone(&wellness);
                async move {
                    wellness.engagement_tick();
                }
            },
        );

        let (acquisition, ghost_loads, wellness) = (
            Arc::clone(&self.acquisition),
            Arc::clone(&self.ghost_loads),
            Arc::clone(&self.wellness),
        );
        self.scheduler.spawn_periodic(
            "daily_report",
            Config::every(c.report_interval_secs),
            false,
            move || {
                let report = build_report(&acquisition, &ghost_loads, &wellness);
                async move {
                    tracing::info!(
                        prospects = report.pipeline.total_prospects,
                        expected_revenue = report.pipeline.total_expected_revenue,
                        ghost_loads = report.regions.iter().map(|r| r.load_count).sum::<usize>(),
                        drivers_at_risk = report.wellness.drivers_at_risk,
                        "Daily report"
                    );
                }
            },
        );

        tracing::info!(tasks = self.scheduler.status().len(), "Agent runtime started");
        Ok(())
    }

    /// Cancels every task and waits for in-flight ticks. Idempotent.
    pub async fn stop(&self) -> Vec<TaskStatus> {
        let statuses = self.scheduler.stop().await;
        let failed = statuses.iter().filter(|s| s.failed).count();
        if failed > 0 {
            tracing::warn!(failed, "Agent runtime stopped with failed tasks");
        } else {
            tracing::info!(tasks = statuses.len(), "Agent runtime stopped");
        }
        statuses
    }

    pub fn status(&self) -> RuntimeStatus {
        RuntimeStatus {
            started: self.started.load(Ordering::SeqCst),
            stopped: self.scheduler.is_stopped(),
            completion_enabled: self.completion_enabled,
            completion: self.acquisition.completion_status(),
            prospects: self.acquisition.prospect_count(),
            ghost_loads: self.ghost_loads.load_count(),
            drivers: self.wellness.driver_count(),
            tasks: self.scheduler.status(),
        }
    }

    pub fn report(&self) -> DailyReport {
        build_report(&self.acquisition, &self.ghost_loads, &self.wellness)
    }
}

fn build_report(
    acquisition: &AcquisitionEngine,
    ghost_loads: &GhostLoadEngine,
    wellness: &WellnessEngine,
) -> DailyReport {
    DailyReport {
        generated_at: Utc::now(),
        pipeline: acquisition.pipeline_summary(),
        regions: ghost_loads.regional_summary(),
        wellness: wellness.summary(),
    }
}
