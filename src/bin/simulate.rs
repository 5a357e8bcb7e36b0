//! Runs the engines for a fixed number of ticks without the scheduler and
//! prints what the accessors return.
//!
//! Usage: `simulate [ticks] [seed] [region]` (defaults: 5 ticks, seed 42,
//! every region). `region` narrows the ghost-load listing, e.g. `europe`.
//! The completion API is used only when configured in the environment.

use freight_agents::agents::AgentRuntime;
use freight_agents::config::Config;
use freight_agents::models::{Region, RelationshipStage};
use serde_json::json;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "freight_agents=warn".into()),
        )
        .init();

    let mut args = env::args().skip(1);
    let ticks: usize = match args.next() {
        Some(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("ticks must be a positive number, got '{}'", raw))?,
        None => 5,
    };
    let seed: u64 = match args.next() {
        Some(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("seed must be a number, got '{}'", raw))?,
        None => 42,
    };
    let region: Option<Region> = args.next().map(|raw| raw.parse()).transpose()?;

    let config = Config {
        simulation_seed: Some(seed),
        ..Config::from_env()?
    };
    let runtime = AgentRuntime::new(&config)?;

    for tick in 1..=ticks {
        let discovered = runtime.acquisition.discovery_tick().await;
        let advanced = runtime.acquisition.nurture_tick();
        let sent = runtime.acquisition.campaign_tick();
        let loads = runtime.ghost_loads.discovery_tick();
        let transitioned = runtime.ghost_loads.optimization_tick();
        let opened = runtime.wellness.monitoring_tick();
        let (delivered, acknowledged) = runtime.wellness.engagement_tick();

        eprintln!(
            "tick {}: +{} prospects, {} advanced, {} sent, +{} loads, {} transitioned, {} interventions opened, {} delivered ({} acknowledged)",
            tick, discovered, advanced, sent, loads, transitioned, opened, delivered, acknowledged
        );
    }

    let at_risk = runtime.wellness.drivers_at_risk();
    let first_at_risk = at_risk.first().map(|p| p.driver_id.clone());

    let output = json!({
        "seed": seed,
        "ticks": ticks,
        "region": region,
        "topProspects": runtime.acquisition.top_prospects(5),
        "activeAccounts": runtime.acquisition.prospects_by_stage(RelationshipStage::Active),
        "campaigns": runtime.acquisition.campaigns(),
        "ghostLoads": runtime.ghost_loads.global_ghost_loads(region, 10),
        "driversAtRisk": at_risk,
        "interventions": first_at_risk
            .map(|id| runtime.wellness.interventions_for(&id))
            .unwrap_or_default(),
        "report": runtime.report(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
