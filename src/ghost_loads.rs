//! Global ghost-load discovery.
//!
//! Fabricates freight loads across the seven market regions, each with a few
//! pre-seeded carrier matches, and walks them through
//! `Discovered → Analyzing → Matching → Assigned` under explicit guards.

use crate::models::*;
use crate::registry::Registry;
use crate::simulation::{pick, random_id, unit, SimRng};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::rngs::SmallRng;
use rand::Rng;
use uuid::Uuid;

/// Best carrier match needed before a load is assigned.
pub const ASSIGNMENT_THRESHOLD: f64 = 0.8;
/// How long an assigned load stays visible after discovery.
pub const ASSIGNED_RETENTION_HOURS: i64 = 24;

// ============ Pure decision functions ============

pub fn urgency_for(hours_to_pickup: u32) -> UrgencyLevel {
    match hours_to_pickup {
        0..=6 => UrgencyLevel::Critical,
        7..=24 => UrgencyLevel::High,
        25..=48 => UrgencyLevel::Medium,
        _ => UrgencyLevel::Low,
    }
}

fn urgency_bonus(urgency: UrgencyLevel) -> f64 {
    match urgency {
        UrgencyLevel::Low => 0.0,
        UrgencyLevel::Medium => 0.05,
        UrgencyLevel::High => 0.1,
        UrgencyLevel::Critical => 0.15,
    }
}

/// Attractiveness of a load in `[0, 1]`.
///
/// Starts at 0.5, moves with the posted rate's premium (or discount) over the
/// lane's market rate, plus a bonus for urgent pickups.
pub fn opportunity_score(load: &GhostLoad) -> f64 {
    let premium = if load.market_rate > 0.0 {
        (load.posted_rate - load.market_rate) / load.market_rate
    } else {
        0.0
    };
    unit(0.5 + premium + urgency_bonus(load.urgency))
}

pub fn best_match_score(load: &GhostLoad) -> Option<f64> {
    load.matches
        .iter()
        .map(|m| m.match_score)
        .max_by(|a, b| a.total_cmp(b))
}

/// Guarded status transition; never regresses.
///
/// - `Discovered → Analyzing` always
/// - `Analyzing → Matching` once at least one carrier match exists
/// - `Matching → Assigned` once the best match reaches [`ASSIGNMENT_THRESHOLD`]
pub fn next_status(load: &GhostLoad) -> LoadStatus {
    match load.status {
        LoadStatus::Discovered => LoadStatus::Analyzing,
        LoadStatus::Analyzing if !load.matches.is_empty() => LoadStatus::Matching,
        LoadStatus::Matching
            if best_match_score(load).is_some_and(|s| s >= ASSIGNMENT_THRESHOLD) =>
        {
            LoadStatus::Assigned
        }
        status => status,
    }
}

/// Assigned loads past the retention window are dropped from the registry.
pub fn is_expired(load: &GhostLoad, now: DateTime<Utc>) -> bool {
    load.status == LoadStatus::Assigned
        && now - load.discovered_at > ChronoDuration::hours(ASSIGNED_RETENTION_HOURS)
}

// ============ Synthetic data ============

fn lanes(region: Region) -> &'static [(&'static str, &'static str)] {
    match region {
        Region::NorthAmerica => &[
            ("Chicago, IL", "Dallas, TX"),
            ("Los Angeles, CA", "Phoenix, AZ"),
            ("Atlanta, GA", "Charlotte, NC"),
        ],
        Region::Europe => &[
            ("Rotterdam, NL", "Munich, DE"),
            ("Lyon, FR", "Milan, IT"),
            ("Warsaw, PL", "Berlin, DE"),
        ],
        Region::AsiaPacific => &[
            ("Shanghai, CN", "Shenzhen, CN"),
            ("Tokyo, JP", "Osaka, JP"),
            ("Singapore, SG", "Kuala Lumpur, MY"),
        ],
        Region::LatinAmerica => &[
            ("Monterrey, MX", "Laredo, TX"),
            ("São Paulo, BR", "Curitiba, BR"),
            ("Santiago, CL", "Mendoza, AR"),
        ],
        Region::MiddleEast => &[
            ("Dubai, AE", "Riyadh, SA"),
            ("Jeddah, SA", "Amman, JO"),
            ("Doha, QA", "Muscat, OM"),
        ],
        Region::Africa => &[
            ("Johannesburg, ZA", "Durban, ZA"),
            ("Lagos, NG", "Accra, GH"),
            ("Nairobi, KE", "Mombasa, KE"),
        ],
        Region::Oceania => &[
            ("Sydney, AU", "Melbourne, AU"),
            ("Brisbane, AU", "Sydney, AU"),
            ("Auckland, NZ", "Wellington, NZ"),
        ],
    }
}

const CARRIERS: [&str; 8] = [
    "Northbound Express",
    "Red Mesa Transport",
    "Harbor Line Carriers",
    "Three Rivers Trucking",
    "Silverline Haulage",
    "Pinecrest Freight",
    "Atlas Reefer",
    "Crosswind Logistics",
];

/// Fabricates one load in `region` with 2-4 carrier matches.
pub fn generate_ghost_load(region: Region, rng: &mut SmallRng) -> GhostLoad {
    let (origin, destination) = *pick(rng, lanes(region));
    let distance_miles: u32 = rng.random_range(150..=2200);
    let rate_per_mile: f64 = rng.random_range(1.8..3.2);
    let market_rate = distance_miles as f64 * rate_per_mile;
    let posted_rate = market_rate * rng.random_range(0.9..1.35);
    let hours_to_pickup: u32 = rng.random_range(2..=96);

    let match_count = rng.random_range(2..=4);
    let matches = (0..match_count)
        .map(|_| CarrierMatch {
            carrier_name: pick(rng, &CARRIERS).to_string(),
            match_score: rng.random_range(0.5..0.99),
            estimated_pickup_hours: rng.random_range(1..=hours_to_pickup.max(1)),
        })
        .collect();

    GhostLoad {
        id: random_id(rng),
        region,
        origin: origin.to_string(),
        destination: destination.to_string(),
        distance_miles,
        posted_rate,
        market_rate,
        urgency: urgency_for(hours_to_pickup),
        status: LoadStatus::Discovered,
        matches,
        discovered_at: Utc::now(),
    }
}

// ============ Engine ============

pub struct GhostLoadEngine {
    loads: Registry<Uuid, GhostLoad>,
    rng: SimRng,
}

impl GhostLoadEngine {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            loads: Registry::new(),
            rng: SimRng::new(seed, 2),
        }
    }

    /// Fabricates one load per region. Returns how many were added.
    pub fn discovery_tick(&self) -> usize {
        let loads: Vec<GhostLoad> = self.rng.with(|rng| {
            Region::ALL
                .iter()
                .map(|&region| generate_ghost_load(region, rng))
                .collect()
        });

        let added = loads
            .into_iter()
            .filter(|load| self.loads.insert_new(load.id, load.clone()))
            .count();

        tracing::info!(added, total = self.loads.len(), "Ghost load discovery complete");
        added
    }

    /// Applies [`next_status`] to every load, then drops expired assignments.
    /// Returns how many transitioned.
    pub fn optimization_tick(&self) -> usize {
        let mut transitioned = 0;
        self.loads.update_all(|load| {
            let next = next_status(load);
            if next != load.status {
                load.status = next;
                transitioned += 1;
            }
        });

        let now = Utc::now();
        let expired = self.loads.retain(|load| !is_expired(load, now));

        tracing::info!(
            transitioned,
            expired,
            total = self.loads.len(),
            "Ghost load optimization complete"
        );
        transitioned
    }

    // ============ Accessors ============

    /// Loads, best opportunity first, optionally restricted to one region.
    pub fn global_ghost_loads(&self, region: Option<Region>, limit: usize) -> Vec<GhostLoad> {
        let mut loads = self
            .loads
            .filter(|load| region.map_or(true, |r| load.region == r));
        loads.sort_by(|a, b| {
            opportunity_score(b)
                .total_cmp(&opportunity_score(a))
                .then_with(|| a.id.cmp(&b.id))
        });
        loads.truncate(limit);
        loads
    }

    pub fn ghost_load(&self, id: Uuid) -> Option<GhostLoad> {
        self.loads.get(&id)
    }

    pub fn load_count(&self) -> usize {
        self.loads.len()
    }

    /// One entry per region, in `Region::ALL` order, including empty regions.
    pub fn regional_summary(&self) -> Vec<RegionSummary> {
        let loads = self.loads.values();
        Region::ALL
            .iter()
            .map(|&region| {
                let in_region: Vec<&GhostLoad> =
                    loads.iter().filter(|l| l.region == region).collect();
                let load_count = in_region.len();
                let average_opportunity = if load_count == 0 {
                    0.0
                } else {
                    in_region.iter().map(|l| opportunity_score(l)).sum::<f64>() / load_count as f64
                };
                RegionSummary {
                    region,
                    load_count,
                    average_opportunity,
                    total_posted_value: in_region.iter().map(|l| l.posted_rate).sum(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn load(status: LoadStatus, match_scores: &[f64]) -> GhostLoad {
        GhostLoad {
            id: Uuid::new_v4(),
            region: Region::Europe,
            origin: "Lyon, FR".to_string(),
            destination: "Milan, IT".to_string(),
            distance_miles: 280,
            posted_rate: 1000.0,
            market_rate: 1000.0,
            urgency: UrgencyLevel::Low,
            status,
            matches: match_scores
                .iter()
                .map(|&s| CarrierMatch {
                    carrier_name: "Atlas Reefer".to_string(),
                    match_score: s,
                    estimated_pickup_hours: 4,
                })
                .collect(),
            discovered_at: Utc::now(),
        }
    }

    #[test]
    fn test_urgency_bands() {
        assert_eq!(urgency_for(3), UrgencyLevel::Critical);
        assert_eq!(urgency_for(24), UrgencyLevel::High);
        assert_eq!(urgency_for(30), UrgencyLevel::Medium);
        assert_eq!(urgency_for(72), UrgencyLevel::Low);
    }

    #[test]
    fn test_opportunity_score() {
        let mut l = load(LoadStatus::Discovered, &[]);
        assert!((opportunity_score(&l) - 0.5).abs() < 1e-9);

        l.posted_rate = 1200.0;
        l.urgency = UrgencyLevel::Critical;
        assert!((opportunity_score(&l) - 0.85).abs() < 1e-9);

        l.market_rate = 0.0;
        assert!((opportunity_score(&l) - 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_status_guards() {
        assert_eq!(next_status(&load(LoadStatus::Discovered, &[])), LoadStatus::Analyzing);
        assert_eq!(next_status(&load(LoadStatus::Analyzing, &[])), LoadStatus::Analyzing);
        assert_eq!(next_status(&load(LoadStatus::Analyzing, &[0.6])), LoadStatus::Matching);
        assert_eq!(next_status(&load(LoadStatus::Matching, &[0.6, 0.7])), LoadStatus::Matching);
        assert_eq!(next_status(&load(LoadStatus::Matching, &[0.6, 0.85])), LoadStatus::Assigned);
        assert_eq!(next_status(&load(LoadStatus::Assigned, &[0.9])), LoadStatus::Assigned);
    }

    #[test]
    fn test_generated_load_shape() {
        let mut rng = SmallRng::seed_from_u64(11);
        for region in Region::ALL {
            let l = generate_ghost_load(region, &mut rng);
            assert_eq!(l.region, region);
            assert_eq!(l.status, LoadStatus::Discovered);
            assert!((2..=4).contains(&l.matches.len()));
            assert!(l.posted_rate > 0.0 && l.market_rate > 0.0);
        }
    }

    #[test]
    fn test_discovery_covers_every_region() {
        let engine = GhostLoadEngine::new(Some(5));
        assert_eq!(engine.discovery_tick(), Region::ALL.len());

        let summary = engine.regional_summary();
        assert_eq!(summary.len(), 7);
        assert!(summary.iter().all(|s| s.load_count == 1));

        let europe = engine.global_ghost_loads(Some(Region::Europe), 10);
        assert_eq!(europe.len(), 1);
        assert_eq!(engine.ghost_load(europe[0].id), Some(europe[0].clone()));
    }

    #[test]
    fn test_optimization_progresses_until_stable() {
        let engine = GhostLoadEngine::new(Some(6));
        engine.discovery_tick();

        assert_eq!(engine.optimization_tick(), 7); // all Discovered → Analyzing
        assert_eq!(engine.optimization_tick(), 7); // all have matches → Matching
        engine.optimization_tick();
        assert_eq!(engine.optimization_tick(), 0);

        for l in engine.global_ghost_loads(None, 100) {
            let expected = if best_match_score(&l).unwrap_or(0.0) >= ASSIGNMENT_THRESHOLD {
                LoadStatus::Assigned
            } else {
                LoadStatus::Matching
            };
            assert_eq!(l.status, expected);
        }
    }

    #[test]
    fn test_expired_assignments_are_pruned() {
        let engine = GhostLoadEngine::new(Some(8));

        let mut stale = load(LoadStatus::Assigned, &[0.9]);
        stale.discovered_at = Utc::now() - ChronoDuration::hours(ASSIGNED_RETENTION_HOURS + 1);
        let mut stale_matching = load(LoadStatus::Matching, &[0.6]);
        stale_matching.discovered_at = stale.discovered_at;
        let fresh = load(LoadStatus::Assigned, &[0.9]);

        for l in [&stale, &stale_matching, &fresh] {
            engine.loads.insert_new(l.id, l.clone());
        }
        assert!(is_expired(&stale, Utc::now()));
        assert!(!is_expired(&fresh, Utc::now()));

        engine.optimization_tick();
        assert_eq!(engine.load_count(), 2);
        assert!(engine.ghost_load(stale.id).is_none());
        assert!(engine.ghost_load(stale_matching.id).is_some());
        assert!(engine.ghost_load(fresh.id).is_some());
    }
}
