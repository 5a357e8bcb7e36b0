//! Autonomous customer acquisition.
//!
//! Keeps a registry of simulated shipper/broker prospects and outreach
//! campaigns. Scheduled ticks discover new prospects, advance relationship
//! stages and grow campaign counters. The decisions behind each tick are
//! pure functions below; the engine methods only draw randomness, call them,
//! and write the results back to the registries.

use crate::cache_validator::{cache_key, ValidatedCache};
use crate::completion_client::{CompletionClient, CompletionStatus};
use crate::errors::AppError;
use crate::models::*;
use crate::registry::Registry;
use crate::simulation::{pick, random_id, unit, SimRng};
use crate::validation::{is_valid_email, validate_us_phone};
use chrono::{Duration as ChronoDuration, Utc};
use rand::rngs::SmallRng;
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

pub const PROSPECTS_PER_DISCOVERY: usize = 3;
pub const SEED_PROSPECTS: usize = 10;
pub const CAMPAIGN_BATCH: u64 = 200;
/// Share of a prospect's freight spend we expect to capture as revenue.
pub const TAKE_RATE: f64 = 0.15;
pub const FALLBACK_QUALIFICATION_SCORE: f64 = 75.0;

const QUALIFICATION_SYSTEM_PROMPT: &str = "You qualify freight shipping prospects for a \
trucking carrier's sales team. Reply with a single JSON object with the keys \
\"score\" (0-100), \"tier\" (hot, warm or cold), \"reasoning\" (one sentence) and \
\"recommendedAction\" (snake_case verb phrase).";

// ============ Pure decision functions ============

/// Lead score in `[0, 1]` from an explicit feature vector.
///
/// Weights: volume 0.35, rate 0.25, lanes 0.15, tenure 0.10, payment 0.15.
/// Each component is normalised against a cap (200 loads/month, $5,000/load,
/// 50 lanes, 20 years) before weighting.
pub fn score_prospect(features: &ProspectFeatures) -> f64 {
    let volume = unit(features.monthly_loads as f64 / 200.0);
    let rate = unit(features.average_rate / 5000.0);
    let lanes = unit(features.lanes_served as f64 / 50.0);
    let tenure = unit(features.years_in_business as f64 / 20.0);
    let payment = unit(features.payment_score);

    unit(0.35 * volume + 0.25 * rate + 0.15 * lanes + 0.10 * tenure + 0.15 * payment)
}

/// Annualised revenue we expect from the account; never negative.
pub fn expected_revenue(features: &ProspectFeatures) -> f64 {
    let rate = if features.average_rate.is_finite() {
        features.average_rate.max(0.0)
    } else {
        0.0
    };
    features.monthly_loads as f64 * rate * 12.0 * TAKE_RATE
}

/// Blends the lead score with an optional qualification score (0-100).
pub fn conversion_probability(lead_score: f64, qualification_score: Option<f64>) -> f64 {
    match qualification_score {
        Some(q) => unit(0.6 * unit(lead_score) + 0.4 * unit(q / 100.0)),
        None => unit(lead_score),
    }
}

/// How readily a prospect leaves `stage`; `Active` never does.
pub fn stage_factor(stage: RelationshipStage) -> f64 {
    match stage {
        RelationshipStage::Prospect => 0.6,
        RelationshipStage::Contacted => 0.45,
        RelationshipStage::Negotiating => 0.3,
        RelationshipStage::Onboarded => 0.5,
        RelationshipStage::Active => 0.0,
    }
}

/// Advances at most one stage.
///
/// The prospect moves on when `draw < conversion_probability * stage_factor`.
/// Stages are never skipped and never regress.
pub fn next_stage(
    stage: RelationshipStage,
    conversion_probability: f64,
    draw: f64,
) -> RelationshipStage {
    match stage.next() {
        Some(next) if draw < unit(conversion_probability) * stage_factor(stage) => next,
        _ => stage,
    }
}

/// Adds `batch` sends and recomputes the derived counters.
///
/// Opened is a quarter of sent, clicked a twentieth, responded a hundredth,
/// all rounded down.
pub fn project_campaign_metrics(metrics: &CampaignMetrics, batch: u64) -> CampaignMetrics {
    let sent = metrics.sent.saturating_add(batch);
    CampaignMetrics {
        sent,
        opened: sent / 4,
        clicked: sent / 20,
        responded: sent / 100,
    }
}

pub fn qualification_tier(score: f64) -> &'static str {
    if score >= 80.0 {
        "hot"
    } else if score >= 60.0 {
        "warm"
    } else {
        "cold"
    }
}

/// Canned qualification used whenever the completion API is unavailable.
pub fn fallback_qualification() -> Qualification {
    Qualification {
        score: FALLBACK_QUALIFICATION_SCORE,
        tier: qualification_tier(FALLBACK_QUALIFICATION_SCORE).to_string(),
        reasoning: "Automated qualification unavailable; default score applied".to_string(),
        recommended_action: "schedule_discovery_call".to_string(),
        source: QualificationSource::Fallback,
    }
}

/// Model reply; key spellings vary between models.
#[derive(Debug, Clone, Deserialize)]
struct QualificationReply {
    #[serde(alias = "qualification_score", alias = "qualificationScore")]
    score: f64,
    #[serde(default)]
    tier: Option<String>,
    #[serde(default)]
    reasoning: String,
    #[serde(default, rename = "recommendedAction", alias = "recommended_action")]
    recommended_action: String,
}

impl QualificationReply {
    fn from_fallback(q: &Qualification) -> Self {
        Self {
            score: q.score,
            tier: Some(q.tier.clone()),
            reasoning: q.reasoning.clone(),
            recommended_action: q.recommended_action.clone(),
        }
    }

    fn into_qualification(self, source: QualificationSource) -> Qualification {
        let score = if self.score.is_finite() {
            self.score.clamp(0.0, 100.0)
        } else {
            FALLBACK_QUALIFICATION_SCORE
        };
        let tier = self
            .tier
            .map(|t| t.trim().to_lowercase())
            .filter(|t| matches!(t.as_str(), "hot" | "warm" | "cold"))
            .unwrap_or_else(|| qualification_tier(score).to_string());
        let recommended_action = if self.recommended_action.trim().is_empty() {
            "schedule_discovery_call".to_string()
        } else {
            self.recommended_action
        };

        Qualification {
            score,
            tier,
            reasoning: self.reasoning,
            recommended_action,
            source,
        }
    }
}

fn qualification_prompt(prospect: &Prospect) -> String {
    format!(
        "Company: {}\nIndustry: {}\nMonthly loads: {}\nAverage rate per load: ${:.0}\n\
Lanes served: {}\nYears in business: {}\nPayment score: {:.2}\nLead score: {:.2}",
        prospect.company,
        prospect.industry,
        prospect.features.monthly_loads,
        prospect.features.average_rate,
        prospect.features.lanes_served,
        prospect.features.years_in_business,
        prospect.features.payment_score,
        score_prospect(&prospect.features),
    )
}

/// Applies a qualification to a prospect, refreshing its conversion probability.
pub fn apply_qualification(prospect: &mut Prospect, qualification: Qualification) {
    prospect.conversion_probability = conversion_probability(
        score_prospect(&prospect.features),
        Some(qualification.score),
    );
    prospect.qualification = Some(qualification);
}

// ============ Synthetic data ============

const COMPANY_PREFIXES: [&str; 10] = [
    "Summit",
    "Blue Ridge",
    "Prairie",
    "Coastal",
    "Ironwood",
    "Redline",
    "Great Lakes",
    "Lone Star",
    "Cascade",
    "Keystone",
];
const COMPANY_SUFFIXES: [&str; 6] = [
    "Logistics",
    "Freight",
    "Distribution",
    "Supply Co.",
    "Manufacturing",
    "Foods",
];
const INDUSTRIES: [&str; 6] = [
    "food_and_beverage",
    "automotive",
    "retail",
    "construction",
    "chemicals",
    "agriculture",
];
const FIRST_NAMES: [&str; 8] = [
    "Maria", "James", "Priya", "Daniel", "Keisha", "Tom", "Elena", "Marcus",
];
const LAST_NAMES: [&str; 8] = [
    "Alvarez", "Nguyen", "Patel", "Okafor", "Brennan", "Schultz", "Kim", "Reyes",
];
const AREA_CODES: [u16; 8] = [312, 214, 404, 602, 615, 206, 313, 816];

const CAMPAIGNS: [(&str, &str, &str); 3] = [
    ("Midwest Reefer Capacity", "email", "food_and_beverage"),
    ("Flatbed Spring Push", "linkedin", "construction"),
    ("Dedicated Lane Offer", "phone", "retail"),
];

/// Fabricates one prospect at the `Prospect` stage.
pub fn generate_prospect(rng: &mut SmallRng) -> Prospect {
    let company = format!("{} {}", pick(rng, &COMPANY_PREFIXES), pick(rng, &COMPANY_SUFFIXES));
    let first = *pick(rng, &FIRST_NAMES);
    let last = *pick(rng, &LAST_NAMES);
    let domain: String = company
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();

    let features = ProspectFeatures {
        monthly_loads: rng.random_range(5..=250),
        average_rate: rng.random_range(800.0..4500.0),
        lanes_served: rng.random_range(1..=60),
        years_in_business: rng.random_range(1..=40),
        payment_score: rng.random_range(0.4..1.0),
    };
    let exchange: u16 = rng.random_range(200..=999);
    let line: u16 = rng.random_range(1000..=9999);

    Prospect {
        id: random_id(rng),
        contact: ProspectContact {
            name: format!("{} {}", first, last),
            email: format!("{}.{}@{}.com", first.to_lowercase(), last.to_lowercase(), domain),
            phone: format!("+1{}{}{}", pick(rng, &AREA_CODES), exchange, line),
        },
        company,
        industry: pick(rng, &INDUSTRIES).to_string(),
        expected_revenue: expected_revenue(&features),
        conversion_probability: conversion_probability(score_prospect(&features), None),
        features,
        relationship_stage: RelationshipStage::Prospect,
        qualification: None,
        discovered_at: Utc::now(),
        last_contacted_at: None,
    }
}

// ============ Engine ============

pub struct AcquisitionEngine {
    prospects: Registry<Uuid, Prospect>,
    campaigns: Registry<Uuid, Campaign>,
    completion: Option<CompletionClient>,
    qualification_cache: ValidatedCache<Qualification>,
    rng: SimRng,
}

impl AcquisitionEngine {
    pub fn new(completion: Option<CompletionClient>, seed: Option<u64>) -> Self {
        Self {
            prospects: Registry::new(),
            campaigns: Registry::new(),
            completion,
            qualification_cache: ValidatedCache::new(Duration::from_secs(86400), 10_000),
            rng: SimRng::new(seed, 1),
        }
    }

    /// Initial population: unqualified prospects and the standing campaigns.
    pub fn seed(&self) {
        let prospects: Vec<Prospect> = self
            .rng
            .with(|rng| (0..SEED_PROSPECTS).map(|_| generate_prospect(rng)).collect());
        for prospect in prospects {
            self.prospects.insert_new(prospect.id, prospect);
        }

        let now = Utc::now();
        for (i, (name, channel, segment)) in CAMPAIGNS.iter().enumerate() {
            let campaign = Campaign {
                id: self.rng.id(),
                name: name.to_string(),
                channel: channel.to_string(),
                target_segment: segment.to_string(),
                metrics: CampaignMetrics::default(),
                started_at: now - ChronoDuration::days(i as i64),
            };
            self.campaigns.insert_new(campaign.id, campaign);
        }

        tracing::info!(
            prospects = self.prospects.len(),
            campaigns = self.campaigns.len(),
            "Acquisition engine seeded"
        );
    }

    /// Qualifies a prospect: validated cache, then completion API, then the
    /// canned fallback.
    pub async fn qualify(&self, prospect: &Prospect) -> Qualification {
        let key = cache_key(&[
            &prospect.company,
            &prospect.features.monthly_loads.to_string(),
            &format!("{:.0}", prospect.features.average_rate),
        ]);

        if let Some(mut cached) = self.qualification_cache.get(&key).await {
            tracing::debug!("Qualification cache HIT for {}", prospect.company);
            cached.source = QualificationSource::Cached;
            return cached;
        }

        let Some(client) = &self.completion else {
            return fallback_qualification();
        };

        let fallback = QualificationReply::from_fallback(&fallback_qualification());
        let (reply, from_api) = client
            .complete_json_or(
                QUALIFICATION_SYSTEM_PROMPT,
                &qualification_prompt(prospect),
                fallback,
            )
            .await;

        if !from_api {
            return fallback_qualification();
        }

        let qualification = reply.into_qualification(QualificationSource::Completion);
        self.qualification_cache.insert(key, &qualification).await;
        qualification
    }

    /// Fabricates, qualifies and registers new prospects. Returns how many
    /// were added.
    pub async fn discovery_tick(&self) -> usize {
        let drafts: Vec<Prospect> = self.rng.with(|rng| {
            (0..PROSPECTS_PER_DISCOVERY)
                .map(|_| generate_prospect(rng))
                .collect()
        });

        let mut added = 0;
        let mut fallbacks = 0;
        for mut prospect in drafts {
            let qualification = self.qualify(&prospect).await;
            if qualification.source == QualificationSource::Fallback {
                fallbacks += 1;
            }
            apply_qualification(&mut prospect, qualification);
            if self.prospects.insert_new(prospect.id, prospect) {
                added += 1;
            }
        }

        tracing::info!(
            added,
            fallbacks,
            total = self.prospects.len(),
            "Prospect discovery complete"
        );
        added
    }

    /// Gives every prospect one chance to advance. Returns how many moved.
    pub fn nurture_tick(&self) -> usize {
        let now = Utc::now();
        let mut advanced = 0;

        self.prospects.update_all(|prospect| {
            let draw = self.rng.draw();
            let next = next_stage(
                prospect.relationship_stage,
                prospect.conversion_probability,
                draw,
            );
            if next != prospect.relationship_stage {
                tracing::debug!(
                    company = %prospect.company,
                    from = prospect.relationship_stage.as_str(),
                    to = next.as_str(),
                    "Prospect advanced"
                );
                prospect.relationship_stage = next;
                prospect.last_contacted_at = Some(now);
                advanced += 1;
            }
        });

        tracing::info!(advanced, total = self.prospects.len(), "Nurture cycle complete");
        advanced
    }

    /// Sends one batch for every campaign. Returns total sent across campaigns.
    pub fn campaign_tick(&self) -> u64 {
        let mut total_sent = 0;
        self.campaigns.update_all(|campaign| {
            campaign.metrics = project_campaign_metrics(&campaign.metrics, CAMPAIGN_BATCH);
            total_sent += campaign.metrics.sent;
        });

        tracing::info!(
            campaigns = self.campaigns.len(),
            total_sent,
            "Campaign metrics updated"
        );
        total_sent
    }

    /// Registers a prospect supplied from outside the simulation.
    ///
    /// # Errors
    ///
    /// `AppError::BadRequest` when the company is blank, the email fails
    /// validation, the phone is not a valid NANP number, or a feature value
    /// is out of range.
    pub async fn register_prospect(&self, new: NewProspect) -> Result<Prospect, AppError> {
        let company = new.company.trim();
        if company.is_empty() {
            return Err(AppError::BadRequest("Company name is required".to_string()));
        }
        let email = new.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AppError::BadRequest(format!("Invalid email '{}'", new.email)));
        }
        let phone = validate_us_phone(&new.phone).map_err(AppError::BadRequest)?;
        let features = new.features;
        if !features.average_rate.is_finite() || features.average_rate < 0.0 {
            return Err(AppError::BadRequest(
                "Average rate must be a non-negative number".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&features.payment_score) {
            return Err(AppError::BadRequest(
                "Payment score must be between 0 and 1".to_string(),
            ));
        }

        let mut prospect = Prospect {
            id: self.rng.id(),
            company: company.to_string(),
            contact: ProspectContact {
                name: new.contact_name.trim().to_string(),
                email,
                phone,
            },
            industry: new.industry,
            features,
            expected_revenue: expected_revenue(&features),
            conversion_probability: conversion_probability(score_prospect(&features), None),
            relationship_stage: RelationshipStage::Prospect,
            qualification: None,
            discovered_at: Utc::now(),
            last_contacted_at: None,
        };

        let qualification = self.qualify(&prospect).await;
        apply_qualification(&mut prospect, qualification);

        if !self.prospects.insert_new(prospect.id, prospect.clone()) {
            return Err(AppError::InternalError(format!(
                "Prospect id {} already registered",
                prospect.id
            )));
        }

        tracing::info!(company = %prospect.company, "Prospect registered");
        Ok(prospect)
    }

    // ============ Accessors ============

    /// At most `n` prospects, highest expected revenue first.
    pub fn top_prospects(&self, n: usize) -> Vec<Prospect> {
        let mut prospects = self.prospects.values();
        sort_by_revenue(&mut prospects);
        prospects.truncate(n);
        prospects
    }

    pub fn prospects_by_stage(&self, stage: RelationshipStage) -> Vec<Prospect> {
        let mut prospects = self
            .prospects
            .filter(|p| p.relationship_stage == stage);
        sort_by_revenue(&mut prospects);
        prospects
    }

    pub fn prospect(&self, id: Uuid) -> Option<Prospect> {
        self.prospects.get(&id)
    }

    pub fn prospect_count(&self) -> usize {
        self.prospects.len()
    }

    /// Model and breaker state, `None` when running on fallback scores only.
    pub fn completion_status(&self) -> Option<CompletionStatus> {
        self.completion.as_ref().map(CompletionClient::status)
    }

    /// Campaigns, newest first.
    pub fn campaigns(&self) -> Vec<Campaign> {
        let mut campaigns = self.campaigns.values();
        campaigns.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(a.name.cmp(&b.name)));
        campaigns
    }

    pub fn pipeline_summary(&self) -> PipelineSummary {
        let prospects = self.prospects.values();
        let stages = RelationshipStage::ALL
            .iter()
            .map(|&stage| {
                let in_stage = prospects.iter().filter(|p| p.relationship_stage == stage);
                let (count, revenue) =
                    in_stage.fold((0, 0.0), |(c, r), p| (c + 1, r + p.expected_revenue));
                StageSummary {
                    stage,
                    count,
                    expected_revenue: revenue,
                }
            })
            .collect();

        PipelineSummary {
            total_prospects: prospects.len(),
            total_expected_revenue: prospects.iter().map(|p| p.expected_revenue).sum(),
            stages,
        }
    }
}

fn sort_by_revenue(prospects: &mut [Prospect]) {
    prospects.sort_by(|a, b| {
        b.expected_revenue
            .total_cmp(&a.expected_revenue)
            .then_with(|| a.id.cmp(&b.id))
    });
}
