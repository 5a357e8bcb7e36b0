use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============ Customer Acquisition ============

/// Lifecycle label of a sales prospect.
///
/// Ordered: a prospect only ever moves one stage forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStage {
    Prospect,
    Contacted,
    Negotiating,
    Onboarded,
    Active,
}

impl RelationshipStage {
    pub const ALL: [RelationshipStage; 5] = [
        RelationshipStage::Prospect,
        RelationshipStage::Contacted,
        RelationshipStage::Negotiating,
        RelationshipStage::Onboarded,
        RelationshipStage::Active,
    ];

    /// The following stage, or `None` for `Active`.
    pub fn next(self) -> Option<Self> {
        match self {
            RelationshipStage::Prospect => Some(RelationshipStage::Contacted),
            RelationshipStage::Contacted => Some(RelationshipStage::Negotiating),
            RelationshipStage::Negotiating => Some(RelationshipStage::Onboarded),
            RelationshipStage::Onboarded => Some(RelationshipStage::Active),
            RelationshipStage::Active => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RelationshipStage::Prospect => "prospect",
            RelationshipStage::Contacted => "contacted",
            RelationshipStage::Negotiating => "negotiating",
            RelationshipStage::Onboarded => "onboarded",
            RelationshipStage::Active => "active",
        }
    }
}

/// Contact details for a prospect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProspectContact {
    pub name: String,
    pub email: String,
    /// E.164 formatted phone number.
    pub phone: String,
}

/// Inputs to the lead-scoring function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProspectFeatures {
    pub monthly_loads: u32,
    /// Average rate per load in USD.
    pub average_rate: f64,
    pub lanes_served: u32,
    pub years_in_business: u32,
    /// Payment history score between 0 and 1.
    pub payment_score: f64,
}

/// A simulated sales prospect (shipper or broker).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prospect {
    pub id: Uuid,
    pub company: String,
    pub contact: ProspectContact,
    pub industry: String,
    pub features: ProspectFeatures,
    /// Annualised revenue we expect from the account. Never negative.
    pub expected_revenue: f64,
    /// Probability in `[0, 1]`.
    pub conversion_probability: f64,
    pub relationship_stage: RelationshipStage,
    pub qualification: Option<Qualification>,
    pub discovered_at: DateTime<Utc>,
    pub last_contacted_at: Option<DateTime<Utc>>,
}

/// Intake payload for a prospect coming from outside the simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProspect {
    pub company: String,
    pub contact_name: String,
    pub email: String,
    pub phone: String,
    pub industry: String,
    pub features: ProspectFeatures,
}

/// Where a qualification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationSource {
    Completion,
    Cached,
    Fallback,
}

/// Result of qualifying a prospect. The fallback uses the same struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Qualification {
    /// Score between 0 and 100.
    pub score: f64,
    pub tier: String,
    pub reasoning: String,
    pub recommended_action: String,
    #[serde(default = "default_qualification_source")]
    pub source: QualificationSource,
}

fn default_qualification_source() -> QualificationSource {
    QualificationSource::Completion
}

/// Outreach counters of a campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignMetrics {
    pub sent: u64,
    pub opened: u64,
    pub clicked: u64,
    pub responded: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub channel: String,
    pub target_segment: String,
    pub metrics: CampaignMetrics,
    pub started_at: DateTime<Utc>,
}

/// Count and revenue of prospects in one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSummary {
    pub stage: RelationshipStage,
    pub count: usize,
    pub expected_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub total_prospects: usize,
    pub total_expected_revenue: f64,
    pub stages: Vec<StageSummary>,
}

// ============ Ghost Loads ============

/// Market region of a ghost load. There are exactly seven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    NorthAmerica,
    Europe,
    AsiaPacific,
    LatinAmerica,
    MiddleEast,
    Africa,
    Oceania,
}

impl Region {
    pub const ALL: [Region; 7] = [
        Region::NorthAmerica,
        Region::Europe,
        Region::AsiaPacific,
        Region::LatinAmerica,
        Region::MiddleEast,
        Region::Africa,
        Region::Oceania,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Region::NorthAmerica => "north_america",
            Region::Europe => "europe",
            Region::AsiaPacific => "asia_pacific",
            Region::LatinAmerica => "latin_america",
            Region::MiddleEast => "middle_east",
            Region::Africa => "africa",
            Region::Oceania => "oceania",
        }
    }
}

impl std::str::FromStr for Region {
    type Err = crate::errors::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|region| region.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::errors::AppError::BadRequest(format!("Unknown region '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Discovered,
    Analyzing,
    Matching,
    Assigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarrierMatch {
    pub carrier_name: String,
    /// Fit between 0 and 1.
    pub match_score: f64,
    pub estimated_pickup_hours: u32,
}

/// A synthetic freight shipment representing an undiscovered opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhostLoad {
    pub id: Uuid,
    pub region: Region,
    pub origin: String,
    pub destination: String,
    pub distance_miles: u32,
    /// Rate offered for the load, USD.
    pub posted_rate: f64,
    /// Prevailing market rate for the lane, USD.
    pub market_rate: f64,
    pub urgency: UrgencyLevel,
    pub status: LoadStatus,
    pub matches: Vec<CarrierMatch>,
    pub discovered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSummary {
    pub region: Region,
    pub load_count: usize,
    pub average_opportunity: f64,
    pub total_posted_value: f64,
}

// ============ Wellness ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    HighStress,
    SleepDeprivation,
    Fatigue,
    ExtendedHours,
}

/// Simulated health metrics of one driver. Metrics are on a 0-10 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellnessProfile {
    pub driver_id: String,
    pub stress_level: f64,
    pub sleep_quality: f64,
    pub fatigue_level: f64,
    pub hours_driven: f64,
    pub risk_factors: Vec<RiskFactor>,
    /// Overall score between 0 and 100, higher is healthier.
    pub wellness_score: f64,
    pub last_updated: DateTime<Utc>,
}

/// One monitoring sample applied to a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellnessReading {
    pub stress_delta: f64,
    pub sleep_delta: f64,
    pub fatigue_delta: f64,
    /// Hours driven during the current duty period.
    pub hours_driven: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
    BreathingExercise,
    RestBreak,
    SleepHygiene,
    CounselorCheckIn,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionMetrics {
    pub delivered: u32,
    pub acknowledged: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intervention {
    pub id: Uuid,
    pub driver_id: String,
    pub kind: InterventionKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub delivered: bool,
    pub engagement: InterventionMetrics,
}
