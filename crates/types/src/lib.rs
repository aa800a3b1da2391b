use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use utoipa::ToSchema;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash, PartialOrd, Ord,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

/// Reads an integer tunable from the environment, falling back to `default`
/// when unset or unparseable, matching `api::config`'s `SCHOOLOPS__` scheme.
fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

id_newtype!(ParentId);
id_newtype!(TeacherId);
id_newtype!(TimeslotId);
id_newtype!(StudentId);
id_newtype!(ClassId);

// ---------------------------------------------------------------------------
// Scheduling domain (Core A)
// ---------------------------------------------------------------------------

/// A single parent's request: which teachers they want to meet, and which
/// slots they'd prefer for any of those meetings.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct ParentPreference {
    pub parent: ParentId,
    pub teachers: Vec<TeacherId>,
    pub preferred_slots: Vec<TimeslotId>,
}

/// The derived `(parent, teacher)` pair the flow graph actually schedules.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
pub struct MeetingRequest {
    pub parent: ParentId,
    pub teacher: TeacherId,
}

/// Tunables for the gadget formulation (A1/A2).
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct GadgetParams {
    #[serde(default = "GadgetParams::default_reward")]
    pub preferred_reward: i64,
    #[serde(default = "GadgetParams::default_drop_penalty")]
    pub drop_penalty: i64,
}

impl GadgetParams {
    fn default_reward() -> i64 {
        env_i64("SCHOOLOPS__PARAMS__PREFERRED_REWARD", 10)
    }
    fn default_drop_penalty() -> i64 {
        env_i64("SCHOOLOPS__PARAMS__DROP_PENALTY", 1000)
    }
}

impl Default for GadgetParams {
    fn default() -> Self {
        Self {
            preferred_reward: Self::default_reward(),
            drop_penalty: Self::default_drop_penalty(),
        }
    }
}

/// The full request body for `/v1/schedule/solve` (gadget form).
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct ScheduleEnvelope {
    pub time_slots: Vec<TimeslotId>,
    pub teachers: Vec<TeacherId>,
    pub parent_preferences: Vec<ParentPreference>,
    #[serde(default)]
    pub params: GadgetParams,
    /// compute suggestions for every non-preferred assignment eagerly
    #[serde(default = "ScheduleEnvelope::default_true")]
    pub with_suggestions: bool,
}

impl ScheduleEnvelope {
    fn default_true() -> bool {
        true
    }
}

/// Flat per-(parent, teacher, preferred-slot) row — the aggregator form's
/// input shape (§4.3); each tuple feeds the same meeting-request identity.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct MeetingRequestRow {
    pub parent: ParentId,
    pub teacher: TeacherId,
    pub preferred_slot: TimeslotId,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct AggregatorParams {
    #[serde(default = "AggregatorParams::default_drop_penalty")]
    pub drop_penalty: i64,
    #[serde(default = "AggregatorParams::default_reschedule_penalty")]
    pub reschedule_penalty: i64,
    #[serde(default = "AggregatorParams::default_parent_bonus")]
    pub parent_bonus: i64,
}

impl AggregatorParams {
    fn default_drop_penalty() -> i64 {
        env_i64("SCHOOLOPS__PARAMS__AGGREGATOR_DROP_PENALTY", 1000)
    }
    fn default_reschedule_penalty() -> i64 {
        env_i64("SCHOOLOPS__PARAMS__RESCHEDULE_PENALTY", 50)
    }
    fn default_parent_bonus() -> i64 {
        env_i64("SCHOOLOPS__PARAMS__PARENT_BONUS", 20)
    }
}

impl Default for AggregatorParams {
    fn default() -> Self {
        Self {
            drop_penalty: Self::default_drop_penalty(),
            reschedule_penalty: Self::default_reschedule_penalty(),
            parent_bonus: Self::default_parent_bonus(),
        }
    }
}

/// The request body for `/v1/schedule/solve` (aggregator form).
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct AggregatorEnvelope {
    pub meeting_requests: Vec<MeetingRequestRow>,
    pub teacher_slots: std::collections::HashMap<String, Vec<TimeslotId>>,
    pub global_timeslots: Vec<TimeslotId>,
    #[serde(default)]
    pub params: AggregatorParams,
}

/// One scheduled (or dropped) meeting in the decoded result.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct MeetingOutcome {
    pub parent: ParentId,
    pub teacher: TeacherId,
    pub timeslot: Option<TimeslotId>,
    pub preferred: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct ScheduleResult {
    pub status: String,
    pub total_reward: i64,
    pub assignments: Vec<MeetingOutcome>,
    pub drops: Vec<MeetingRequest>,
    pub stats: serde_json::Value,
}

/// A single query to the Suggestion Engine (A4).
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct SuggestRequest {
    pub time_slots: Vec<TimeslotId>,
    pub preferred_slots: Vec<TimeslotId>,
    pub teacher: TeacherId,
    pub parent: ParentId,
    /// all currently-scheduled meetings, to derive busy sets from
    pub schedule: Vec<MeetingOutcome>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct SuggestResponse {
    pub feasible_slots: Vec<TimeslotId>,
}

// ---------------------------------------------------------------------------
// Class-assignment domain (Core B)
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    M,
    F,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct Student {
    pub id: StudentId,
    #[serde(default)]
    pub preferences: Vec<StudentId>,
    #[serde(default)]
    pub sex: Option<Sex>,
    /// named boolean flags, e.g. `{"needs_support": true}`
    #[serde(default)]
    pub categorical: std::collections::HashMap<String, bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct ClassDef {
    pub id: ClassId,
    pub capacity: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Default)]
pub struct GenderRatio {
    pub m: f64,
    pub f: f64,
}

/// Replaces the source's overloaded `(optional_parameter, parameter_concentration)`
/// pair with a sum type, per the redesign note: each constraint names its own
/// attribute and mode, and up to two may be supplied independently.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CategoricalConstraint {
    Concentrate { attribute: String },
    Spread { attribute: String },
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Default)]
pub struct ClassConstraints {
    #[serde(default)]
    pub gender_ratio: Option<GenderRatio>,
    /// at most two, per spec
    #[serde(default)]
    pub categorical: Vec<CategoricalConstraint>,
    #[serde(default)]
    pub time_limit_secs: Option<u64>,
    #[serde(default)]
    pub cluster_threshold: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct ClassEnvelope {
    pub students: Vec<Student>,
    pub classes: Vec<ClassDef>,
    #[serde(default)]
    pub constraints: ClassConstraints,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Clustered,
    Random,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct ClassResult {
    pub status: String,
    pub strategy: Strategy,
    pub objective: f64,
    pub assignments: std::collections::HashMap<String, Vec<StudentId>>,
    pub unassigned: Vec<StudentId>,
    pub stats: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Job envelope, shared across both domains
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What an enqueued job produces once it runs, generalized over both
/// problem families behind one job queue.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobOutcome {
    Schedule(ScheduleResult),
    Classes(ClassResult),
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done { result: JobOutcome },
    Failed { message: String },
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ScheduleEnvelope {
    pub fn timeslot_set(&self) -> HashSet<&TimeslotId> {
        self.time_slots.iter().collect()
    }
}
