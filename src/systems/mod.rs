mod ecology;
mod loop_timer;
mod metrics;
mod mystery;
mod verbs;

pub use ecology::{ActivityLevel, EcologyLogEntry, EcologyState, EcologyStatus};
pub use loop_timer::{LoopPhase, LoopReport, LoopTimer, LoopTimings};
pub use metrics::{MetricKind, MetricSample, Metrics, MetricsReport, Predictions};
pub use mystery::{generate_mystery_budget, Density, MapPoint, MysteryBudget, Visibility};
pub use verbs::{
    DecodePattern, DecodeVerb, ExcavateVerb, SampleVerb, ShadowVerb, Signal, TraceVerb, VerbKind,
    VerbOutcome, VerbPhase, VerbProgress, DECODE_PATTERNS, SHADOW_PATH,
};
