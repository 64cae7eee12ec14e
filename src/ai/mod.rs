//! ai - threat scoring, goal selection, tension direction and goal behaviors

pub mod behavior;
pub mod blackboard;
pub mod director;
pub mod mission;
pub mod motif;
pub mod threat;
pub mod utility;

pub use behavior::{AgentView, plan};
pub use blackboard::Blackboard;
pub use director::{DirectorConfig, HeistDirector};
pub use mission::{HeistMission, MissionEvent};
pub use motif::{Motif, MotifMix};
pub use threat::{ThreatEvaluator, ThreatScene, ThreatService, ThreatWeights};
pub use utility::{Goal, GoalScores, UtilityScorer, UtilityTable};
