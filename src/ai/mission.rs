//! Heist mission bookkeeping: heat, clock, time limit and one-shot escalation.

use serde::Serialize;

use crate::ai::director::HeistDirector;

pub const ESCALATION_HEAT: f32 = 100.0;
pub const ESCALATED_AGGRESSION: f32 = 1.5;

/// Something the mission wants the outside world to hear about.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum MissionEvent {
    Escalated { heat: f32, aggression: f32 },
    TimedOut { elapsed: f32 },
}

#[derive(Debug, Clone, Default)]
pub struct HeistMission {
    heat: f32,
    elapsed: f32,
    time_limit: Option<f32>, // s
    escalated: bool,
    timed_out: bool,
}

impl HeistMission {
    pub fn new(time_limit: Option<f32>) -> Self {
        Self {
            time_limit: time_limit.filter(|t| t.is_finite() && *t > 0.0),
            ..Self::default()
        }
    }

    pub fn heat(&self) -> f32 { self.heat }
    pub fn elapsed(&self) -> f32 { self.elapsed }
    pub fn time_limit(&self) -> Option<f32> { self.time_limit }
    pub fn is_escalated(&self) -> bool { self.escalated }

    pub fn add_heat(&mut self, amount: f32) {
        if amount.is_finite() {
            self.heat = (self.heat + amount).max(0.0);
        }
    }

    pub fn is_timed_out(&self) -> bool {
        self.time_limit.is_some_and(|limit| self.elapsed >= limit)
    }

    pub fn remaining(&self) -> Option<f32> {
        self.time_limit.map(|limit| (limit - self.elapsed).max(0.0))
    }

    /// Advance the clock, push heat into the director and escalate once.
    /// The director is ticked by the caller.
    pub fn tick(&mut self, dt: f32, director: &mut HeistDirector) -> Vec<MissionEvent> {
        let mut events = Vec::new();
        if !(dt.is_finite() && dt > 0.0) {
            return events;
        }

        self.elapsed += dt;
        director.set_heat(self.heat);

        if !self.escalated && self.heat > ESCALATION_HEAT {
            self.escalated = true;
            director.set_aggression(ESCALATED_AGGRESSION);
            tracing::info!(heat = self.heat, aggression = ESCALATED_AGGRESSION, "mission escalated");
            events.push(MissionEvent::Escalated {
                heat: self.heat,
                aggression: ESCALATED_AGGRESSION,
            });
        }

        if !self.timed_out && self.is_timed_out() {
            self.timed_out = true;
            tracing::info!(elapsed = self.elapsed, "mission time limit reached");
            events.push(MissionEvent::TimedOut { elapsed: self.elapsed });
        }

        events
    }

    pub fn reset(&mut self, director: &mut HeistDirector) {
        *self = Self::new(self.time_limit);
        director.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalates_once_past_threshold() {
        let mut mission = HeistMission::new(None);
        let mut director = HeistDirector::default();

        mission.add_heat(100.0);
        assert!(mission.tick(0.1, &mut director).is_empty());
        assert_eq!(director.aggression(), 1.0);

        mission.add_heat(0.5);
        let events = mission.tick(0.1, &mut director);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], MissionEvent::Escalated { aggression, .. } if aggression == 1.5));
        assert_eq!(director.aggression(), 1.5);

        mission.add_heat(50.0);
        assert!(mission.tick(0.1, &mut director).is_empty());
    }

    #[test]
    fn heat_feeds_director() {
        let mut mission = HeistMission::new(None);
        let mut director = HeistDirector::default();
        mission.add_heat(25.0);
        mission.tick(0.016, &mut director);
        assert_eq!(director.heat(), 25.0);
        mission.add_heat(-100.0);
        assert_eq!(mission.heat(), 0.0);
    }

    #[test]
    fn time_limit_fires_once() {
        let mut mission = HeistMission::new(Some(1.0));
        let mut director = HeistDirector::default();
        let mut fired = 0;
        for _ in 0..120 {
            fired += mission
                .tick(1.0 / 60.0, &mut director)
                .iter()
                .filter(|e| matches!(e, MissionEvent::TimedOut { .. }))
                .count();
        }
        assert!(mission.is_timed_out());
        assert_eq!(mission.remaining(), Some(0.0));
        assert_eq!(fired, 1);
    }

    #[test]
    fn untimed_missions_never_time_out() {
        let mut mission = HeistMission::new(Some(-3.0));
        let mut director = HeistDirector::default();
        mission.tick(10_000.0, &mut director);
        assert!(!mission.is_timed_out());
        assert_eq!(mission.remaining(), None);
    }

    #[test]
    fn reset_keeps_time_limit() {
        let mut mission = HeistMission::new(Some(30.0));
        let mut director = HeistDirector::default();
        mission.add_heat(200.0);
        mission.tick(1.0, &mut director);
        mission.reset(&mut director);
        assert_eq!(mission.heat(), 0.0);
        assert!(!mission.is_escalated());
        assert_eq!(mission.time_limit(), Some(30.0));
        assert_eq!(director.aggression(), 1.0);
    }
}
