//! Session detector - picks the log file to follow for one channel
//!
//! The detector is a two-state machine (idle / active). Every directory scan
//! is fed through [`SessionDetector::update`], which returns an event when
//! the followed file changes.

mod scan;

pub use scan::{parse_file_name, scan_candidates, scan_with_timeout};

use crate::core::{ChannelConfig, LogChannel, LogSession, SwitchPolicy};
use chrono::{DateTime, Utc};

/// Why the active session changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchKind {
    /// A different character or the first session after idle
    NewSession,
    /// Same character joined a newer fleet
    Refleet,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Switched {
        session: LogSession,
        previous: Option<LogSession>,
        kind: SwitchKind,
    },
    WentIdle {
        previous: LogSession,
    },
}

#[derive(Debug)]
pub struct SessionDetector {
    channel: LogChannel,
    policy: SwitchPolicy,
    character: Option<String>,
    active: Option<LogSession>,
}

impl SessionDetector {
    pub fn new(channel: LogChannel, config: &ChannelConfig) -> Self {
        Self {
            channel,
            policy: config.switch_policy,
            character: config.character.clone(),
            active: None,
        }
    }

    pub fn channel(&self) -> LogChannel {
        self.channel
    }

    pub fn active(&self) -> Option<&LogSession> {
        self.active.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    /// Note a new line in the active session
    pub fn record_activity(&mut self, at: DateTime<Utc>) {
        if let Some(active) = self.active.as_mut() {
            if at > active.last_activity {
                active.last_activity = at;
            }
        }
    }

    /// Update the active session's solar system (Local channel)
    pub fn set_solar_system(&mut self, system: &str) {
        if let Some(active) = self.active.as_mut() {
            if active.solar_system.as_deref() != Some(system) {
                log::info!("{} Solar system: {}", self.channel.tag(), system);
                active.solar_system = Some(system.to_string());
            }
        }
    }

    fn is_eligible(&self, candidate: &LogSession, now: DateTime<Utc>) -> bool {
        candidate.channel == self.channel
            && !candidate.is_stale_at(now)
            && self
                .character
                .as_ref()
                .map_or(true, |name| name == &candidate.character_name)
    }

    /// Apply one scan result; returns an event when the active session changes
    pub fn update(&mut self, candidates: &[LogSession], now: DateTime<Utc>) -> Option<SessionEvent> {
        let eligible: Vec<&LogSession> = candidates
            .iter()
            .filter(|c| self.is_eligible(c, now))
            .collect();

        // Refresh the active session's activity from its latest metadata
        if let Some(active) = self.active.as_mut() {
            if let Some(current) = eligible.iter().find(|c| c.file_path == active.file_path) {
                if current.last_activity > active.last_activity {
                    active.last_activity = current.last_activity;
                }
                if current.solar_system.is_some() {
                    active.solar_system = current.solar_system.clone();
                }
            }
        }
        let active_eligible = self
            .active
            .as_ref()
            .is_some_and(|active| !active.is_stale_at(now) && self.is_eligible(active, now));

        // A fresh active session missing from one scan (locked, unreadable) is kept
        let mut pool = eligible.clone();
        if let Some(active) = self.active.as_ref() {
            if active_eligible && !pool.iter().any(|c| c.file_path == active.file_path) {
                pool.push(active);
            }
        }

        let newest = pool
            .iter()
            .copied()
            .max_by(|a, b| a.start_time.cmp(&b.start_time).then(a.last_activity.cmp(&b.last_activity)));

        let target: Option<LogSession> = match (self.policy, self.active.as_ref()) {
            (SwitchPolicy::Sticky, Some(active)) if active_eligible => eligible
                .iter()
                .copied()
                .filter(|c| c.character_name == active.character_name && c.start_time > active.start_time)
                .max_by_key(|c| c.start_time)
                .cloned()
                .or_else(|| Some(active.clone())),
            _ => newest.cloned(),
        };

        match (target, self.active.take()) {
            (None, None) => None,
            (None, Some(previous)) => {
                log::info!("{} {} went stale, channel idle", self.channel.tag(), previous);
                Some(SessionEvent::WentIdle { previous })
            }
            (Some(session), Some(previous)) if session.file_path == previous.file_path => {
                self.active = Some(previous);
                None
            }
            (Some(session), previous) => {
                let kind = match &previous {
                    Some(prev)
                        if prev.character_name == session.character_name
                            && session.start_time > prev.start_time =>
                    {
                        SwitchKind::Refleet
                    }
                    _ => SwitchKind::NewSession,
                };
                log::info!(
                    "{} Following {} ({}, {:?})",
                    self.channel.tag(),
                    session.file_path.display(),
                    session,
                    kind
                );
                self.active = Some(session.clone());
                Some(SessionEvent::Switched {
                    session,
                    previous,
                    kind,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::path::PathBuf;

    fn candidate(name: &str, character: &str, start: DateTime<Utc>, last: DateTime<Utc>) -> LogSession {
        LogSession {
            file_path: PathBuf::from(format!("/logs/{}.txt", name)),
            channel: LogChannel::Fleet,
            character_name: character.to_string(),
            character_id: None,
            start_time: start,
            last_activity: last,
            fleet_instance_id: name.to_string(),
            solar_system: None,
        }
    }

    fn detector(policy: SwitchPolicy) -> SessionDetector {
        SessionDetector::new(
            LogChannel::Fleet,
            &ChannelConfig {
                switch_policy: policy,
                ..ChannelConfig::default()
            },
        )
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_idle_until_candidate() {
        let mut d = detector(SwitchPolicy::Newest);
        assert!(d.update(&[], now()).is_none());
        assert!(d.is_idle());

        let t = now();
        let first = candidate("Fleet_a", "Kira", t - Duration::minutes(5), t);
        match d.update(&[first.clone()], t) {
            Some(SessionEvent::Switched { session, previous, kind }) => {
                assert_eq!(session, first);
                assert!(previous.is_none());
                assert_eq!(kind, SwitchKind::NewSession);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(d.update(&[first], t).is_none());
    }

    #[test]
    fn test_stale_first_file_not_selected() {
        let t = now();
        let first = candidate("Fleet_1", "Kira", t - Duration::minutes(45), t - Duration::minutes(35));
        let second = candidate("Fleet_2", "Kira", t - Duration::minutes(35), t - Duration::minutes(1));

        for policy in [SwitchPolicy::Newest, SwitchPolicy::Sticky] {
            let mut d = detector(policy);
            d.update(&[first.clone(), second.clone()], t);
            assert_eq!(d.active().unwrap().fleet_instance_id, "Fleet_2");
        }
    }

    #[test]
    fn test_refleet_supersedes_immediately() {
        let t = now();
        let old = candidate("Fleet_1", "Kira", t - Duration::minutes(20), t - Duration::seconds(50));
        let new = candidate("Fleet_2", "Kira", t - Duration::seconds(40), t);

        for policy in [SwitchPolicy::Newest, SwitchPolicy::Sticky] {
            let mut d = detector(policy);
            d.update(&[old.clone()], t - Duration::seconds(45));
            match d.update(&[old.clone(), new.clone()], t) {
                Some(SessionEvent::Switched { session, previous, kind }) => {
                    assert_eq!(session.fleet_instance_id, "Fleet_2");
                    assert_eq!(previous.unwrap().fleet_instance_id, "Fleet_1");
                    assert_eq!(kind, SwitchKind::Refleet);
                }
                other => panic!("{:?}: unexpected {:?}", policy, other),
            }
        }
    }

    #[test]
    fn test_sticky_keeps_current_for_other_character() {
        let t = now();
        let mine = candidate("Fleet_1", "Kira", t - Duration::minutes(20), t);
        let alt = candidate("Fleet_2", "Alt", t - Duration::minutes(2), t);

        let mut sticky = detector(SwitchPolicy::Sticky);
        sticky.update(&[mine.clone()], t);
        assert!(sticky.update(&[mine.clone(), alt.clone()], t).is_none());
        assert_eq!(sticky.active().unwrap().character_name, "Kira");

        let mut newest = detector(SwitchPolicy::Newest);
        newest.update(&[mine.clone()], t);
        match newest.update(&[mine, alt], t) {
            Some(SessionEvent::Switched { kind, .. }) => assert_eq!(kind, SwitchKind::NewSession),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_goes_idle_when_stale() {
        let t = now();
        let only = candidate("Fleet_1", "Kira", t - Duration::minutes(40), t - Duration::minutes(10));
        let mut d = detector(SwitchPolicy::Newest);
        d.update(&[only.clone()], t);

        let later = t + Duration::minutes(25);
        match d.update(&[only], later) {
            Some(SessionEvent::WentIdle { previous }) => assert_eq!(previous.fleet_instance_id, "Fleet_1"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(d.is_idle());
    }

    #[test]
    fn test_fresh_session_survives_missed_scan() {
        let t = now();
        let mine = candidate("Fleet_2", "Kira", t - Duration::minutes(5), t);
        let older = candidate("Fleet_1", "Alt", t - Duration::minutes(20), t);

        for policy in [SwitchPolicy::Newest, SwitchPolicy::Sticky] {
            let mut d = detector(policy);
            d.update(&[mine.clone()], t);

            assert!(d.update(&[], t + Duration::seconds(10)).is_none(), "{:?}", policy);
            assert!(!d.is_idle());
            assert!(d.update(&[older.clone()], t + Duration::seconds(20)).is_none(), "{:?}", policy);
            assert_eq!(d.active().unwrap().fleet_instance_id, "Fleet_2");
            assert!(d.update(&[mine.clone()], t + Duration::seconds(30)).is_none(), "{:?}", policy);
        }
    }

    #[test]
    fn test_recorded_activity_keeps_session_alive() {
        let t = now();
        let only = candidate("Fleet_1", "Kira", t - Duration::minutes(40), t - Duration::minutes(10));
        let mut d = detector(SwitchPolicy::Newest);
        d.update(&[only.clone()], t);

        let refreshed = LogSession {
            last_activity: t + Duration::minutes(20),
            ..only
        };
        d.record_activity(t + Duration::minutes(20));
        assert!(d.update(&[refreshed], t + Duration::minutes(25)).is_none());
        assert!(!d.is_idle());
    }

    #[test]
    fn test_pinned_character() {
        let t = now();
        let kira = candidate("Fleet_1", "Kira", t - Duration::minutes(20), t);
        let alt = candidate("Fleet_2", "Alt", t - Duration::minutes(2), t);
        let mut d = SessionDetector::new(
            LogChannel::Fleet,
            &ChannelConfig {
                character: Some("Kira".to_string()),
                ..ChannelConfig::default()
            },
        );
        d.update(&[kira, alt], t);
        assert_eq!(d.active().unwrap().character_name, "Kira");
    }

    #[test]
    fn test_local_system_updates() {
        let t = now();
        let mut d = SessionDetector::new(LogChannel::Local, &ChannelConfig::default());
        let mut local = candidate("Local_1", "Kira", t - Duration::minutes(2), t);
        local.channel = LogChannel::Local;
        d.update(&[local], t);
        d.set_solar_system("Jita");
        assert_eq!(d.active().unwrap().solar_system.as_deref(), Some("Jita"));
    }
}
