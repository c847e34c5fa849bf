//! Single-owner aggregate for all cross-extractor run state. Extractors
//! submit [`Observation`]s; the tracker applies admission and merge rules
//! sequentially, which replaces ad-hoc locking on each shared field.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::notify::Notifier;

pub const START_PHASE: &str = "Start";
pub const UNKNOWN_BIOME: &str = "unknown";

const BASTION: &str = "Bastion";
const FORTRESS: &str = "Fortress";
const STRONGHOLD: &str = "Stronghold";
const NETHER_EXIT: &str = "Nether Exit";

/// In-game clock reading, recognized digit-by-digit from the HUD overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockReading {
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
}

impl ClockReading {
    /// Composes a reading from the seven digit slots, left to right.
    pub fn from_digits(digits: [u8; 7]) -> Self {
        Self {
            minute: digits[0] * 10 + digits[1],
            second: digits[2] * 10 + digits[3],
            millisecond: digits[4] as u16 * 100 + digits[5] as u16 * 10 + digits[6] as u16,
        }
    }
}

impl fmt::Display for ClockReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}.{:03}",
            self.minute, self.second, self.millisecond
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusKind {
    Loading,
    Generating,
    Died,
    Spectator,
}

/// A milestone's point of interest. `counter` is tri-state: 0 = not yet
/// confirmed, 1 = one confirming observation seen, -1 = confirmed with a
/// coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poi {
    pub phase: String,
    pub counter: i8,
    pub coord: Option<[i64; 3]>,
}

impl Poi {
    fn open(phase: &str) -> Self {
        Self {
            phase: phase.to_string(),
            counter: 0,
            coord: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.coord.is_none()
    }
}

/// One extractor's finding for a single tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Clock(ClockReading),
    Biome(String),
    /// Every milestone banner that cleared threshold this tick.
    Milestones(Vec<String>),
    Position([i64; 3]),
    /// Winning status label, reported every tick so transitions can be
    /// edge-triggered. `None` means no status screen is visible.
    Status(Option<StatusKind>),
}

/// Read-only view of the tracked run state for the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSnapshot {
    pub taken_at: DateTime<Utc>,
    /// Capture time of the frame behind the most recent observation; `None`
    /// until the first extractor hit.
    pub last_frame_at: Option<DateTime<Utc>>,
    pub clock: ClockReading,
    pub clock_text: String,
    /// Display label of the current biome (dictionary lookup, raw id as
    /// fallback).
    pub biome: String,
    /// Display phase with the 1st/2nd Bastion/Fortress prefix applied.
    pub phase: String,
    pub phases: Vec<String>,
    pub coords: Vec<[i64; 3]>,
    pub active_pois: Vec<Poi>,
    pub all_pois: Vec<Poi>,
    pub deaths: u32,
    pub worlds_generated: u32,
    pub spectator: bool,
    pub status: Option<StatusKind>,
}

pub struct RunTracker {
    priorities: HashMap<String, i32>,
    biome_names: HashMap<String, String>,
    notifier: Arc<dyn Notifier>,
    outlier_distance: f64,

    clock: ClockReading,
    biome: String,
    phases: Vec<String>,
    coords: Vec<[i64; 3]>,
    /// POIs for the current dimension/context; cleared on loading screens.
    active_pois: Vec<Poi>,
    /// POIs for the whole seed; reset only when a new world generates.
    all_pois: Vec<Poi>,
    deaths: u32,
    worlds_generated: u32,
    spectator: bool,
    status: Option<StatusKind>,
    last_frame_at: Option<DateTime<Utc>>,
}

impl RunTracker {
    pub fn new(
        priorities: HashMap<String, i32>,
        biome_names: HashMap<String, String>,
        notifier: Arc<dyn Notifier>,
        outlier_distance: f64,
    ) -> Self {
        Self {
            priorities,
            biome_names,
            notifier,
            outlier_distance,
            clock: ClockReading::default(),
            biome: UNKNOWN_BIOME.to_string(),
            phases: vec![START_PHASE.to_string()],
            coords: Vec::new(),
            active_pois: vec![Poi::open(START_PHASE)],
            all_pois: vec![Poi::open(START_PHASE)],
            deaths: 0,
            worlds_generated: 0,
            spectator: false,
            status: None,
            last_frame_at: None,
        }
    }

    /// Applies an observation derived from a frame captured at `frame_at`,
    /// recording the capture time as the snapshot's freshness marker.
    pub fn apply_from_frame(&mut self, frame_at: DateTime<Utc>, observation: Observation) {
        self.last_frame_at = Some(frame_at);
        self.apply(observation);
    }

    pub fn apply(&mut self, observation: Observation) {
        match observation {
            Observation::Clock(reading) => self.clock = reading,
            Observation::Biome(id) => self.biome = id,
            Observation::Milestones(names) => self.admit_milestones(&names),
            Observation::Position(point) => self.record_position(point),
            Observation::Status(kind) => self.record_status(kind),
        }
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            taken_at: Utc::now(),
            last_frame_at: self.last_frame_at,
            clock: self.clock,
            clock_text: self.clock.to_string(),
            biome: self
                .biome_names
                .get(&self.biome)
                .cloned()
                .unwrap_or_else(|| self.biome.clone()),
            phase: self.display_phase(),
            phases: self.phases.clone(),
            coords: self.coords.clone(),
            active_pois: self.active_pois.clone(),
            all_pois: self.all_pois.clone(),
            deaths: self.deaths,
            worlds_generated: self.worlds_generated,
            spectator: self.spectator,
            status: self.status,
        }
    }

    /// Display name of the current phase. Bastion and Fortress can be
    /// visited in either order, so they are labelled 1st/2nd by whether the
    /// previous phase was the other one of the pair.
    pub fn display_phase(&self) -> String {
        let current = self.phases.last().map(String::as_str).unwrap_or(START_PHASE);
        if current != BASTION && current != FORTRESS {
            return current.to_string();
        }
        let previous = self
            .phases
            .len()
            .checked_sub(2)
            .and_then(|i| self.phases.get(i))
            .map(String::as_str);
        if matches!(previous, Some(BASTION) | Some(FORTRESS)) {
            format!("2nd {current}")
        } else {
            format!("1st {current}")
        }
    }

    /// Milestone admission: a candidate enters the history only while not
    /// spectating, with priority at least that of the current phase, and
    /// only once per seed. Each admitted milestone raises the baseline for
    /// the rest of the batch and opens a POI in both lists.
    fn admit_milestones(&mut self, names: &[String]) {
        if self.spectator {
            return;
        }
        let previous = self
            .phases
            .last()
            .cloned()
            .unwrap_or_else(|| START_PHASE.to_string());
        let mut baseline = match self.priorities.get(previous.as_str()) {
            Some(priority) => *priority,
            None => {
                warn!("phase {previous} missing from the priority table");
                i32::MIN
            }
        };

        for name in names {
            let Some(priority) = self.priorities.get(name.as_str()).copied() else {
                warn!("milestone {name} missing from the priority table");
                continue;
            };
            if priority < baseline || self.phases.iter().any(|p| p == name) {
                continue;
            }
            info!("phase advanced to {name}");
            self.phases.push(name.clone());
            baseline = priority;
            self.active_pois.push(Poi::open(name));
            self.all_pois.push(Poi::open(name));
            if name == STRONGHOLD && previous != STRONGHOLD {
                // Fire and forget; delivery failures are the notifier's
                // problem.
                self.notifier.stronghold_reached(name, &previous);
            }
        }
    }

    fn record_position(&mut self, point: [i64; 3]) {
        self.coords.push(point);
        // A tick that dropped an outlier is not a confirming observation.
        if self.reject_tail_outliers() == 0 {
            self.confirm_poi();
        }
    }

    /// Pops the tail entry while it sits further than the configured
    /// distance from its predecessor. At most two pops per tick; each pop
    /// takes back one confirming observation from a pending POI.
    fn reject_tail_outliers(&mut self) -> usize {
        let mut popped = 0;
        while popped < 2 {
            let len = self.coords.len();
            if len < 2 {
                break;
            }
            let dist = distance(self.coords[len - 2], self.coords[len - 1]);
            if dist <= self.outlier_distance {
                break;
            }
            let dropped = self.coords.pop();
            popped += 1;
            debug!("dropped outlier coordinate {dropped:?} ({dist:.1} units from predecessor)");
            if let Some(poi) = self.active_pois.last_mut() {
                if poi.is_pending() && poi.counter > 0 {
                    poi.counter -= 1;
                }
            }
            self.sync_all_time_poi();
        }
        popped
    }

    /// Two confirming ticks without an intervening outlier pop lock in the
    /// POI coordinate: counter 0 -> 1 on the first, 1 -> -1 (confirmed, with
    /// the second-to-last point recorded) on the second.
    fn confirm_poi(&mut self) {
        if self.coords.len() < 2 {
            return;
        }
        let anchor = self.coords[self.coords.len() - 2];
        let Some(poi) = self.active_pois.last_mut() else {
            return;
        };
        if !poi.is_pending() {
            return;
        }
        match poi.counter {
            1 => {
                poi.coord = Some(anchor);
                poi.counter = -1;
                info!("confirmed {} at {anchor:?}", poi.phase);
            }
            0 => poi.counter = 1,
            _ => {}
        }
        self.sync_all_time_poi();
    }

    /// Mirrors the active POI's progress into the matching all-time entry
    /// (last pending entry with the same phase name).
    fn sync_all_time_poi(&mut self) {
        let Some(active) = self.active_pois.last() else {
            return;
        };
        if let Some(entry) = self
            .all_pois
            .iter_mut()
            .rev()
            .find(|poi| poi.phase == active.phase && poi.is_pending())
        {
            entry.counter = active.counter;
            entry.coord = active.coord;
        }
    }

    /// Edge-triggered status dispatch: the action fires only when the
    /// winning label differs from the previous tick's, and a transition
    /// back to "none" fires nothing.
    fn record_status(&mut self, kind: Option<StatusKind>) {
        if kind == self.status {
            return;
        }
        self.status = kind;
        let Some(kind) = kind else {
            return;
        };
        info!("status changed to {kind:?}");
        match kind {
            StatusKind::Loading => self.on_loading(),
            StatusKind::Generating => self.on_generating(),
            StatusKind::Died => self.deaths += 1,
            StatusKind::Spectator => self.spectator = true,
        }
    }

    /// A loading screen means a dimension change: coordinate tracking
    /// restarts. Once both nether structures are in the history the exit
    /// portal becomes trackable, either as a fresh synthetic phase or by
    /// reopening the previous window when the exit reappears.
    fn on_loading(&mut self) {
        self.coords.clear();
        self.active_pois.clear();

        let nether_done = [BASTION, FORTRESS]
            .iter()
            .all(|name| self.phases.iter().any(|p| p == name));
        if !nether_done {
            return;
        }

        if !self.phases.iter().any(|p| p == NETHER_EXIT) {
            self.phases.push(NETHER_EXIT.to_string());
            self.active_pois.push(Poi::open(NETHER_EXIT));
            self.all_pois.push(Poi::open(NETHER_EXIT));
        } else if self
            .all_pois
            .last()
            .is_some_and(|poi| poi.phase == NETHER_EXIT)
        {
            // Re-entry: reopen tracking under the entry before the exit.
            if let Some(reentry) = self
                .all_pois
                .len()
                .checked_sub(2)
                .and_then(|i| self.all_pois.get(i))
            {
                self.active_pois = vec![reentry.clone()];
            }
        }
    }

    /// World generation resets everything derived from the previous seed.
    /// The death counter survives; the generation counter advances.
    fn on_generating(&mut self) {
        self.worlds_generated += 1;
        self.clock = ClockReading::default();
        self.biome = UNKNOWN_BIOME.to_string();
        self.phases = vec![START_PHASE.to_string()];
        self.coords.clear();
        self.active_pois = vec![Poi::open(START_PHASE)];
        self.all_pois = vec![Poi::open(START_PHASE)];
        self.spectator = false;
    }
}

fn distance(a: [i64; 3], b: [i64; 3]) -> f64 {
    let dx = (a[0] - b[0]) as f64;
    let dy = (a[1] - b[1]) as f64;
    let dz = (a[2] - b[2]) as f64;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingNotifier {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl RecordingNotifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn stronghold_reached(&self, phase: &str, previous: &str) {
            self.calls
                .lock()
                .unwrap()
                .push((phase.to_string(), previous.to_string()));
        }
    }

    fn priorities() -> HashMap<String, i32> {
        [
            ("Start", 0),
            ("Nether", 1),
            ("Bastion", 2),
            ("Fortress", 2),
            ("Nether Exit", 3),
            ("Stronghold", 4),
            ("End", 5),
        ]
        .into_iter()
        .map(|(name, priority)| (name.to_string(), priority))
        .collect()
    }

    fn tracker() -> (RunTracker, Arc<RecordingNotifier>) {
        let notifier = RecordingNotifier::new();
        let tracker = RunTracker::new(priorities(), HashMap::new(), notifier.clone(), 10.0);
        (tracker, notifier)
    }

    fn milestones(names: &[&str]) -> Observation {
        Observation::Milestones(names.iter().map(|n| n.to_string()).collect())
    }

    #[test]
    fn clock_composition_is_positional() {
        let reading = ClockReading::from_digits([1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(reading.minute, 12);
        assert_eq!(reading.second, 34);
        assert_eq!(reading.millisecond, 567);
        assert_eq!(reading.to_string(), "12:34.567");
    }

    #[test]
    fn admission_is_monotonic_and_repeat_free() {
        let (mut tracker, _) = tracker();

        tracker.apply(milestones(&["Nether"]));
        tracker.apply(milestones(&["Nether"]));
        assert_eq!(tracker.phases, ["Start", "Nether"]);

        // Lower-priority candidates are rejected once the run moved past
        // them.
        tracker.apply(milestones(&["Fortress"]));
        tracker.apply(milestones(&["Nether"]));
        assert_eq!(tracker.phases, ["Start", "Nether", "Fortress"]);
    }

    #[test]
    fn same_tick_batch_raises_the_baseline_in_order() {
        let (mut tracker, _) = tracker();

        tracker.apply(milestones(&["Nether", "Bastion", "Fortress"]));
        assert_eq!(tracker.phases, ["Start", "Nether", "Bastion", "Fortress"]);
        assert_eq!(tracker.active_pois.len(), 4);
        assert_eq!(tracker.all_pois.len(), 4);
    }

    #[test]
    fn spectator_blocks_admission() {
        let (mut tracker, _) = tracker();
        tracker.apply(Observation::Status(Some(StatusKind::Spectator)));
        tracker.apply(milestones(&["Nether"]));
        assert_eq!(tracker.phases, ["Start"]);
    }

    #[test]
    fn unknown_milestone_is_skipped() {
        let (mut tracker, _) = tracker();
        tracker.apply(milestones(&["Mystery", "Nether"]));
        assert_eq!(tracker.phases, ["Start", "Nether"]);
    }

    #[test]
    fn stronghold_admission_notifies_once() {
        let (mut tracker, notifier) = tracker();

        tracker.apply(milestones(&["Stronghold"]));
        tracker.apply(milestones(&["Stronghold"]));

        let calls = notifier.calls();
        assert_eq!(calls, [("Stronghold".to_string(), "Start".to_string())]);
    }

    #[test]
    fn display_phase_orders_bastion_and_fortress() {
        let (mut tracker, _) = tracker();
        assert_eq!(tracker.display_phase(), "Start");

        tracker.apply(milestones(&["Bastion"]));
        assert_eq!(tracker.display_phase(), "1st Bastion");

        tracker.apply(milestones(&["Fortress"]));
        assert_eq!(tracker.display_phase(), "2nd Fortress");

        tracker.apply(milestones(&["Stronghold"]));
        assert_eq!(tracker.display_phase(), "Stronghold");
    }

    #[test]
    fn tail_outlier_is_popped_and_poi_counter_decremented() {
        let (mut tracker, _) = tracker();

        tracker.apply(Observation::Position([100, 0, 200]));
        tracker.apply(Observation::Position([100, 0, 205]));
        assert_eq!(tracker.active_pois[0].counter, 1);

        tracker.apply(Observation::Position([500, 0, 900]));
        assert_eq!(tracker.coords, [[100, 0, 200], [100, 0, 205]]);
        // The spurious confirming observation was taken back.
        assert_eq!(tracker.active_pois[0].counter, 0);
    }

    #[test]
    fn poi_counter_decrement_floors_at_zero() {
        let (mut tracker, _) = tracker();

        tracker.apply(Observation::Position([0, 0, 0]));
        tracker.apply(Observation::Position([900, 0, 0]));
        tracker.apply(Observation::Position([0, 0, 900]));

        assert_eq!(tracker.coords, [[0, 0, 0]]);
        assert_eq!(tracker.active_pois[0].counter, 0);
    }

    #[test]
    fn poi_confirms_after_two_stable_observations() {
        let (mut tracker, _) = tracker();

        tracker.apply(Observation::Position([10, 64, -20]));
        assert_eq!(tracker.active_pois[0].counter, 0);

        tracker.apply(Observation::Position([12, 64, -21]));
        assert_eq!(tracker.active_pois[0].counter, 1);

        tracker.apply(Observation::Position([13, 64, -22]));
        let poi = &tracker.active_pois[0];
        assert_eq!(poi.counter, -1);
        assert_eq!(poi.coord, Some([12, 64, -21]));
        // Progress mirrors into the all-time list.
        assert_eq!(tracker.all_pois[0], tracker.active_pois[0]);
    }

    #[test]
    fn confirmed_poi_is_never_decremented() {
        let (mut tracker, _) = tracker();
        for i in 0..3 {
            tracker.apply(Observation::Position([i, 0, 0]));
        }
        assert_eq!(tracker.active_pois[0].counter, -1);

        tracker.apply(Observation::Position([500, 500, 500]));
        assert_eq!(tracker.active_pois[0].counter, -1);
        assert!(tracker.active_pois[0].coord.is_some());
    }

    #[test]
    fn status_actions_are_edge_triggered() {
        let (mut tracker, _) = tracker();

        tracker.apply(Observation::Status(Some(StatusKind::Died)));
        tracker.apply(Observation::Status(Some(StatusKind::Died)));
        assert_eq!(tracker.deaths, 1);

        // Dropping back to none and dying again fires again.
        tracker.apply(Observation::Status(None));
        tracker.apply(Observation::Status(Some(StatusKind::Died)));
        assert_eq!(tracker.deaths, 2);
    }

    #[test]
    fn loading_clears_coordinate_tracking() {
        let (mut tracker, _) = tracker();
        tracker.apply(Observation::Position([0, 0, 0]));
        tracker.apply(Observation::Position([1, 0, 0]));

        tracker.apply(Observation::Status(Some(StatusKind::Loading)));
        assert!(tracker.coords.is_empty());
        assert!(tracker.active_pois.is_empty());
        // All-time list survives the loading screen.
        assert_eq!(tracker.all_pois.len(), 1);
    }

    #[test]
    fn loading_after_both_nether_structures_synthesizes_nether_exit() {
        let (mut tracker, _) = tracker();
        tracker.apply(milestones(&["Bastion", "Fortress"]));

        tracker.apply(Observation::Status(Some(StatusKind::Loading)));
        assert_eq!(tracker.phases.last().map(String::as_str), Some("Nether Exit"));
        assert_eq!(tracker.active_pois.len(), 1);
        assert_eq!(tracker.active_pois[0].phase, "Nether Exit");
        assert_eq!(tracker.all_pois.last().unwrap().phase, "Nether Exit");

        // A second loading screen reopens the window before the exit
        // instead of synthesizing again.
        tracker.apply(Observation::Status(None));
        tracker.apply(Observation::Status(Some(StatusKind::Loading)));
        assert_eq!(
            tracker.phases.iter().filter(|p| *p == "Nether Exit").count(),
            1
        );
        assert_eq!(tracker.active_pois.len(), 1);
        assert_eq!(tracker.active_pois[0].phase, "Fortress");
    }

    #[test]
    fn generating_resets_the_seed_but_not_the_death_counter() {
        let (mut tracker, _) = tracker();
        tracker.apply(Observation::Clock(ClockReading::from_digits([
            0, 1, 2, 3, 4, 5, 6,
        ])));
        tracker.apply(Observation::Biome(String::from("plains")));
        tracker.apply(milestones(&["Nether"]));
        tracker.apply(Observation::Position([5, 5, 5]));
        tracker.apply(Observation::Status(Some(StatusKind::Died)));
        tracker.apply(Observation::Status(Some(StatusKind::Spectator)));

        tracker.apply(Observation::Status(Some(StatusKind::Generating)));

        assert_eq!(tracker.worlds_generated, 1);
        assert_eq!(tracker.deaths, 1);
        assert_eq!(tracker.clock, ClockReading::default());
        assert_eq!(tracker.biome, UNKNOWN_BIOME);
        assert_eq!(tracker.phases, ["Start"]);
        assert!(tracker.coords.is_empty());
        assert_eq!(tracker.active_pois, vec![Poi::open(START_PHASE)]);
        assert_eq!(tracker.all_pois, vec![Poi::open(START_PHASE)]);
        assert!(!tracker.spectator);
    }

    #[test]
    fn snapshot_reports_the_frame_behind_the_last_observation() {
        let (mut tracker, _) = tracker();
        assert!(tracker.snapshot().last_frame_at.is_none());

        let frame_at = Utc::now();
        tracker.apply_from_frame(frame_at, Observation::Biome(String::from("plains")));
        assert_eq!(tracker.snapshot().last_frame_at, Some(frame_at));
    }

    #[test]
    fn snapshot_uses_display_names() {
        let notifier = RecordingNotifier::new();
        let biome_names = [("plains".to_string(), "Plains".to_string())]
            .into_iter()
            .collect();
        let mut tracker = RunTracker::new(priorities(), biome_names, notifier, 10.0);

        tracker.apply(Observation::Biome(String::from("plains")));
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.biome, "Plains");
        assert_eq!(snapshot.phase, "Start");
        assert_eq!(snapshot.clock_text, "00:00.000");

        tracker.apply(Observation::Biome(String::from("crimson_forest")));
        assert_eq!(tracker.snapshot().biome, "crimson_forest");
    }
}
