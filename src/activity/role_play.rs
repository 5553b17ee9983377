//! Role-play: guided speaking/writing practice across scenarios and turns. Not scored.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::Scorer;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
  pub role: String,
  pub prompt: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub tips: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub sample_responses: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
  pub title: String,
  pub situation: String,
  #[serde(default)]
  pub roles: Vec<String>,
  #[serde(default)]
  pub objective: String,
  #[serde(default)]
  pub turns: Vec<Turn>,
}

/// The scenario and turn on screen. Tips and sample responses appear only while toggled on.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RolePlayView {
  pub scenario_titles: Vec<String>,
  pub scenario: usize,
  pub turn: usize,
  pub situation: String,
  pub roles: Vec<String>,
  pub objective: String,
  pub role: Option<String>,
  pub prompt: Option<String>,
  pub response: Option<String>,
  pub has_tips: bool,
  pub has_samples: bool,
  pub tips: Vec<String>,
  pub sample_responses: Vec<String>,
  pub can_advance: bool,
}

#[derive(Clone, Debug)]
pub struct RolePlay {
  scenarios: Vec<Scenario>,
  scenario: usize,
  turn: usize,
  /// responses[scenario][turn]; empty string means no response yet.
  responses: Vec<Vec<String>>,
  show_tips: bool,
  show_samples: bool,
}

impl RolePlay {
  pub fn new(scenarios: Vec<Scenario>) -> Self {
    let responses = Self::blank_responses(&scenarios);
    Self { scenarios, scenario: 0, turn: 0, responses, show_tips: false, show_samples: false }
  }

  fn blank_responses(scenarios: &[Scenario]) -> Vec<Vec<String>> {
    scenarios.iter().map(|s| vec![String::new(); s.turns.len()]).collect()
  }

  pub fn position(&self) -> (usize, usize) {
    (self.scenario, self.turn)
  }

  pub fn current_turn(&self) -> Option<&Turn> {
    self.scenarios.get(self.scenario)?.turns.get(self.turn)
  }

  pub fn response(&self, scenario: usize, turn: usize) -> Option<&str> {
    self.responses.get(scenario)?.get(turn).map(String::as_str)
  }

  pub fn record_response(&mut self, text: String) -> bool {
    match self.responses.get_mut(self.scenario).and_then(|s| s.get_mut(self.turn)) {
      Some(slot) => {
        *slot = text;
        true
      }
      None => false,
    }
  }

  pub fn toggle_tips(&mut self) -> bool {
    if self.current_turn().map(|t| t.tips.is_empty()).unwrap_or(true) {
      return false;
    }
    self.show_tips = !self.show_tips;
    true
  }

  pub fn toggle_samples(&mut self) -> bool {
    if self.current_turn().map(|t| t.sample_responses.is_empty()).unwrap_or(true) {
      return false;
    }
    self.show_samples = !self.show_samples;
    true
  }

  pub fn select_scenario(&mut self, index: usize) -> bool {
    if index >= self.scenarios.len() {
      return false;
    }
    self.scenario = index;
    self.turn = 0;
    self.hide_reveals();
    true
  }

  /// "Next turn" unlocks once the current turn has a non-blank response.
  /// A scenario without turns can always be skipped.
  pub fn can_advance(&self) -> bool {
    match self.current_turn() {
      Some(_) => self.response(self.scenario, self.turn).map(|r| !r.trim().is_empty()).unwrap_or(false),
      None => !self.scenarios.is_empty(),
    }
  }

  /// Past the last turn of a scenario go to the next scenario; past the last scenario loop
  /// back to the first with a clean slate.
  pub fn next_turn(&mut self) -> bool {
    if !self.can_advance() {
      return false;
    }
    let turns = self.scenarios[self.scenario].turns.len();
    if self.turn + 1 < turns {
      self.turn += 1;
    } else if self.scenario + 1 < self.scenarios.len() {
      self.scenario += 1;
      self.turn = 0;
    } else {
      self.scenario = 0;
      self.turn = 0;
      self.responses = Self::blank_responses(&self.scenarios);
    }
    self.hide_reveals();
    true
  }

  pub fn view(&self) -> RolePlayView {
    let (scenario, turn) = self.position();
    let current = self.scenarios.get(scenario);
    let t = self.current_turn();
    RolePlayView {
      scenario_titles: self.scenarios.iter().map(|s| s.title.clone()).collect(),
      scenario,
      turn,
      situation: current.map(|s| s.situation.clone()).unwrap_or_default(),
      roles: current.map(|s| s.roles.clone()).unwrap_or_default(),
      objective: current.map(|s| s.objective.clone()).unwrap_or_default(),
      role: t.map(|t| t.role.clone()),
      prompt: t.map(|t| t.prompt.clone()),
      response: self.response(scenario, turn).map(str::to_string),
      has_tips: t.map(|t| !t.tips.is_empty()).unwrap_or(false),
      has_samples: t.map(|t| !t.sample_responses.is_empty()).unwrap_or(false),
      tips: t.filter(|_| self.show_tips).map(|t| t.tips.clone()).unwrap_or_default(),
      sample_responses: t.filter(|_| self.show_samples).map(|t| t.sample_responses.clone()).unwrap_or_default(),
      can_advance: self.can_advance(),
    }
  }

  fn hide_reveals(&mut self) {
    self.show_tips = false;
    self.show_samples = false;
  }
}

/// Practice aid: no checking and no score.
impl Scorer for RolePlay {
  fn can_check(&self) -> bool {
    false
  }

  fn check_answers(&mut self) -> bool {
    false
  }

  fn results_shown(&self) -> bool {
    false
  }

  fn score(&self) -> Option<usize> {
    None
  }

  fn total(&self) -> usize {
    self.scenarios.iter().map(|s| s.turns.len()).sum()
  }

  fn reset(&mut self, _rng: &mut dyn RngCore) {
    self.scenario = 0;
    self.turn = 0;
    self.responses = Self::blank_responses(&self.scenarios);
    self.hide_reveals();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn turn(role: &str, prompt: &str) -> Turn {
    Turn { role: role.into(), prompt: prompt.into(), tips: vec!["Use 'could'".into()], sample_responses: vec![] }
  }

  fn activity() -> RolePlay {
    RolePlay::new(vec![
      Scenario {
        title: "At the hotel".into(),
        situation: "Checking in".into(),
        roles: vec!["Receptionist".into(), "Guest".into()],
        objective: "Get a room key".into(),
        turns: vec![turn("Guest", "Greet the receptionist"), turn("Guest", "Ask about breakfast")],
      },
      Scenario {
        title: "At the station".into(),
        situation: "Buying a ticket".into(),
        roles: vec!["Clerk".into(), "Traveller".into()],
        objective: "Buy a return ticket".into(),
        turns: vec![turn("Traveller", "Ask for a return ticket")],
      },
    ])
  }

  #[test]
  fn next_turn_requires_a_response() {
    let mut r = activity();
    assert!(!r.next_turn());
    r.record_response("   ".into());
    assert!(!r.next_turn());
    r.record_response("Hello, I have a reservation.".into());
    assert!(r.next_turn());
    assert_eq!(r.position(), (0, 1));
  }

  #[test]
  fn walks_scenarios_then_loops_to_start() {
    let mut r = activity();
    for text in ["Hi", "Is breakfast included?", "A return to York, please."] {
      r.record_response(text.into());
      assert!(r.next_turn());
    }
    assert_eq!(r.position(), (0, 0));
    assert_eq!(r.response(0, 0), Some(""));
    assert!(!r.can_advance());
  }

  #[test]
  fn tips_toggle_and_hide_on_advance() {
    let mut r = activity();
    assert!(r.view().tips.is_empty());
    assert!(r.toggle_tips());
    assert_eq!(r.view().tips, vec!["Use 'could'".to_string()]);
    assert!(!r.toggle_samples());
    r.record_response("Hi".into());
    r.next_turn();
    assert!(!r.show_tips);
    let v = r.view();
    assert_eq!(v.prompt.as_deref(), Some("Ask about breakfast"));
    assert!(v.has_tips && v.tips.is_empty());
    assert_eq!(r.score(), None);
    assert!(!r.check_answers());
  }
}
