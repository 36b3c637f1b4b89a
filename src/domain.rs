//! Domain models: questions, age groups (semantic + legacy), categories, cache records.

use serde::{Deserialize, Serialize};

/// Number of answer options every playable question carries (A–D).
pub const OPTION_COUNT: usize = 4;

/// A single multiple-choice question as shown to the player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
  pub text: String,
  /// Display order is answer-letter order.
  pub options: Vec<String>,
  pub correct_index: usize,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub topic: Option<String>,
}

impl Question {
  /// Exactly four options and an index that points into them.
  pub fn is_well_formed(&self) -> bool {
    self.options.len() == OPTION_COUNT && self.correct_index < OPTION_COUNT
  }
}

/// Developmental bracket of the player.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgeGroup {
  Preschool,
  EarlyPrimary,
  LatePrimary,
  MiddleSchool,
  HighSchool,
  Adult,
}

impl AgeGroup {
  pub const ALL: [AgeGroup; 6] = [
    AgeGroup::Preschool,
    AgeGroup::EarlyPrimary,
    AgeGroup::LatePrimary,
    AgeGroup::MiddleSchool,
    AgeGroup::HighSchool,
    AgeGroup::Adult,
  ];

  /// Used whenever the incoming id is not recognised.
  pub const DEFAULT: AgeGroup = AgeGroup::EarlyPrimary;

  pub fn id(&self) -> &'static str {
    match self {
      AgeGroup::Preschool => "PRESCHOOL",
      AgeGroup::EarlyPrimary => "EARLY_PRIMARY",
      AgeGroup::LatePrimary => "LATE_PRIMARY",
      AgeGroup::MiddleSchool => "MIDDLE_SCHOOL",
      AgeGroup::HighSchool => "HIGH_SCHOOL",
      AgeGroup::Adult => "ADULT",
    }
  }

  /// Total: accepts semantic ids, legacy `G2`..`G5` (any case), and
  /// falls back to `EARLY_PRIMARY` for everything else, `G1` included.
  pub fn normalize(raw: &str) -> AgeGroup {
    let key = raw.trim();
    if let Some(g) = AgeGroup::ALL.iter().find(|g| g.id() == key) {
      return *g;
    }
    match key.to_ascii_uppercase().as_str() {
      "G2" => AgeGroup::Preschool,
      "G3" => AgeGroup::EarlyPrimary,
      "G4" => AgeGroup::LatePrimary,
      "G5" => AgeGroup::MiddleSchool,
      _ => AgeGroup::DEFAULT,
    }
  }

  /// Key of the bundled dataset that serves this group.
  pub fn legacy_key(&self) -> &'static str {
    match self {
      AgeGroup::Preschool => "G2",
      AgeGroup::EarlyPrimary => "G3",
      AgeGroup::LatePrimary => "G4",
      AgeGroup::MiddleSchool | AgeGroup::HighSchool | AgeGroup::Adult => "G5",
    }
  }
}

/// Legacy numeric scheme still used by the bundled dataset and the generation function.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LegacyAgeGroup {
  G1,
  G2,
  G3,
  G4,
  G5,
}

impl LegacyAgeGroup {
  /// Strict: only the five exact ids are accepted.
  pub fn parse(raw: &str) -> Option<LegacyAgeGroup> {
    match raw {
      "G1" => Some(LegacyAgeGroup::G1),
      "G2" => Some(LegacyAgeGroup::G2),
      "G3" => Some(LegacyAgeGroup::G3),
      "G4" => Some(LegacyAgeGroup::G4),
      "G5" => Some(LegacyAgeGroup::G5),
      _ => None,
    }
  }

  pub fn id(&self) -> &'static str {
    match self {
      LegacyAgeGroup::G1 => "G1",
      LegacyAgeGroup::G2 => "G2",
      LegacyAgeGroup::G3 => "G3",
      LegacyAgeGroup::G4 => "G4",
      LegacyAgeGroup::G5 => "G5",
    }
  }

  pub fn difficulty(&self) -> &'static str {
    match self {
      LegacyAgeGroup::G1 => "very_easy",
      LegacyAgeGroup::G2 => "easy",
      LegacyAgeGroup::G3 => "easy_medium",
      LegacyAgeGroup::G4 => "medium",
      LegacyAgeGroup::G5 => "hard",
    }
  }

  /// First entry is the default topic for the group.
  pub fn allowed_topics(&self) -> &'static [&'static str] {
    match self {
      LegacyAgeGroup::G1 => &["colors", "shapes", "animals", "numbers", "body_parts", "family", "toys"],
      LegacyAgeGroup::G2 => &["animals", "numbers", "alphabet", "foods", "colors", "family", "nature"],
      LegacyAgeGroup::G3 => &["math", "reading", "science", "geography", "history", "nature", "animals"],
      LegacyAgeGroup::G4 => &["math", "science", "geography", "history", "reading", "technology", "sports"],
      LegacyAgeGroup::G5 => &["science", "history", "geography", "literature", "math", "technology", "social_studies"],
    }
  }
}

/// Topic category ids as the app sends them.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
  #[serde(rename = "matematik")]
  Matematik,
  #[serde(rename = "fen")]
  Fen,
  #[serde(rename = "turkce")]
  Turkce,
  #[serde(rename = "tarih")]
  Tarih,
  #[serde(rename = "cografya")]
  Cografya,
  #[serde(rename = "genel-kultur")]
  GenelKultur,
}

impl Category {
  pub const ALL: [Category; 6] = [
    Category::Matematik,
    Category::Fen,
    Category::Turkce,
    Category::Tarih,
    Category::Cografya,
    Category::GenelKultur,
  ];

  pub const DEFAULT: Category = Category::GenelKultur;

  pub fn id(&self) -> &'static str {
    match self {
      Category::Matematik => "matematik",
      Category::Fen => "fen",
      Category::Turkce => "turkce",
      Category::Tarih => "tarih",
      Category::Cografya => "cografya",
      Category::GenelKultur => "genel-kultur",
    }
  }

  pub fn parse(raw: &str) -> Option<Category> {
    let key = raw.trim();
    Category::ALL.iter().copied().find(|c| c.id() == key)
  }

  /// Question `topic` value this category maps onto.
  pub fn topic(&self) -> &'static str {
    match self {
      Category::Matematik => "math",
      Category::Fen => "science",
      Category::Turkce => "reading",
      Category::Tarih => "history",
      Category::Cografya => "geography",
      Category::GenelKultur => "general_knowledge",
    }
  }
}

/// Topic value used to filter by `raw`; unknown ids pass through as raw topic strings.
pub fn topic_filter_for(raw: &str) -> String {
  match Category::parse(raw) {
    Some(c) => c.topic().to_string(),
    None => raw.to_string(),
  }
}

/// True if `q` belongs to `raw_category`. Untagged questions match everything.
pub fn question_matches_category(q: &Question, raw_category: &str) -> bool {
  match &q.topic {
    None => true,
    Some(topic) => *topic == topic_filter_for(raw_category) || topic == raw_category,
  }
}

/// Persisted wrapper around a generated question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedQuestionRecord {
  pub id: String,
  pub age_group: String,
  pub question: Question,
  #[serde(default)]
  pub used_count: u32,
}
