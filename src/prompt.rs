//! Generation prompts.
//!
//! `build_prompt` is the app-facing builder (semantic age groups + category rule tables);
//! `build_function_prompt` is the shorter prompt used by the server-side generation function.
//! Both are pure: same input, same bytes.

use crate::domain::{AgeGroup, Category, LegacyAgeGroup};
use crate::profiles::{age_group_profile, category_profile};

/// Resolve requested category ids. Unknown ids are dropped; an empty result becomes `genel-kultur`.
pub fn resolve_categories<S: AsRef<str>>(categories: &[S]) -> Vec<Category> {
  let mut out: Vec<Category> = Vec::new();
  for raw in categories {
    if let Some(c) = Category::parse(raw.as_ref()) {
      if !out.contains(&c) {
        out.push(c);
      }
    }
  }
  if out.is_empty() {
    out.push(Category::DEFAULT);
  }
  out
}

pub fn build_prompt<S: AsRef<str>>(age_group: &str, count: usize, categories: &[S]) -> String {
  let age = age_group_profile(AgeGroup::normalize(age_group));
  let cats = resolve_categories(categories);
  let profiles: Vec<_> = cats.iter().map(|c| category_profile(*c)).collect();

  let labels = profiles.iter().map(|p| p.label).collect::<Vec<_>>().join(", ");
  let topics = profiles.iter().map(|p| p.topic).collect::<Vec<_>>().join(", ");

  let mut lines: Vec<String> = Vec::new();
  lines.push(format!("Sen Peeky AI'sın. {} için {} adet çoktan seçmeli soru üreteceksin.", age.label, count));
  lines.push(String::new());
  lines.push(format!("Kategoriler: {labels}"));
  lines.push(String::new());
  lines.push("FORMAT (ÇOK ÖNEMLİ):".into());
  lines.push("- Sadece ve sadece geçerli bir JSON array döndür (markdown, açıklama, metin yok).".into());
  lines.push("- Array elemanları şu şemada olsun:".into());
  lines.push(r#"  { "text": string, "options": [string,string,string,string], "correct_index": 0|1|2|3, "topic"?: string }"#.into());
  lines.push(String::new());
  lines.push("GENEL KURALLAR:".into());
  lines.push("- Her soru 4 seçenekli olmalı.".into());
  lines.push("- Tek bir doğru cevap olmalı; belirsiz/tartışmalı soru yazma.".into());
  lines.push("- Şıklar birbirine benzer formatta olsun; \"hepsi/hiçbiri\" gibi seçeneklerden kaçın.".into());
  lines.push("- correct_index mutlaka options içindeki doğru şıkla uyuşsun.".into());
  lines.push(format!("- \"topic\" alanı şu değerlerden biri olmalı: {topics}"));
  lines.push(String::new());
  lines.push(format!("YAŞ GRUBU KURALLARI ({}):", age.label));
  lines.extend(age.rules.iter().map(|r| format!("- {r}")));
  lines.push(String::new());
  lines.push("KATEGORİ KURALLARI:".into());
  for p in &profiles {
    lines.push(format!("- {} (topic: {})", p.label, p.topic));
    lines.extend(p.rules.iter().map(|r| format!("  - {r}")));
  }
  lines.push(String::new());
  lines.push("DAĞILIM:".into());
  if profiles.len() > 1 {
    lines.push("- Soruları kategoriler arasında olabildiğince dengeli dağıt (her kategoriye en az 1 soru).".into());
  } else {
    lines.push("- Tüm sorular bu kategoriye uygun olsun.".into());
  }
  lines.push(String::new());
  lines.push("ÇIKTI:".into());
  lines.push(format!("- Tam olarak {count} adet soru içeren JSON array döndür."));

  lines.join("\n")
}

/// Prompt for the server-side generation function (legacy age ids, one topic).
/// A topic outside the group's allowed list is replaced by the group's first topic.
pub fn build_function_prompt(age_group: LegacyAgeGroup, count: usize, topic: Option<&str>) -> String {
  let allowed = age_group.allowed_topics();
  let selected = match topic {
    Some(t) if allowed.contains(&t) => t,
    _ => allowed.first().copied().unwrap_or("general"),
  };

  format!(
    r#"Generate exactly {count} educational multiple-choice questions in Turkish for age group {group} (ages 0-15).

Topic: {selected}
Difficulty: {difficulty}
Language: Turkish (Türkçe)

Requirements:
1. Return ONLY a valid JSON array with no additional text
2. Each question must have exactly 4 options
3. Include one correct answer (correct_index: 0-3)
4. Questions must be age-appropriate and educational
5. No harmful, inappropriate, or unethical content
6. Use simple Turkish for younger children
7. Make questions engaging and fun

Response format (ONLY JSON, no markdown):
[
  {{
    "text": "Soru metni?",
    "options": ["Seçenek 1", "Seçenek 2", "Seçenek 3", "Seçenek 4"],
    "correct_index": 1,
    "topic": "{selected}"
  }}
]

Generate the questions now:"#,
    group = age_group.id(),
    difficulty = age_group.difficulty(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn prompt_is_deterministic() {
    let a = build_prompt("G4", 7, &["matematik", "fen"]);
    let b = build_prompt("G4", 7, &["matematik", "fen"]);
    assert_eq!(a, b);
  }

  #[test]
  fn unknown_age_group_uses_early_primary_profile() {
    let unknown = build_prompt("XX", 5, &["fen"]);
    let early = build_prompt("EARLY_PRIMARY", 5, &["fen"]);
    assert_eq!(unknown, early);
    assert!(unknown.contains("5-8 yaş"));
  }

  #[test]
  fn unknown_categories_fall_back_to_general_knowledge() {
    let none: [&str; 0] = [];
    for p in [build_prompt("G3", 3, &["uzay"]), build_prompt("G3", 3, &none)] {
      assert!(p.contains("Kategoriler: Genel Kültür"));
      assert!(p.contains("general_knowledge"));
      assert!(p.contains("Tüm sorular bu kategoriye uygun olsun."));
    }
  }

  #[test]
  fn sections_appear_in_fixed_order() {
    let p = build_prompt("LATE_PRIMARY", 6, &["tarih", "cografya"]);
    let order = ["Sen Peeky AI", "Kategoriler:", "FORMAT", "GENEL KURALLAR", "YAŞ GRUBU KURALLARI", "KATEGORİ KURALLARI", "DAĞILIM", "ÇIKTI"];
    let mut last = 0;
    for marker in order {
      let pos = p.find(marker).unwrap_or_else(|| panic!("missing {marker}"));
      assert!(pos >= last, "{marker} out of order");
      last = pos;
    }
    assert!(p.contains("dengeli dağıt"));
    assert!(p.ends_with("Tam olarak 6 adet soru içeren JSON array döndür."));
    assert!(p.contains("(topic: history)") && p.contains("(topic: geography)"));
  }

  #[test]
  fn duplicate_categories_are_collapsed() {
    assert_eq!(resolve_categories(&["fen", "fen", "bogus"]), vec![Category::Fen]);
  }

  #[test]
  fn function_prompt_replaces_disallowed_topic() {
    let p = build_function_prompt(LegacyAgeGroup::G1, 3, Some("history"));
    assert!(p.contains("Topic: colors"));
    assert!(p.contains("Difficulty: very_easy"));
    let p = build_function_prompt(LegacyAgeGroup::G5, 2, Some("literature"));
    assert!(p.contains("Topic: literature"));
    assert!(p.contains("\"topic\": \"literature\""));
  }
}
