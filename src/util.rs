//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Normalize a typed answer for comparison: trim surrounding whitespace and lowercase.
/// Every text-comparison activity uses this rule.
pub fn normalize_answer(s: &str) -> String {
  s.trim().to_lowercase()
}

/// True if the two answers match after `normalize_answer`.
pub fn answers_match(given: &str, expected: &str) -> bool {
  normalize_answer(given) == normalize_answer(expected)
}

/// Normalize a whole sentence: drop punctuation, casefold, collapse runs of whitespace.
/// "The cat  sat." and "the cat sat" normalize identically.
pub fn normalize_sentence(s: &str) -> String {
  let stripped: String = s
    .chars()
    .filter(|c| !c.is_ascii_punctuation() && !is_typographic_punct(*c))
    .collect();
  stripped
    .split_whitespace()
    .map(|w| w.to_lowercase())
    .collect::<Vec<_>>()
    .join(" ")
}

fn is_typographic_punct(c: char) -> bool {
  matches!(c, '\u{2018}' | '\u{2019}' | '\u{201C}' | '\u{201D}' | '\u{2026}' | '\u{2013}' | '\u{2014}' | '\u{00BF}' | '\u{00A1}')
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    let head: String = s.chars().take(max).collect();
    format!("{}… ({} bytes total)", head, s.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn template_fills_every_occurrence() {
    let out = fill_template("{topic} at {level}; again {topic}", &[("topic", "Food"), ("level", "B1")]);
    assert_eq!(out, "Food at B1; again Food");
  }

  #[test]
  fn answers_ignore_case_and_outer_whitespace() {
    assert!(answers_match(" paris ", "Paris"));
    assert!(!answers_match("pa ris", "Paris"));
  }

  #[test]
  fn sentence_normalization_drops_punctuation() {
    assert_eq!(normalize_sentence("The cat sat."), "the cat sat");
    assert_eq!(normalize_sentence("  Where's   my \u{201C}hat\u{201D}? "), "wheres my hat");
  }

  #[test]
  fn truncation_is_char_safe() {
    assert_eq!(trunc_for_log("héllo", 10), "héllo");
    assert!(trunc_for_log("héllo wörld", 3).starts_with("hél…"));
  }
}
