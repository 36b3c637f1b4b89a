//! Small utility helpers used across modules.

use rand::seq::SliceRandom;

/// Log-safe truncation for large strings (model output, prompts).
/// Cuts on a char boundary so Turkish text never splits mid-codepoint.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

/// Uniform in-place shuffle using the thread RNG.
/// Kept synchronous so the RNG never lives across an await point.
pub fn shuffle<T>(items: &mut [T]) {
  items.shuffle(&mut rand::thread_rng());
}

/// Sample `count` items without replacement. If there are not more than `count`, all are returned in order.
pub fn pick_random<T: Clone>(items: &[T], count: usize) -> Vec<T> {
  if items.len() <= count {
    return items.to_vec();
  }
  let mut copy = items.to_vec();
  shuffle(&mut copy);
  copy.truncate(count);
  copy
}

/// Ceiling division for per-category targets; `parts == 0` is treated as one part.
pub fn div_ceil(total: usize, parts: usize) -> usize {
  total.div_ceil(parts.max(1))
}
