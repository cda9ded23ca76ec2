//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Remove a surrounding Markdown code fence (```json ... ```) if present.
pub fn strip_code_fences(raw: &str) -> &str {
  let s = raw.trim();
  let Some(rest) = s.strip_prefix("```") else { return s };
  // Drop the info string ("json", "JSON", ...) on the opening line.
  let body = match rest.find('\n') {
    Some(nl) => &rest[nl + 1..],
    None => rest,
  };
  body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Drop one pair of wrapping double quotes from a plain-text model reply.
pub fn trim_quotes(s: &str) -> &str {
  let s = s.trim();
  s.strip_prefix('"').and_then(|t| t.strip_suffix('"')).unwrap_or(s)
}

/// First `max` chars of the source text followed by an ellipsis.
pub fn excerpt(text: &str, max: usize) -> String {
  let head: String = text.chars().take(max).collect();
  format!("{head}...")
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    None => s.to_string(),
    Some((cut, _)) => format!("{}… ({} bytes total)", &s[..cut], s.len()),
  }
}
