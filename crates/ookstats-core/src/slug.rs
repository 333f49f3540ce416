//! Slug helpers: player name slugs, realm slug normalization and merged
//! realm aliases.

// ─── Name slugs ──────────────────────────────────────────────────────────────

/// Path-safe slug for a character name.
///
/// Unicode letters and digits are kept (lowercased), `-` and `_` pass
/// through, slashes and whitespace become `-`, everything else is dropped.
/// Dash runs collapse and edge dashes are trimmed. Returns `"player"` when
/// nothing is left.
pub fn name_to_slug(name: &str) -> String {
  let mut out = String::with_capacity(name.len());
  for c in name.trim().to_lowercase().chars() {
    let mapped = match c {
      '/' | '\\' => '-',
      c if c.is_whitespace() => '-',
      '-' | '_' => c,
      c if c.is_alphanumeric() => c,
      _ => continue,
    };
    if mapped == '-' && out.ends_with('-') {
      continue;
    }
    out.push(mapped);
  }
  let trimmed = out.trim_matches('-');
  if trimmed.is_empty() {
    "player".to_owned()
  } else {
    trimmed.to_owned()
  }
}

/// Lowercase class name with spaces replaced by `_` (e.g. `death_knight`).
pub fn class_key(class_name: &str) -> String {
  class_name.trim().to_lowercase().replace(' ', "_")
}

// ─── Realm slugs ─────────────────────────────────────────────────────────────

/// Apply known region-specific realm renames (OCE realms moved to `-au`).
pub fn normalize_realm_slug(region: &str, slug: &str) -> String {
  match (region, slug) {
    ("us", "arugal") => "arugal-au".to_owned(),
    ("us", "remulos") => "remulos-au".to_owned(),
    ("us", "yojamba") => "yojamba-au".to_owned(),
    _ => slug.to_owned(),
  }
}

/// Realms merged into a parent, per region: `(region, child, parent)`.
pub const MERGED_REALMS: &[(&str, &str, &str)] = &[
  ("us", "nazgrim", "pagle"),
  ("us", "galakras", "pagle"),
  ("us", "raden", "pagle"),
  ("us", "ra-den", "pagle"),
  ("us", "lei-shen", "pagle"),
  ("us", "leishen", "pagle"),
  ("us", "immerseus", "pagle"),
  ("eu", "shekzeer", "mirage-raceway"),
  ("eu", "garalon", "mirage-raceway"),
  ("eu", "norushen", "mirage-raceway"),
  ("eu", "hoptallus", "mirage-raceway"),
  ("eu", "hotallus", "mirage-raceway"),
  ("eu", "ook-ook", "everlook"),
  ("eu", "ookook", "everlook"),
];

/// Parent slug for a merged child realm, if any.
pub fn merged_parent(region: &str, slug: &str) -> Option<&'static str> {
  let region = region.to_lowercase();
  let slug = slug.to_lowercase();
  MERGED_REALMS
    .iter()
    .find(|(r, child, _)| *r == region && *child == slug)
    .map(|(_, _, parent)| *parent)
}

/// The slug pages are published under: the merged parent, else the slug.
pub fn effective_realm_slug(region: &str, slug: &str) -> String {
  merged_parent(region, slug)
    .map(str::to_owned)
    .unwrap_or_else(|| slug.to_lowercase())
}

/// Every slug that shares `slug`'s merged group, parent first.
pub fn merged_group_slugs(region: &str, slug: &str) -> Vec<String> {
  let parent = effective_realm_slug(region, slug);
  let region = region.to_lowercase();
  let mut group = vec![parent.clone()];
  group.extend(
    MERGED_REALMS
      .iter()
      .filter(|(r, _, p)| *r == region && *p == parent)
      .map(|(_, child, _)| (*child).to_owned()),
  );
  group
}
