//! Page arithmetic shared by every paginated tree.

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Pagination block of a page. Run leaderboards carry `totalRuns`; player
/// leaderboards carry both totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
  pub current_page:  usize,
  pub page_size:     usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub total_players: Option<usize>,
  pub total_runs:    usize,
  pub total_pages:   usize,
  pub has_next_page: bool,
  pub has_prev_page: bool,
}

impl Pagination {
  /// Pagination for 1-based `page` of a run leaderboard.
  pub fn runs(page: usize, page_size: usize, total: usize) -> Self {
    let total_pages = page_count(total, page_size);
    Self {
      current_page: page,
      page_size,
      total_players: None,
      total_runs: total,
      total_pages,
      has_next_page: page < total_pages,
      has_prev_page: page > 1,
    }
  }

  pub fn players(page: usize, page_size: usize, total: usize) -> Self {
    Self { total_players: Some(total), ..Self::runs(page, page_size, total) }
  }
}

/// `⌈total / page_size⌉`; a zero page size counts as one.
pub fn page_count(total: usize, page_size: usize) -> usize {
  total.div_ceil(page_size.max(1))
}

/// Split `items` into 1-based pages of `page_size`.
pub fn pages<T>(items: &[T], page_size: usize) -> impl Iterator<Item = (usize, &[T])> {
  items.chunks(page_size.max(1)).enumerate().map(|(i, chunk)| (i + 1, chunk))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn page_count_rounds_up() {
    assert_eq!(page_count(0, 25), 0);
    assert_eq!(page_count(1, 25), 1);
    assert_eq!(page_count(25, 25), 1);
    assert_eq!(page_count(26, 25), 2);
    assert_eq!(page_count(3, 0), 3);
  }

  #[test]
  fn first_and_last_page_flags() {
    let first = Pagination::runs(1, 25, 26);
    assert_eq!(first.total_pages, 2);
    assert!(first.has_next_page);
    assert!(!first.has_prev_page);

    let last = Pagination::runs(2, 25, 26);
    assert!(!last.has_next_page);
    assert!(last.has_prev_page);

    let only = Pagination::runs(1, 25, 25);
    assert!(!only.has_next_page);
    assert!(!only.has_prev_page);
  }

  #[test]
  fn player_pages_report_both_totals() {
    let value = serde_json::to_value(Pagination::players(1, 10, 12)).unwrap();
    assert_eq!(value["totalPlayers"], 12);
    assert_eq!(value["totalRuns"], 12);
    assert_eq!(value["totalPages"], 2);

    let runs = serde_json::to_value(Pagination::runs(1, 10, 12)).unwrap();
    assert!(runs.get("totalPlayers").is_none());
  }

  #[test]
  fn pages_are_one_based_chunks() {
    let items: Vec<u32> = (0..7).collect();
    let got: Vec<(usize, usize)> = pages(&items, 3).map(|(p, c)| (p, c.len())).collect();
    assert_eq!(got, vec![(1, 3), (2, 3), (3, 1)]);
    assert_eq!(pages(&items[..0], 3).count(), 0);
  }
}
