use serde::Serialize;

use super::stats::format_elapsed;
use super::Registry;
use crate::models::{ActiveClient, Space};

/// Number of page links shown around the current page.
pub const PAGE_WINDOW: usize = 5;

impl Registry {
    /// Clients of occupied spaces matching `term` on name, code, space key,
    /// phone or vehicle. A blank term matches every active client.
    pub fn filter_clients(&self, term: &str, now: i64) -> Vec<ActiveClient> {
        let term = term.trim().to_lowercase();

        self.clients()
            .values()
            .filter_map(|client| {
                let space = self.spaces().get(&client.space_key).filter(|s| s.occupied)?;
                let hit = term.is_empty()
                    || [
                        &client.name,
                        &client.code,
                        &client.space_key,
                        &client.phone_intl,
                        &client.vehicle,
                    ]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term));
                hit.then(|| ActiveClient {
                    client: client.clone(),
                    space_display_name: space.effective_name().to_string(),
                    elapsed_time: space
                        .start_time
                        .map(|start| format_elapsed(start, now))
                        .unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Whether a space should be highlighted for the given search term.
    /// Phone matching compares digits only.
    pub fn is_search_hit(&self, space: &Space, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return false;
        }
        if space.key.to_lowercase().contains(&term) {
            return true;
        }

        let Some(client) = space.client_id.as_deref().and_then(|id| self.clients().get(id)) else {
            return false;
        };
        let term_digits: String = term.chars().filter(char::is_ascii_digit).collect();
        let phone_digits: String = client.phone_raw.chars().filter(char::is_ascii_digit).collect();

        client.name.to_lowercase().contains(&term)
            || (!term_digits.is_empty() && phone_digits.contains(&term_digits))
            || client.vehicle.to_lowercase().contains(&term)
            || client.plate.to_lowercase().contains(&term)
    }
}

/// One page of a listing plus the page links to show around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub page_numbers: Vec<usize>,
}

/// Slice `items` into 1-based pages. Out of range pages are clamped.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size);
    let page = page.clamp(1, total_pages.max(1));
    let items = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();
    Page {
        items,
        page,
        total_pages,
        total_items,
        page_numbers: page_window(page, total_pages),
    }
}

/// Up to [`PAGE_WINDOW`] page numbers, centred on `current` when there is
/// room on both sides.
pub fn page_window(current: usize, total: usize) -> Vec<usize> {
    if total == 0 {
        return Vec::new();
    }
    let mut start = current.saturating_sub(PAGE_WINDOW / 2).max(1);
    let end = (start + PAGE_WINDOW - 1).min(total);
    if end + 1 - start < PAGE_WINDOW {
        start = (end + 1).saturating_sub(PAGE_WINDOW).max(1);
    }
    (start..=end).collect()
}
