//! Page parameter handling for collection reads (`page[offset]`, `page[limit]`).

use crate::document::PageLinks;
use std::collections::HashMap;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

pub const PARAM_OFFSET: &str = "offset";
pub const PARAM_LIMIT: &str = "limit";
/// Accepted as a synonym for `limit`.
pub const PARAM_SIZE: &str = "size";

/// Turns `page[...]` members into (offset, limit).
pub trait PaginationStrategy: Send + Sync {
    fn parameters(&self, page: &HashMap<String, String>) -> (u32, u32);
}

#[derive(Clone, Debug)]
pub struct BasicPagination {
    pub default_size: u32,
    pub max_size: u32,
}

impl Default for BasicPagination {
    fn default() -> Self {
        BasicPagination {
            default_size: DEFAULT_PAGE_SIZE,
            max_size: MAX_PAGE_SIZE,
        }
    }
}

impl BasicPagination {
    pub fn new(default_size: u32, max_size: u32) -> Self {
        let max_size = max_size.max(1);
        BasicPagination {
            default_size: default_size.clamp(1, max_size),
            max_size,
        }
    }
}

impl PaginationStrategy for BasicPagination {
    fn parameters(&self, page: &HashMap<String, String>) -> (u32, u32) {
        let offset = page
            .get(PARAM_OFFSET)
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);
        let limit = page
            .get(PARAM_LIMIT)
            .or_else(|| page.get(PARAM_SIZE))
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(self.default_size)
            .clamp(1, self.max_size);
        (offset, limit)
    }
}

/// Extracts `page[name]=value` pairs from flat query parameters.
pub fn page_params(query: &HashMap<String, String>) -> HashMap<String, String> {
    query
        .iter()
        .filter_map(|(k, v)| {
            k.strip_prefix("page[")
                .and_then(|rest| rest.strip_suffix(']'))
                .map(|name| (name.to_string(), v.clone()))
        })
        .collect()
}

/// Self/first/prev/next links for one page of a collection. Every non-page
/// query parameter is carried over so filters and sorting survive paging.
pub fn page_links(
    collection_url: &str,
    query: &HashMap<String, String>,
    offset: u32,
    limit: u32,
    has_more: bool,
) -> PageLinks {
    let mut kept: Vec<(&String, &String)> = query.iter().filter(|(k, _)| !k.starts_with("page[")).collect();
    kept.sort();
    let link = |offset: u32| {
        let mut ser = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &kept {
            ser.append_pair(k, v);
        }
        ser.append_pair(&format!("page[{}]", PARAM_OFFSET), &offset.to_string());
        ser.append_pair(&format!("page[{}]", PARAM_LIMIT), &limit.to_string());
        format!("{}?{}", collection_url, ser.finish())
    };
    PageLinks {
        self_: link(offset),
        first: link(0),
        prev: (offset > 0).then(|| link(offset.saturating_sub(limit))),
        next: has_more.then(|| link(offset + limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn page(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[rstest]
    #[case(&[], (0, 20))]
    #[case(&[("offset", "40"), ("limit", "10")], (40, 10))]
    #[case(&[("size", "5")], (0, 5))]
    #[case(&[("limit", "1000")], (0, 100))]
    #[case(&[("limit", "0")], (0, 1))]
    #[case(&[("offset", "-3"), ("limit", "abc")], (0, 20))]
    fn offset_and_limit(#[case] pairs: &[(&str, &str)], #[case] expected: (u32, u32)) {
        assert_eq!(BasicPagination::default().parameters(&page(pairs)), expected);
    }

    #[test]
    fn default_size_never_exceeds_max() {
        let p = BasicPagination::new(50, 10);
        assert_eq!(p.parameters(&HashMap::new()), (0, 10));
    }

    #[test]
    fn page_members_are_extracted_from_query() {
        let q = page(&[("page[offset]", "2"), ("sort", "title"), ("page[limit]", "3")]);
        let p = page_params(&q);
        assert_eq!(p.len(), 2);
        assert_eq!(p.get("offset").map(String::as_str), Some("2"));
        assert_eq!(p.get("limit").map(String::as_str), Some("3"));
    }

    #[test]
    fn links_keep_filters_and_step_by_limit() {
        let q = page(&[("filter[title]", "a b"), ("page[offset]", "10"), ("page[limit]", "5")]);
        let links = page_links("/api/posts", &q, 10, 5, true);
        assert_eq!(
            links.self_,
            "/api/posts?filter%5Btitle%5D=a+b&page%5Boffset%5D=10&page%5Blimit%5D=5"
        );
        assert!(links.first.contains("page%5Boffset%5D=0&"));
        assert!(links.prev.as_deref().unwrap().contains("page%5Boffset%5D=5&"));
        assert!(links.next.as_deref().unwrap().contains("page%5Boffset%5D=15&"));
    }

    #[test]
    fn first_page_has_no_prev_and_last_has_no_next() {
        let links = page_links("/posts", &HashMap::new(), 0, 20, false);
        assert_eq!(links.prev, None);
        assert_eq!(links.next, None);
        assert_eq!(links.self_, links.first);
    }
}
