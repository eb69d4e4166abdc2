pub mod actions;
pub mod auth;
pub mod users;

/// 1-based page number -> (limit, offset)
pub fn page_bounds(page: i64, page_size: i64) -> (i64, i64) {
    let page = page.max(1);
    (page_size, (page - 1) * page_size)
}

pub fn page_count(total: i64, page_size: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        (total + page_size - 1) / page_size
    }
}

/// Pull `page` and the repeatable `neighborhood` key out of raw query pairs.
/// serde's urlencoded layer can't express repeated keys, so lists are parsed
/// by hand.
pub fn parse_list_query(pairs: &[(String, String)]) -> (i64, Vec<String>) {
    let page = pairs
        .iter()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| v.parse::<i64>().ok())
        .unwrap_or(1);
    let neighborhoods = pairs
        .iter()
        .filter(|(k, _)| k == "neighborhood")
        .map(|(_, v)| v.clone())
        .collect();
    (page, neighborhoods)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_are_one_based_and_clamped() {
        assert_eq!(page_bounds(1, 20), (20, 0));
        assert_eq!(page_bounds(3, 20), (20, 40));
        assert_eq!(page_bounds(0, 20), (20, 0));
        assert_eq!(page_bounds(-5, 20), (20, 0));
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 20), 0);
        assert_eq!(page_count(1, 20), 1);
        assert_eq!(page_count(20, 20), 1);
        assert_eq!(page_count(21, 20), 2);
    }

    #[test]
    fn collects_repeated_neighborhood_params() {
        let pairs = vec![
            ("page".to_string(), "2".to_string()),
            ("neighborhood".to_string(), "fairhill".to_string()),
            ("neighborhood".to_string(), "olney".to_string()),
            ("other".to_string(), "x".to_string()),
        ];
        let (page, tags) = parse_list_query(&pairs);
        assert_eq!(page, 2);
        assert_eq!(tags, vec!["fairhill".to_string(), "olney".to_string()]);

        let (page, tags) = parse_list_query(&[]);
        assert_eq!(page, 1);
        assert!(tags.is_empty());
    }
}
