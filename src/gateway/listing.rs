//! Listing semantics: bounded counts, default ordering and the random-offset
//! sampling mode.
//!
//! Random mode is best-effort dashboard sampling. It counts the matching
//! records, picks a pseudo-random starting offset in `[0, count)`, then reads
//! a window of `limit` records from there. It is not a uniform sample, and
//! because count and fetch are separate storage calls a concurrent delete can
//! leave the offset past the end, yielding a short or empty page.

use rand::Rng;
use std::collections::{BTreeMap, HashMap};

use super::error::{GatewayError, GatewayResult};
use super::resource::ResourceType;
use crate::config::ListingConfig;
use crate::filter::FilterOrderInfo;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub limit: Option<u32>,
    pub random: bool,
    /// Remaining query parameters, treated as equality filters
    pub filters: BTreeMap<String, String>,
}

impl ListParams {
    pub fn from_query(query: HashMap<String, String>) -> GatewayResult<Self> {
        let mut params = ListParams::default();
        for (key, value) in query {
            match key.as_str() {
                "limit" => {
                    let limit = value
                        .trim()
                        .parse::<u32>()
                        .map_err(|_| GatewayError::invalid("limit", "must be a non-negative integer"))?;
                    params.limit = Some(limit);
                }
                "random" => {
                    params.random = parse_flag(&value)
                        .ok_or_else(|| GatewayError::invalid("random", "must be true or false"))?;
                }
                _ => {
                    params.filters.insert(key, value);
                }
            }
        }
        Ok(params)
    }

    /// Limit actually sent to storage
    pub fn effective_limit(&self, config: &ListingConfig) -> Option<u32> {
        let requested = match (self.limit, self.random) {
            (Some(limit), _) => Some(limit),
            (None, true) => Some(config.default_limit),
            (None, false) => None,
        };
        Some(requested.map_or(config.max_limit, |limit| limit.min(config.max_limit)))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Most-recent-first ordering per resource; route suggestions by name
pub fn default_order(resource: ResourceType) -> Vec<FilterOrderInfo> {
    match resource {
        ResourceType::Load => vec![FilterOrderInfo::desc("started_at"), FilterOrderInfo::desc("created_at")],
        ResourceType::TimeOff => vec![FilterOrderInfo::desc("start_date"), FilterOrderInfo::desc("created_at")],
        ResourceType::Route => vec![FilterOrderInfo::desc("name"), FilterOrderInfo::desc("created_at")],
        _ => vec![FilterOrderInfo::desc("created_at")],
    }
}

/// Starting offset for random mode, always `< total` when `total > 0`
pub fn random_offset<R: Rng + ?Sized>(total: u64, rng: &mut R) -> u64 {
    if total == 0 {
        0
    } else {
        rng.gen_range(0..total)
    }
}

/// [`random_offset`] with the thread-local generator
pub fn sample_offset(total: u64) -> u64 {
    random_offset(total, &mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_from_query_splits_reserved_keys() {
        let params = ListParams::from_query(query(&[("limit", "3"), ("random", "true"), ("status", "SUGGESTED")])).unwrap();
        assert_eq!(params.limit, Some(3));
        assert!(params.random);
        assert_eq!(params.filters.get("status").map(String::as_str), Some("SUGGESTED"));
    }

    #[test]
    fn test_from_query_rejects_bad_values() {
        assert!(matches!(
            ListParams::from_query(query(&[("limit", "-1")])),
            Err(GatewayError::InvalidPayload(_))
        ));
        assert!(ListParams::from_query(query(&[("random", "sometimes")])).is_err());
    }

    #[test]
    fn test_effective_limit() {
        let config = ListingConfig { default_limit: 5, max_limit: 50 };
        assert_eq!(ListParams::default().effective_limit(&config), Some(50));
        assert_eq!(ListParams { random: true, ..Default::default() }.effective_limit(&config), Some(5));
        assert_eq!(ListParams { limit: Some(3), ..Default::default() }.effective_limit(&config), Some(3));
        assert_eq!(ListParams { limit: Some(500), ..Default::default() }.effective_limit(&config), Some(50));
    }

    #[test]
    fn test_random_offset_stays_below_count() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(random_offset(0, &mut rng), 0);
        for total in 1..50u64 {
            for _ in 0..20 {
                assert!(random_offset(total, &mut rng) < total);
            }
        }
    }

    #[test]
    fn test_loads_order_by_start_time() {
        let order = default_order(ResourceType::Load);
        assert_eq!(order[0], FilterOrderInfo::desc("started_at"));
    }
}
