// Symbol universe selection for a scan
use crate::market::models::{Instrument, Ticker};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

pub const SWAP_SUFFIX: &str = "-USDT-SWAP";

/// Instrument ids of every USDT-settled contract.
pub fn usdt_swaps(instruments: &[Instrument]) -> HashSet<String> {
    instruments
        .iter()
        .filter(|instrument| instrument.settle_ccy == "USDT")
        .map(|instrument| instrument.inst_id.clone())
        .collect()
}

/// The `n` valid instruments with the highest 24h volume, largest first.
/// Equal volumes are ordered by instrument id.
pub fn top_by_volume(tickers: &[Ticker], valid: &HashSet<String>, n: usize) -> Vec<String> {
    let mut ranked: Vec<&Ticker> = tickers
        .iter()
        .filter(|ticker| valid.contains(&ticker.inst_id))
        .collect();

    ranked.sort_by(|a, b| match b.vol_ccy_24h.total_cmp(&a.vol_ccy_24h) {
        Ordering::Equal => a.inst_id.cmp(&b.inst_id),
        other => other,
    });

    ranked
        .into_iter()
        .take(n)
        .map(|ticker| ticker.inst_id.clone())
        .collect()
}

/// Map base assets (e.g. "SOL") to `{BASE}-USDT-SWAP`.
///
/// Returns `(mapped, skipped)`: bases without a listed swap end up in
/// `skipped`, in input order.
pub fn map_static_symbols<S: AsRef<str>>(
    bases: &[S],
    valid: &HashSet<String>,
) -> (Vec<String>, Vec<String>) {
    let mut mapped = Vec::new();
    let mut skipped = Vec::new();

    for base in bases {
        let base = base.as_ref();
        let inst_id = format!("{}{}", base, SWAP_SUFFIX);
        if valid.contains(&inst_id) {
            mapped.push(inst_id);
        } else {
            skipped.push(base.to_string());
        }
    }

    (mapped, skipped)
}

/// Union of two symbol lists, sorted and without duplicates.
pub fn merge_universe(a: &[String], b: &[String]) -> Vec<String> {
    a.iter()
        .chain(b.iter())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument(inst_id: &str, settle_ccy: &str) -> Instrument {
        Instrument {
            inst_id: inst_id.to_string(),
            settle_ccy: settle_ccy.to_string(),
        }
    }

    fn ticker(inst_id: &str, vol_ccy_24h: f64) -> Ticker {
        Ticker {
            inst_id: inst_id.to_string(),
            vol_ccy_24h,
        }
    }

    #[test]
    fn only_usdt_settled_swaps_are_valid() {
        let valid = usdt_swaps(&[
            instrument("BTC-USDT-SWAP", "USDT"),
            instrument("BTC-USD-SWAP", "BTC"),
            instrument("ETH-USDT-SWAP", "USDT"),
        ]);
        assert_eq!(valid.len(), 2);
        assert!(!valid.contains("BTC-USD-SWAP"));
    }

    #[test]
    fn top_by_volume_ranks_valid_tickers() {
        let valid: HashSet<String> = ["A-USDT-SWAP", "B-USDT-SWAP", "C-USDT-SWAP"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let tickers = vec![
            ticker("A-USDT-SWAP", 10.0),
            ticker("B-USDT-SWAP", 30.0),
            ticker("X-USD-SWAP", 1000.0),
            ticker("C-USDT-SWAP", 20.0),
        ];
        assert_eq!(
            top_by_volume(&tickers, &valid, 2),
            vec!["B-USDT-SWAP".to_string(), "C-USDT-SWAP".to_string()]
        );
        assert_eq!(top_by_volume(&tickers, &valid, 10).len(), 3);
    }

    #[test]
    fn static_symbols_split_into_mapped_and_skipped() {
        let valid: HashSet<String> = ["SOL-USDT-SWAP".to_string()].into_iter().collect();
        let (mapped, skipped) = map_static_symbols(&["SOL", "NOPE"], &valid);
        assert_eq!(mapped, vec!["SOL-USDT-SWAP".to_string()]);
        assert_eq!(skipped, vec!["NOPE".to_string()]);
    }

    #[test]
    fn merge_is_sorted_and_unique() {
        let top = vec!["ETH-USDT-SWAP".to_string(), "BTC-USDT-SWAP".to_string()];
        let mapped = vec!["BTC-USDT-SWAP".to_string(), "SOL-USDT-SWAP".to_string()];
        assert_eq!(
            merge_universe(&top, &mapped),
            vec!["BTC-USDT-SWAP", "ETH-USDT-SWAP", "SOL-USDT-SWAP"]
        );
    }
}
