//! Pro-rata income split.
//!
//! Pure integer arithmetic: every owner receives
//! `floor(holding * total / allocated)` and the cumulative rounding remainder
//! goes to the largest holder (lowest owner id on ties), so the payouts always
//! add up to `total` exactly.

use crate::{EngineError, ResultEngine};

/// One owner's share of a distribution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProRataShare {
    pub owner_id: String,
    pub share_count: i64,
    pub amount_minor: i64,
}

/// Splits `total_minor` across `holdings` (`(owner_id, share_count)`).
///
/// Owners with a zero holding are skipped. The output is ordered by owner id.
pub fn split_pro_rata(
    holdings: &[(String, i64)],
    total_minor: i64,
) -> ResultEngine<Vec<ProRataShare>> {
    if total_minor <= 0 {
        return Err(EngineError::InvalidAmount(
            "total income must be > 0".to_string(),
        ));
    }

    if holdings.iter().any(|(_, n)| *n < 0) {
        return Err(EngineError::InvalidAmount(
            "negative holding in snapshot".to_string(),
        ));
    }
    let mut owners: Vec<&(String, i64)> = holdings.iter().filter(|(_, n)| *n > 0).collect();
    owners.sort_by(|a, b| a.0.cmp(&b.0));

    let allocated: i128 = owners.iter().map(|(_, n)| *n as i128).sum();
    if allocated == 0 {
        return Err(EngineError::InvalidAmount(
            "no shareholders to distribute to".to_string(),
        ));
    }

    let mut shares: Vec<ProRataShare> = owners
        .iter()
        .map(|(owner_id, share_count)| ProRataShare {
            owner_id: owner_id.clone(),
            share_count: *share_count,
            amount_minor: (*share_count as i128 * total_minor as i128 / allocated) as i64,
        })
        .collect();

    let paid: i64 = shares.iter().map(|s| s.amount_minor).sum();
    let remainder = total_minor - paid;
    if remainder > 0 {
        // Owners are sorted by id, so the first maximum is the lowest id.
        let largest = shares
            .iter()
            .enumerate()
            .fold(None::<(usize, i64)>, |best, (idx, s)| match best {
                Some((_, count)) if count >= s.share_count => best,
                _ => Some((idx, s.share_count)),
            })
            .map(|(idx, _)| idx)
            .ok_or_else(|| EngineError::InvalidAmount("empty distribution".to_string()))?;
        shares[largest].amount_minor += remainder;
    }

    Ok(shares)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holdings(raw: &[(&str, i64)]) -> Vec<(String, i64)> {
        raw.iter().map(|(o, n)| (o.to_string(), *n)).collect()
    }

    fn amounts(shares: &[ProRataShare]) -> Vec<(&str, i64)> {
        shares
            .iter()
            .map(|s| (s.owner_id.as_str(), s.amount_minor))
            .collect()
    }

    #[test]
    fn exact_split_has_no_remainder() {
        let shares = split_pro_rata(&holdings(&[("alice", 600), ("bob", 400)]), 1000).unwrap();
        assert_eq!(amounts(&shares), vec![("alice", 600), ("bob", 400)]);
    }

    #[test]
    fn remainder_goes_to_largest_holder() {
        let shares =
            split_pro_rata(&holdings(&[("carol", 1), ("alice", 2), ("bob", 4)]), 100).unwrap();
        // 14.28 / 28.57 / 57.14 -> 14 / 28 / 57 + 1
        assert_eq!(amounts(&shares), vec![("alice", 28), ("bob", 58), ("carol", 14)]);
        assert_eq!(shares.iter().map(|s| s.amount_minor).sum::<i64>(), 100);
    }

    #[test]
    fn ties_go_to_lowest_owner_id() {
        let shares =
            split_pro_rata(&holdings(&[("carol", 1), ("bob", 1), ("alice", 1)]), 100).unwrap();
        assert_eq!(amounts(&shares), vec![("alice", 34), ("bob", 33), ("carol", 33)]);
    }

    #[test]
    fn zero_holdings_are_skipped() {
        let shares = split_pro_rata(&holdings(&[("alice", 0), ("bob", 3)]), 10).unwrap();
        assert_eq!(amounts(&shares), vec![("bob", 10)]);
    }

    #[test]
    fn sums_are_penny_exact_for_awkward_totals() {
        let owners = holdings(&[("a", 333), ("b", 333), ("c", 334), ("d", 7), ("e", 11)]);
        for total in [1, 7, 99, 1_001, 123_457, 9_999_999_999] {
            let shares = split_pro_rata(&owners, total).unwrap();
            assert_eq!(shares.iter().map(|s| s.amount_minor).sum::<i64>(), total);
        }
    }

    #[test]
    fn rejects_empty_snapshot_and_non_positive_total() {
        assert!(split_pro_rata(&[], 10).is_err());
        assert!(split_pro_rata(&holdings(&[("alice", 1)]), 0).is_err());
    }
}
