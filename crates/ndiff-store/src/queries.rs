//! Fixed per-source retrieval queries
//!
//! Both queries select `(txid, height, nftidx, nfttype)` for a closed-open
//! height range. They differ only in the type codes they keep, which must
//! match [`SourceSide::allowed_types`].

use ndiff_core::SourceSide;

pub const SQL_OLD_SELECT_NFT_BY_HEIGHT_RANGE: &str = r#"
SELECT
    lower(hex(reverse(txid))) AS txid, height, nftidx, nfttype
FROM
    blknft_height
WHERE
    height >= ? AND height < ?
    AND nfttype IN (3, 5)
"#;

pub const SQL_NEW_SELECT_NFT_BY_HEIGHT_RANGE: &str = r#"
SELECT
    lower(hex(reverse(txid))) AS txid, height, nftidx, nfttype
FROM
    blknft_height
WHERE
    height >= ? AND height < ?
    AND nfttype = 3
"#;

/// The query a given side is retrieved with
pub fn select_by_height_range(side: SourceSide) -> &'static str {
    match side {
        SourceSide::Old => SQL_OLD_SELECT_NFT_BY_HEIGHT_RANGE,
        SourceSide::New => SQL_NEW_SELECT_NFT_BY_HEIGHT_RANGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_old_query_keeps_types_3_and_5() {
        let sql = select_by_height_range(SourceSide::Old);
        assert!(sql.contains("nfttype IN (3, 5)"));
    }

    #[test]
    fn test_new_query_keeps_type_3_only() {
        let sql = select_by_height_range(SourceSide::New);
        assert!(sql.contains("nfttype = 3"));
        assert!(!sql.contains("IN (3, 5)"));
    }

    #[test]
    fn test_queries_bind_two_range_parameters() {
        for side in [SourceSide::Old, SourceSide::New] {
            let sql = select_by_height_range(side);
            assert_eq!(sql.matches('?').count(), 2);
            assert!(sql.contains("height >= ? AND height < ?"));
        }
    }
}
