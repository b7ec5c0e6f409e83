//! Translation between REST numeric ids and GraphQL global ids
//! (`gid://shopify/{Kind}/{n}`).

const GID_PREFIX: &str = "gid://shopify/";

/// Numeric id from either a bare number or a global id of any kind.
///
/// Query strings some ids carry (`gid://shopify/InventoryItem/1?x=y`) are
/// ignored.
#[must_use]
pub fn numeric_id(value: &str) -> Option<u64> {
    let trimmed = value.trim();
    let tail = match trimmed.strip_prefix(GID_PREFIX) {
        Some(rest) => {
            let (kind, id) = rest.split_once('/')?;
            if kind.is_empty() {
                return None;
            }
            id
        }
        None => trimmed,
    };
    let tail = tail.split('?').next().unwrap_or(tail);
    tail.parse().ok()
}

/// Global id for `kind` (`Product`, `ProductVariant`, `InventoryItem`, ...).
#[must_use]
pub fn to_gid(kind: &str, id: u64) -> String {
    format!("{GID_PREFIX}{kind}/{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_ids() {
        assert_eq!(numeric_id("gid://shopify/Product/8123456789"), Some(8_123_456_789));
        assert_eq!(numeric_id("gid://shopify/InventoryItem/42"), Some(42));
    }

    #[test]
    fn parses_bare_numbers() {
        assert_eq!(numeric_id("42"), Some(42));
        assert_eq!(numeric_id(" 7 "), Some(7));
    }

    #[test]
    fn ignores_query_suffix() {
        assert_eq!(
            numeric_id("gid://shopify/InventoryItem/42?inventory_item_id=1"),
            Some(42)
        );
    }

    #[test]
    fn rejects_malformed_ids() {
        assert_eq!(numeric_id("gid://shopify/Product/"), None);
        assert_eq!(numeric_id("gid://shopify/42"), None);
        assert_eq!(numeric_id("gid://shopify//42"), None);
        assert_eq!(numeric_id("abc"), None);
        assert_eq!(numeric_id(""), None);
    }

    #[test]
    fn builds_global_ids_that_parse_back() {
        let gid = to_gid("ProductVariant", 99);
        assert_eq!(gid, "gid://shopify/ProductVariant/99");
        assert_eq!(numeric_id(&gid), Some(99));
    }
}
