use chrono::Utc;
use uuid::Uuid;

/// Human-facing reference generation.
///
/// A second-resolution timestamp alone collides under concurrent creation,
/// so every reference carries an 8-char UUID fragment; the store's unique
/// constraints are the final arbiter and callers retry once on conflict.

fn timestamp() -> String {
    Utc::now().format("%Y%m%d%H%M%S").to_string()
}

fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// Format: ORD-20260830141502-AB12CD34
pub fn order_number() -> String {
    format!("ORD-{}-{}", timestamp(), suffix())
}

/// Format: PAY-20260830141502-AB12CD34
pub fn payment_reference() -> String {
    format!("PAY-{}-{}", timestamp(), suffix())
}

/// Carrier-prefixed tracking number, e.g. DHL20260830141502-AB12CD34.
pub fn tracking_number(carrier_name: &str) -> String {
    let prefix: String = carrier_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_uppercase();
    let prefix = if prefix.is_empty() {
        "SHP".to_string()
    } else {
        prefix
    };
    format!("{}{}-{}", prefix, timestamp(), suffix())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_shape() {
        let n = order_number();
        assert!(n.starts_with("ORD-"));
        // ORD- + 14 digit timestamp + - + 8 char suffix
        assert_eq!(n.len(), 4 + 14 + 1 + 8);
    }

    #[test]
    fn same_second_references_differ() {
        assert_ne!(order_number(), order_number());
        assert_ne!(payment_reference(), payment_reference());
    }

    #[test]
    fn tracking_number_uses_carrier_prefix() {
        assert!(tracking_number("DHL Express").starts_with("DHL"));
        assert!(tracking_number("ups").starts_with("UPS"));
        // Degenerate carrier names fall back to a neutral prefix.
        assert!(tracking_number("--").starts_with("SHP"));
    }
}
