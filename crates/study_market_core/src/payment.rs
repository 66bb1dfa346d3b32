//! crates/study_market_core/src/payment.rs
//!
//! The fixed catalogue of payment methods and transaction id generation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentKind {
    Qr,
    Upi,
    Card,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Qr => "qr",
            PaymentKind::Upi => "upi",
            PaymentKind::Card => "card",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentMethod {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: PaymentKind,
}

const METHODS: [PaymentMethod; 5] = [
    PaymentMethod { id: "1", name: "UPI QR Code", kind: PaymentKind::Qr },
    PaymentMethod { id: "2", name: "PhonePe", kind: PaymentKind::Upi },
    PaymentMethod { id: "3", name: "Google Pay", kind: PaymentKind::Upi },
    PaymentMethod { id: "4", name: "Paytm", kind: PaymentKind::Upi },
    PaymentMethod { id: "5", name: "Credit/Debit Card", kind: PaymentKind::Card },
];

/// The method preselected at checkout.
pub const DEFAULT_PAYMENT_METHOD: &str = "1";

impl PaymentMethod {
    pub fn catalogue() -> &'static [PaymentMethod] {
        &METHODS
    }

    pub fn find(id: &str) -> Option<&'static PaymentMethod> {
        METHODS.iter().find(|m| m.id == id)
    }
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Builds a transaction reference of the form `TXN_<unix millis>_<9 base36 chars>`.
pub fn transaction_id(now: DateTime<Utc>) -> String {
    let mut entropy = Uuid::new_v4().as_u128();
    let suffix: String = (0..9)
        .map(|_| {
            let c = BASE36[(entropy % 36) as usize] as char;
            entropy /= 36;
            c
        })
        .collect();
    format!("TXN_{}_{}", now.timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn catalogue_lookup() {
        assert_eq!(PaymentMethod::catalogue().len(), 5);
        assert_eq!(PaymentMethod::find("5").map(|m| m.kind), Some(PaymentKind::Card));
        assert_eq!(PaymentMethod::find(DEFAULT_PAYMENT_METHOD).map(|m| m.name), Some("UPI QR Code"));
        assert!(PaymentMethod::find("9").is_none());
    }

    #[test]
    fn transaction_ids_have_the_expected_shape() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let id = transaction_id(now);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "TXN");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].bytes().all(|b| BASE36.contains(&b)));
        assert_ne!(id, transaction_id(now));
    }
}
