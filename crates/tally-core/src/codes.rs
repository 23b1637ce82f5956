//! Human-facing codes: coupon codes, generated SKUs, document numbers.

use uuid::Uuid;

use crate::types::DocumentKind;

pub const COUPON_PREFIX: &str = "CPN-";
pub const COUPON_CODE_LEN: usize = 6;
pub const SKU_PREFIX: &str = "PRD-";
pub const SKU_CODE_LEN: usize = 8;

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// `len` characters from 0-9A-Z drawn from a fresh v4 UUID.
fn random_token(len: usize) -> String {
    Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(len)
        .map(|b| ALPHABET[(*b as usize) % ALPHABET.len()] as char)
        .collect()
}

/// A fresh `CPN-XXXXXX` code. Uniqueness is checked by the caller.
pub fn generate_coupon_code() -> String {
    format!("{}{}", COUPON_PREFIX, random_token(COUPON_CODE_LEN))
}

/// A fresh `PRD-XXXXXXXX` SKU for products created without one.
pub fn generate_sku() -> String {
    format!("{}{}", SKU_PREFIX, random_token(SKU_CODE_LEN))
}

/// Trims and upper-cases a code typed at the register.
pub fn normalize_coupon_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// True for `CPN-` followed by six characters from 0-9A-Z.
pub fn is_coupon_code(code: &str) -> bool {
    match code.strip_prefix(COUPON_PREFIX) {
        Some(rest) => {
            rest.len() == COUPON_CODE_LEN
                && rest
                    .bytes()
                    .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
        }
        None => false,
    }
}

/// Formats a sequence number: `INV-000001`, `PO-000042`.
pub fn document_number(kind: DocumentKind, seq: i64) -> String {
    let prefix = match kind {
        DocumentKind::Sale => "INV",
        DocumentKind::Purchase => "PO",
    };
    format!("{}-{:06}", prefix, seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coupon_code_format() {
        for _ in 0..50 {
            let code = generate_coupon_code();
            assert_eq!(code.len(), 10);
            assert!(is_coupon_code(&code), "bad code {code}");
        }
    }

    #[test]
    fn test_is_coupon_code() {
        assert!(is_coupon_code("CPN-A1B2C3"));
        assert!(!is_coupon_code("CPN-a1b2c3"));
        assert!(!is_coupon_code("CPN-A1B2C"));
        assert!(!is_coupon_code("XYZ-A1B2C3"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_coupon_code("  cpn-a1b2c3 "), "CPN-A1B2C3");
    }

    #[test]
    fn test_generated_sku_passes_validation() {
        let sku = generate_sku();
        assert!(sku.starts_with(SKU_PREFIX));
        assert_eq!(sku.len(), SKU_PREFIX.len() + SKU_CODE_LEN);
        assert!(crate::validation::validate_sku(&sku).is_ok());
    }

    #[test]
    fn test_document_numbers() {
        assert_eq!(document_number(DocumentKind::Sale, 1), "INV-000001");
        assert_eq!(document_number(DocumentKind::Purchase, 42), "PO-000042");
        assert_eq!(document_number(DocumentKind::Sale, 1_234_567), "INV-1234567");
    }
}
