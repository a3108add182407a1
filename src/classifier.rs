//! Turns a decoded payload into something the lookup layer can act on.
//!
//! Classification is pure and total: every payload yields exactly one
//! [`ClassifiedResult`], unrecognised input degrading to a generic payload.

use crate::decoder::{DecodedCode, Symbology};
use crate::error::{NutriscanError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// `(01)` GTIN-14 followed by `(21)` 13-character serial; parentheses optional
    static ref GS1_MARKING: Regex =
        Regex::new(r#"^\(?01\)?([0-9]{14})\(?21\)?([0-9A-Za-z!"%&'*+,\-./:;<=>?_]{13})"#)
            .expect("GS1 marking pattern is valid");
    static ref URL_SCHEME: Regex =
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("URL scheme pattern is valid");
}

/// AIM symbology identifiers some readers prepend to the payload
const SYMBOLOGY_PREFIXES: &[&str] = &["]d2", "]C1", "]Q3", "]e0"];
const GROUP_SEPARATOR: char = '\u{1d}';
const FIXED_MARKING_LEN: usize = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultKind {
    RetailBarcode,
    MarkingCode,
    GenericPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Annotation {
    /// Payload starts with a URL scheme
    Link,
    /// Identifier inferred from digit count alone
    Speculative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedResult {
    pub kind: ResultKind,
    pub product_identifier: Option<String>,
    pub raw_payload: String,
    pub annotation: Option<Annotation>,
}

impl ClassifiedResult {
    fn retail(raw: &str, identifier: &str, annotation: Option<Annotation>) -> Self {
        Self {
            kind: ResultKind::RetailBarcode,
            product_identifier: Some(identifier.to_string()),
            raw_payload: raw.to_string(),
            annotation,
        }
    }

    fn marking(raw: &str, gtin: String) -> Self {
        Self {
            kind: ResultKind::MarkingCode,
            product_identifier: Some(gtin),
            raw_payload: raw.to_string(),
            annotation: None,
        }
    }

    fn generic(raw: &str, annotation: Option<Annotation>) -> Self {
        Self {
            kind: ResultKind::GenericPayload,
            product_identifier: None,
            raw_payload: raw.to_string(),
            annotation,
        }
    }
}

/// How marking codes are recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gs1Strategy {
    /// Application Identifier grammar `01` + 14 digits + `21` + 13-char serial
    ApplicationIdentifier,
    /// 31 digits, GTIN sliced from fixed offsets
    FixedOffset,
    /// Grammar first, fixed offsets second
    Either,
}

#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    strategy: Gs1Strategy,
}

impl Classifier {
    pub fn new(strategy: Gs1Strategy) -> Self {
        Self { strategy }
    }

    pub fn classify(&self, code: &DecodedCode) -> ClassifiedResult {
        self.classify_payload(&code.payload, code.symbology)
    }

    pub fn classify_payload(&self, raw: &str, symbology: Option<Symbology>) -> ClassifiedResult {
        let payload = normalize(raw);
        if payload.is_empty() {
            return ClassifiedResult::generic(raw, None);
        }

        match symbology {
            Some(s) if s.is_retail() => ClassifiedResult::retail(raw, payload, None),
            Some(s) if s.is_two_dimensional() => {
                if let Some(gtin) = self.extract_gtin(payload) {
                    ClassifiedResult::marking(raw, gtin)
                } else if URL_SCHEME.is_match(payload) {
                    ClassifiedResult::generic(raw, Some(Annotation::Link))
                } else {
                    ClassifiedResult::generic(raw, None)
                }
            }
            _ => self.infer(raw, payload),
        }
    }

    /// Structural inference for text-only results
    fn infer(&self, raw: &str, payload: &str) -> ClassifiedResult {
        let all_digits = payload.bytes().all(|b| b.is_ascii_digit());

        if all_digits && matches!(payload.len(), 8 | 12 | 13) {
            return ClassifiedResult::retail(raw, payload, None);
        }

        if let Some(gtin) = self.extract_gtin(payload) {
            return ClassifiedResult::marking(raw, gtin);
        }

        if URL_SCHEME.is_match(payload) {
            return ClassifiedResult::generic(raw, Some(Annotation::Link));
        }

        if all_digits && (8..=14).contains(&payload.len()) {
            return ClassifiedResult::retail(raw, payload, Some(Annotation::Speculative));
        }

        ClassifiedResult::generic(raw, None)
    }

    /// Embedded GTIN of a marking code, if the payload is one
    pub fn extract_gtin(&self, payload: &str) -> Option<String> {
        let payload = normalize(payload);
        match self.strategy {
            Gs1Strategy::ApplicationIdentifier => ai_gtin(payload),
            Gs1Strategy::FixedOffset => fixed_offset_gtin(payload),
            Gs1Strategy::Either => ai_gtin(payload).or_else(|| fixed_offset_gtin(payload)),
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(Gs1Strategy::Either)
    }
}

/// Classify with the default strategy
pub fn classify(payload: &str, symbology: Option<Symbology>) -> ClassifiedResult {
    Classifier::default().classify_payload(payload, symbology)
}

/// Check a manually typed code before it is looked up
pub fn validate_manual_entry(input: &str, min_length: usize) -> Result<String> {
    let code = input.trim();

    if code.is_empty() {
        return Err(NutriscanError::invalid_input("Enter a barcode"));
    }

    if code.chars().count() < min_length {
        return Err(NutriscanError::invalid_input(format!(
            "A barcode must have at least {} digits",
            min_length
        )));
    }

    Ok(code.to_string())
}

fn normalize(raw: &str) -> &str {
    let mut payload = raw.trim();
    for prefix in SYMBOLOGY_PREFIXES {
        if let Some(rest) = payload.strip_prefix(prefix) {
            payload = rest;
            break;
        }
    }
    payload.trim_start_matches(GROUP_SEPARATOR)
}

fn ai_gtin(payload: &str) -> Option<String> {
    GS1_MARKING
        .captures(payload)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn fixed_offset_gtin(payload: &str) -> Option<String> {
    let fits = payload.len() == FIXED_MARKING_LEN
        && payload.bytes().all(|b| b.is_ascii_digit())
        && payload.starts_with("01")
        && &payload[16..18] == "21";

    fits.then(|| payload[2..16].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retail_lengths_without_hint() {
        for code in ["96385074", "036000291452", "3017620422003"] {
            let result = classify(code, None);
            assert_eq!(result.kind, ResultKind::RetailBarcode, "{}", code);
            assert_eq!(result.product_identifier.as_deref(), Some(code));
            assert_eq!(result.annotation, None);
        }
    }

    #[test]
    fn test_marking_code_extracts_gtin() {
        let result = classify("0103017620422003211234567890123", None);
        assert_eq!(result.kind, ResultKind::MarkingCode);
        assert_eq!(result.product_identifier.as_deref(), Some("03017620422003"));
    }

    #[test]
    fn test_marking_code_with_parentheses_and_tail() {
        let payload = "(01)04607034170862(21)5Ab!cdEF%gh-z\u{1d}91EE06\u{1d}92abc";
        let result = classify(payload, Some(Symbology::DataMatrix));
        assert_eq!(result.kind, ResultKind::MarkingCode);
        assert_eq!(result.product_identifier.as_deref(), Some("04607034170862"));
        assert_eq!(result.raw_payload, payload);
    }

    #[test]
    fn test_symbology_identifier_prefix_is_ignored() {
        let result = classify("]d2\u{1d}0104607034170862215AbcdEFghijk1", None);
        assert_eq!(result.kind, ResultKind::MarkingCode);
        assert_eq!(result.product_identifier.as_deref(), Some("04607034170862"));
    }

    #[test]
    fn test_url_is_generic_link() {
        let result = classify("https://example.com/x", None);
        assert_eq!(result.kind, ResultKind::GenericPayload);
        assert_eq!(result.product_identifier, None);
        assert_eq!(result.annotation, Some(Annotation::Link));

        let qr = classify("http://example.com", Some(Symbology::QrCode));
        assert_eq!(qr.annotation, Some(Annotation::Link));
    }

    #[test]
    fn test_speculative_retail() {
        let result = classify("12345678901", None);
        assert_eq!(result.kind, ResultKind::RetailBarcode);
        assert_eq!(result.annotation, Some(Annotation::Speculative));

        let gtin14 = classify("14601234567890", None);
        assert_eq!(gtin14.kind, ResultKind::RetailBarcode);
    }

    #[test]
    fn test_unrecognised_input_is_generic() {
        for payload in ["", "   ", "hello world", "1234567", "123456789012345", "WIFI:S:net;;"] {
            let result = classify(payload, None);
            assert_eq!(result.kind, ResultKind::GenericPayload, "{:?}", payload);
            assert_eq!(result.product_identifier, None);
        }
    }

    #[test]
    fn test_reported_symbology_is_trusted() {
        let result = classify("ABC-123", Some(Symbology::Code128));
        assert_eq!(result.kind, ResultKind::RetailBarcode);
        assert_eq!(result.product_identifier.as_deref(), Some("ABC-123"));

        let matrix = classify("3017620422003", Some(Symbology::DataMatrix));
        assert_eq!(matrix.kind, ResultKind::GenericPayload);
    }

    #[test]
    fn test_fixed_offset_strategy() {
        let fixed = Classifier::new(Gs1Strategy::FixedOffset);
        let result = fixed.classify_payload("0103017620422003211234567890123", None);
        assert_eq!(result.product_identifier.as_deref(), Some("03017620422003"));

        // Alphanumeric serials only match the grammar
        let serial = "010301762042200321ABCDEFGHIJKLM";
        assert_eq!(fixed.extract_gtin(serial), None);
        let grammar = Classifier::new(Gs1Strategy::ApplicationIdentifier);
        assert_eq!(grammar.extract_gtin(serial).as_deref(), Some("03017620422003"));
    }

    #[test]
    fn test_classification_is_idempotent() {
        let classifier = Classifier::default();
        let code = DecodedCode::new("0103017620422003211234567890123", None, "test");
        assert_eq!(classifier.classify(&code), classifier.classify(&code));
    }

    #[test]
    fn test_manual_entry_validation() {
        assert_eq!(validate_manual_entry("  3017620422003 ", 8).unwrap(), "3017620422003");
        assert!(validate_manual_entry("", 8).is_err());
        assert!(validate_manual_entry("1234", 8).is_err());
    }
}
