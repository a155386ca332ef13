// src/common/phone.rs

use crate::common::error::AppError;

// Todo número guardado no armazenamento tem o prefixo do país (+91...)
// e exatamente NATIONAL_DIGITS dígitos depois dele.
pub const NATIONAL_DIGITS: usize = 10;

#[derive(Debug, Clone)]
pub struct PhoneNormalizer {
    country_code: String,
}

/// Resultado da leitura do texto livre da importação em lote.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedNumbers {
    /// Números aceitos, já normalizados, na ordem de entrada (pode repetir).
    pub accepted: Vec<String>,
    /// Tokens que não passaram na validação, como vieram (após trim).
    pub rejected: Vec<String>,
}

impl PhoneNormalizer {
    pub fn new(country_code: impl Into<String>) -> Self {
        Self { country_code: country_code.into() }
    }

    /// Normaliza um token: aceita `9876543210` ou `+919876543210`.
    /// Devolve `None` se o que sobra depois do prefixo não forem 10 dígitos.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let token = raw.trim();
        let national = token.strip_prefix(self.country_code.as_str()).unwrap_or(token);

        if national.len() != NATIONAL_DIGITS || !national.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(format!("{}{}", self.country_code, national))
    }

    /// Igual a `normalize`, mas como erro de validação.
    pub fn require(&self, raw: &str) -> Result<String, AppError> {
        self.normalize(raw).ok_or_else(|| {
            AppError::Validation(format!(
                "Please enter a valid {}-digit mobile number.",
                NATIONAL_DIGITS
            ))
        })
    }

    /// Divide em quebras de linha ou vírgulas, faz trim e descarta vazios.
    pub fn parse_batch(&self, raw_text: &str) -> ParsedNumbers {
        let mut parsed = ParsedNumbers::default();

        for token in raw_text.split(['\n', ',']).map(str::trim).filter(|t| !t.is_empty()) {
            match self.normalize(token) {
                Some(number) => parsed.accepted.push(number),
                None => parsed.rejected.push(token.to_string()),
            }
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn india() -> PhoneNormalizer {
        PhoneNormalizer::new("+91")
    }

    #[test]
    fn bare_and_prefixed_numbers_normalize_to_the_same_value() {
        let n = india();
        assert_eq!(n.normalize("9876543210").as_deref(), Some("+919876543210"));
        assert_eq!(n.normalize("+919876543210").as_deref(), Some("+919876543210"));
        assert_eq!(n.normalize("  9876543210 ").as_deref(), Some("+919876543210"));
    }

    #[test]
    fn non_digit_or_wrong_length_tokens_are_rejected() {
        let n = india();
        assert_eq!(n.normalize("98765-43210"), None);
        assert_eq!(n.normalize("98765"), None);
        assert_eq!(n.normalize("+9198765432101"), None);
        assert_eq!(n.normalize("+44 7700900123"), None);
        assert_eq!(n.normalize("+91"), None);
    }

    #[test]
    fn batch_splits_on_newlines_and_commas() {
        let parsed = india().parse_batch("9876543210,\n 9123456789 ,,abc\r\n\n+918888888888");
        assert_eq!(
            parsed.accepted,
            vec!["+919876543210", "+919123456789", "+918888888888"]
        );
        assert_eq!(parsed.rejected, vec!["abc"]);
    }

    #[test]
    fn batch_keeps_repeated_numbers_for_duplicate_detection() {
        let parsed = india().parse_batch("9876543210,9876543210");
        assert_eq!(parsed.accepted.len(), 2);
    }
}
