use crate::error::CodeSheetError;

/// Splits raw request text into trimmed, non-empty tokens, preserving order.
/// Accepts LF, CR, and CRLF line endings.
pub fn normalize(raw: &str) -> Result<Vec<String>, CodeSheetError> {
    let tokens: Vec<String> = raw
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect();
    if tokens.is_empty() {
        return Err(CodeSheetError::Validation(
            "no tokens provided".to_string(),
        ));
    }
    Ok(tokens)
}

/// Rejects any token containing a non-digit character.
pub fn require_digits(tokens: &[String]) -> Result<(), CodeSheetError> {
    for token in tokens {
        if !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CodeSheetError::Validation(format!(
                "token {:?} contains non-digit characters",
                token
            )));
        }
    }
    Ok(())
}

/// Rejects any token outside the Code 128 charset B range (printable ASCII).
pub fn require_code128(tokens: &[String]) -> Result<(), CodeSheetError> {
    for token in tokens {
        if !token.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
            return Err(CodeSheetError::Validation(format!(
                "token {:?} cannot be encoded as Code 128",
                token
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_splits_trims_and_drops_blanks() {
        let tokens = normalize("100\n200\n\n300").expect("tokens");
        assert_eq!(tokens, vec!["100", "200", "300"]);
    }

    #[test]
    fn normalize_handles_crlf_and_padding() {
        let tokens = normalize("  alpha \r\nbeta\r\r\n  \ngamma").expect("tokens");
        assert_eq!(tokens, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn normalize_rejects_empty_input() {
        let err = normalize("  \n \r\n ").expect_err("must fail");
        assert!(matches!(err, CodeSheetError::Validation(_)));
    }

    #[test]
    fn digits_check_flags_letters() {
        let tokens = vec!["123".to_string(), "12a".to_string()];
        assert!(require_digits(&tokens).is_err());
        assert!(require_digits(&tokens[..1].to_vec()).is_ok());
    }

    #[test]
    fn code128_check_flags_non_ascii() {
        let tokens = vec!["ASCII-ok 123".to_string()];
        assert!(require_code128(&tokens).is_ok());
        let tokens = vec!["caf\u{e9}".to_string()];
        assert!(require_code128(&tokens).is_err());
    }
}
