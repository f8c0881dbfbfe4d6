//! Ticker universe parsing.
//!
//! Tickers come from a comma-separated list in config or on the command line.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),

    #[error("invalid character {ch:?} in ticker {ticker}")]
    InvalidCharacter { ticker: String, ch: char },

    #[error("ticker {0} is not a valid name")]
    DotsOnly(String),
}

fn is_ticker_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_' | '^' | '=')
}

/// Splits, trims and upper-cases a ticker list. Empty tokens, duplicates and
/// characters outside `A-Z 0-9 . - _ ^ =` are rejected, as are names made only of dots
/// (they would resolve to a parent directory in the datastore).
pub fn parse_tickers(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let ticker = trimmed.to_uppercase();
        if let Some(ch) = ticker.chars().find(|&c| !is_ticker_char(c)) {
            return Err(UniverseError::InvalidCharacter { ticker, ch });
        }
        if ticker.chars().all(|c| c == '.') {
            return Err(UniverseError::DotsOnly(ticker));
        }
        if !seen.insert(ticker.clone()) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_uppercases() {
        let tickers = parse_tickers(" aapl, msft ,BRK.B,^gspc,eurusd=x").unwrap();
        assert_eq!(tickers, vec!["AAPL", "MSFT", "BRK.B", "^GSPC", "EURUSD=X"]);
    }

    #[test]
    fn single_ticker() {
        assert_eq!(parse_tickers("spy").unwrap(), vec!["SPY"]);
    }

    #[test]
    fn rejects_empty_token() {
        assert_eq!(parse_tickers("AAPL,,MSFT"), Err(UniverseError::EmptyToken));
        assert_eq!(parse_tickers(""), Err(UniverseError::EmptyToken));
    }

    #[test]
    fn rejects_case_insensitive_duplicates() {
        assert_eq!(
            parse_tickers("AAPL,aapl"),
            Err(UniverseError::DuplicateTicker("AAPL".to_string()))
        );
    }

    #[test]
    fn rejects_path_characters() {
        assert_eq!(
            parse_tickers("../etc"),
            Err(UniverseError::InvalidCharacter {
                ticker: "../ETC".to_string(),
                ch: '/'
            })
        );
        assert!(parse_tickers("A B").is_err());
    }

    #[test]
    fn rejects_dot_only_names() {
        assert_eq!(
            parse_tickers(".."),
            Err(UniverseError::DotsOnly("..".to_string()))
        );
        assert_eq!(
            parse_tickers("AAPL, ."),
            Err(UniverseError::DotsOnly(".".to_string()))
        );
        assert_eq!(parse_tickers("A.B.").unwrap(), vec!["A.B."]);
    }
}
