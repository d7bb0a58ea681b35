// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. Clamps to zero on a pre-epoch clock.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Joins the given pattern list into a log-friendly string.
pub fn join_patterns(patterns: &[String]) -> String {
    patterns.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_nonzero() {
        assert!(now_ms() > 0);
    }

    #[test]
    fn test_now_ms_is_monotonic_enough() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
    }

    #[test]
    fn test_join_patterns() {
        let patterns = vec!["logs-*".to_string(), "metrics-*".to_string()];
        assert_eq!(join_patterns(&patterns), "logs-*,metrics-*");
        assert_eq!(join_patterns(&[]), "");
    }
}
