// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `http_errors.rs`

#[cfg(test)]
mod tests {
    use crate::http_errors::map_http_error_to_reason;
    use crate::status_reasons::*;

    #[test]
    fn test_map_http_400() {
        let (reason, message) = map_http_error_to_reason(400);
        assert_eq!(reason, REASON_CLOUDFLARE_BAD_REQUEST);
        assert!(message.contains("400"));
        assert!(message.contains("Invalid"));
    }

    #[test]
    fn test_map_http_422_is_bad_request() {
        let (reason, message) = map_http_error_to_reason(422);
        assert_eq!(reason, REASON_CLOUDFLARE_BAD_REQUEST);
        assert!(message.contains("422"));
    }

    #[test]
    fn test_map_http_auth_failures() {
        assert_eq!(map_http_error_to_reason(401).0, REASON_CLOUDFLARE_AUTH_FAILED);
        assert_eq!(map_http_error_to_reason(403).0, REASON_CLOUDFLARE_AUTH_FAILED);
    }

    #[test]
    fn test_map_http_404() {
        let (reason, message) = map_http_error_to_reason(404);
        assert_eq!(reason, REASON_CLOUDFLARE_NOT_FOUND);
        assert!(message.contains("not found"));
    }

    #[test]
    fn test_map_http_429() {
        let (reason, message) = map_http_error_to_reason(429);
        assert_eq!(reason, REASON_CLOUDFLARE_RATE_LIMITED);
        assert!(message.contains("429"));
    }

    #[test]
    fn test_map_gateway_errors() {
        for code in [502, 503, 504] {
            let (reason, message) = map_http_error_to_reason(code);
            assert_eq!(reason, REASON_GATEWAY_ERROR);
            assert!(message.contains(&code.to_string()));
        }
    }

    #[test]
    fn test_map_unknown_code() {
        let (reason, message) = map_http_error_to_reason(418);
        assert_eq!(reason, REASON_CLOUDFLARE_UNREACHABLE);
        assert!(message.contains("418"));
    }
}
