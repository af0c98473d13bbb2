//! HTTP Basic (RFC 7617) and Digest (RFC 7616) authentication.

use std::collections::HashMap;

use base64::Engine;
use rand::Rng;

/// State of a Digest challenge, kept between requests so the nonce count
/// advances.
#[derive(Debug, Clone)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// Offered quality of protection, e.g. `auth` or `auth,auth-int`.
    pub qop: Option<String>,
    pub algorithm: String,
    nonce_count: u32,
}

impl DigestChallenge {
    /// Reads a `WWW-Authenticate: Digest ...` header value.
    ///
    /// Returns `None` for other schemes or when `realm`/`nonce` are missing.
    pub fn parse(header: &str) -> Option<Self> {
        let params = parse_params(header.strip_prefix("Digest ")?.trim());

        Some(Self {
            realm: params.get("realm")?.clone(),
            nonce: params.get("nonce")?.clone(),
            opaque: params.get("opaque").cloned(),
            qop: params.get("qop").cloned(),
            algorithm: params
                .get("algorithm")
                .cloned()
                .unwrap_or_else(|| "MD5".to_string()),
            nonce_count: 0,
        })
    }

    fn offers_auth_qop(&self) -> bool {
        self.qop
            .as_deref()
            .is_some_and(|qop| qop.split(',').any(|q| q.trim() == "auth"))
    }

    /// Builds the `Authorization` header for one request.
    pub fn respond(&mut self, method: &str, uri: &str, username: &str, password: &str) -> String {
        self.nonce_count += 1;
        let nc = format!("{:08x}", self.nonce_count);
        let cnonce = client_nonce();

        let ha1 = md5_hex(&format!("{}:{}:{}", username, self.realm, password));
        let ha2 = md5_hex(&format!("{}:{}", method, uri));
        let qop_auth = self.offers_auth_qop();

        let response = if qop_auth {
            md5_hex(&format!(
                "{}:{}:{}:{}:auth:{}",
                ha1, self.nonce, nc, cnonce, ha2
            ))
        } else {
            md5_hex(&format!("{}:{}:{}", ha1, self.nonce, ha2))
        };

        let mut fields = vec![
            format!("username=\"{}\"", username),
            format!("realm=\"{}\"", self.realm),
            format!("nonce=\"{}\"", self.nonce),
            format!("uri=\"{}\"", uri),
            format!("response=\"{}\"", response),
            format!("algorithm={}", self.algorithm),
        ];
        if qop_auth {
            fields.push("qop=auth".to_string());
            fields.push(format!("nc={}", nc));
            fields.push(format!("cnonce=\"{}\"", cnonce));
        }
        if let Some(opaque) = &self.opaque {
            fields.push(format!("opaque=\"{}\"", opaque));
        }

        format!("Digest {}", fields.join(", "))
    }
}

/// Builds a Basic `Authorization` header value.
pub fn basic_auth(username: &str, password: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username, password));
    format!("Basic {}", encoded)
}

/// Splits `key=value, key="quoted value"` pairs. Keys are lowercased.
fn parse_params(content: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut chars = content.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}

        let key: String = chars
            .by_ref()
            .take_while(|c| *c != '=')
            .collect::<String>()
            .trim()
            .to_lowercase();
        if key.is_empty() {
            break;
        }

        let value = if chars.next_if_eq(&'"').is_some() {
            let mut value = String::new();
            let mut escaped = false;
            for c in chars.by_ref() {
                match c {
                    _ if escaped => {
                        value.push(c);
                        escaped = false;
                    }
                    '\\' => escaped = true,
                    '"' => break,
                    _ => value.push(c),
                }
            }
            value
        } else {
            chars
                .by_ref()
                .take_while(|c| *c != ',' && !c.is_whitespace())
                .collect()
        };

        params.insert(key, value);
    }

    params
}

fn client_nonce() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_challenge() {
        let challenge = DigestChallenge::parse(
            r#"Digest realm="dav@example.com", nonce="n0nce", qop="auth,auth-int", opaque="op", algorithm=MD5"#,
        )
        .unwrap();

        assert_eq!(challenge.realm, "dav@example.com");
        assert_eq!(challenge.nonce, "n0nce");
        assert_eq!(challenge.opaque.as_deref(), Some("op"));
        assert_eq!(challenge.qop.as_deref(), Some("auth,auth-int"));
        assert_eq!(challenge.algorithm, "MD5");
        assert!(challenge.offers_auth_qop());
    }

    #[test]
    fn minimal_challenge_defaults_to_md5() {
        let challenge = DigestChallenge::parse(r#"Digest realm="r", nonce="n""#).unwrap();
        assert!(challenge.qop.is_none());
        assert_eq!(challenge.algorithm, "MD5");
    }

    #[test]
    fn rejects_other_schemes_and_incomplete_challenges() {
        assert!(DigestChallenge::parse(r#"Basic realm="r""#).is_none());
        assert!(DigestChallenge::parse(r#"Digest realm="r""#).is_none());
    }

    #[test]
    fn escaped_quotes_in_values() {
        let challenge =
            DigestChallenge::parse(r#"Digest realm="say \"hi\"", nonce="n""#).unwrap();
        assert_eq!(challenge.realm, r#"say "hi""#);
    }

    #[test]
    fn response_with_qop_counts_nonces() {
        let mut challenge =
            DigestChallenge::parse(r#"Digest realm="r", nonce="n", qop="auth""#).unwrap();

        let first = challenge.respond("REPORT", "/cal/", "alice", "secret");
        assert!(first.starts_with("Digest "));
        assert!(first.contains(r#"username="alice""#));
        assert!(first.contains(r#"uri="/cal/""#));
        assert!(first.contains("qop=auth"));
        assert!(first.contains("nc=00000001"));

        let second = challenge.respond("REPORT", "/cal/", "alice", "secret");
        assert!(second.contains("nc=00000002"));
    }

    #[test]
    fn response_without_qop_is_rfc2069() {
        let mut challenge = DigestChallenge::parse(r#"Digest realm="r", nonce="n""#).unwrap();
        let header = challenge.respond("GET", "/feed.ics", "alice", "secret");

        // MD5(MD5("alice:r:secret"):n:MD5("GET:/feed.ics"))
        let ha1 = md5_hex("alice:r:secret");
        let ha2 = md5_hex("GET:/feed.ics");
        let expected = md5_hex(&format!("{}:n:{}", ha1, ha2));
        assert!(header.contains(&format!(r#"response="{}""#, expected)));
        assert!(!header.contains("cnonce"));
    }

    #[test]
    fn basic_header() {
        assert_eq!(basic_auth("user", "password"), "Basic dXNlcjpwYXNzd29yZA==");
    }

    #[test]
    fn md5_of_known_input() {
        assert_eq!(md5_hex("hello"), "5d41402abc4b2a76b9719d911017c592");
    }
}
