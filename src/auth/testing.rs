//! RSA fixtures and token minting shared by unit tests.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

pub const RSA_PRIVATE_PEM: &str = include_str!("../../tests/fixtures/jwt_rsa.pem");
pub const RSA_N: &str = "nXO5y-GhKxk9rra_vZ0jf_fSdpP3ksweOwJoRzqoNORn4Vw0p2VDESefBtKRUgL9xvBTqhIdrCNEwXvVLGnZu_xo8yN076Xi8FEhBtyAFLHAtnvSneCa3GqqI1dcQPZbyzR_IwCZgzA7Xr8yegyyO3HmOL_qkLPerUjqdnIqjHvcaf2zz45c78wnIcXcXC-GiAw_wWREjPRtPILY0hAeeYg6jPwwvKEEVoAkfO7EpexHXkDG4YqbmE973PD5HrozoBEqRckMVTWRJD_sT8vLRDKf35RVMOkcbDAnDKi9GUm8xeQQEO1ceM6XciITVcsJ3nrteXE8RxSwWo0DhqxEGQ";
pub const RSA_E: &str = "AQAB";

pub const ISSUER: &str = "https://auth.test";
pub const AUDIENCE: &str = "gateway-test";

pub fn jwks_body() -> Value {
    json!({
        "keys": [{
            "kty": "RSA",
            "kid": "test-key",
            "use": "sig",
            "alg": "RS256",
            "n": RSA_N,
            "e": RSA_E,
        }]
    })
}

/// Standard claims for `sub`, valid for five minutes.
pub fn claims_for(sub: &str) -> Value {
    let now = chrono::Utc::now().timestamp();
    json!({
        "sub": sub,
        "iss": ISSUER,
        "aud": AUDIENCE,
        "iat": now,
        "exp": now + 300,
        "email": format!("{sub}@example.com"),
        "roles": ["user"],
        "email_verified": true,
    })
}

pub fn mint(claims: &Value) -> String {
    let key = EncodingKey::from_rsa_pem(RSA_PRIVATE_PEM.as_bytes()).unwrap();
    encode(&Header::new(Algorithm::RS256), claims, &key).unwrap()
}
