//! Signed check-in tokens.
//!
//! A token is `base64url(payload) "." base64url(mac)` where `payload` is the
//! JSON serialization of the claim and `mac` is HMAC-SHA256 of those exact bytes
//! under the process signing secret. Tokens carry no expiry and are not tracked
//! server-side: holding a validly signed token is the whole capability, until
//! the secret is rotated.
//!
//! # Example
//!
//! ```
//! use rollcall_core::token::{CheckInClaim, TokenCodec};
//! use rollcall_core::EventId;
//!
//! # fn main() -> rollcall_core::Result<()> {
//! let codec = TokenCodec::new("a-long-enough-signing-secret")?;
//! let claim = CheckInClaim::event(EventId::new(42), 1_700_000_000_000);
//!
//! let token = codec.issue(&claim)?;
//! let redeemed: CheckInClaim = codec.redeem(&token)?;
//! assert_eq!(redeemed, claim);
//! # Ok(())
//! # }
//! ```

use crate::config::TokenConfig;
use crate::error::{Result, RollcallError};
use crate::types::{EventId, UserId};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// Shortest secret accepted by [`TokenCodec::new`].
pub const MIN_SECRET_LEN: usize = 16;

const SEGMENT_SEPARATOR: char = '.';

/// Claims carried by check-in tokens.
///
/// The `type` tag tells the scanner which participant to check in; the codec
/// itself never looks at it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CheckInClaim {
    /// Displayed by staff at the venue; whoever scans it checks themself in.
    #[serde(rename = "event_checkin", rename_all = "camelCase")]
    Event {
        /// Event ID
        event_id: EventId,
        /// Issuance time, milliseconds since the Unix epoch
        generated_at: i64,
    },

    /// Held by one participant and scanned by staff on their behalf.
    #[serde(rename = "participant_checkin", rename_all = "camelCase")]
    Personal {
        /// Event ID
        event_id: EventId,
        /// Participant the token is bound to
        user_id: UserId,
        /// Issuance time, milliseconds since the Unix epoch
        generated_at: i64,
    },
}

impl CheckInClaim {
    /// Event-scoped claim.
    #[must_use]
    pub const fn event(event_id: EventId, generated_at: i64) -> Self {
        Self::Event {
            event_id,
            generated_at,
        }
    }

    /// Claim bound to one participant.
    #[must_use]
    pub const fn personal(event_id: EventId, user_id: UserId, generated_at: i64) -> Self {
        Self::Personal {
            event_id,
            user_id,
            generated_at,
        }
    }

    /// Event the claim is for.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        match self {
            Self::Event { event_id, .. } | Self::Personal { event_id, .. } => *event_id,
        }
    }

    /// Embedded participant, if the claim is personal.
    #[must_use]
    pub const fn bound_user(&self) -> Option<UserId> {
        match self {
            Self::Event { .. } => None,
            Self::Personal { user_id, .. } => Some(*user_id),
        }
    }

    /// The `type` tag as it appears on the wire.
    #[must_use]
    pub const fn type_tag(&self) -> &'static str {
        match self {
            Self::Event { .. } => "event_checkin",
            Self::Personal { .. } => "participant_checkin",
        }
    }
}

/// Stateless HMAC signer/verifier for opaque tokens.
///
/// Cheap to clone; the key is shared.
#[derive(Clone)]
pub struct TokenCodec {
    key: Arc<[u8]>,
}

impl TokenCodec {
    /// Create a codec for the given secret.
    ///
    /// # Errors
    ///
    /// Returns [`RollcallError::InvalidInput`] if the secret is shorter than
    /// [`MIN_SECRET_LEN`] bytes.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.len() < MIN_SECRET_LEN {
            return Err(RollcallError::InvalidInput(format!(
                "token secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        Ok(Self {
            key: Arc::from(secret),
        })
    }

    /// Create a codec from loaded configuration.
    ///
    /// # Errors
    ///
    /// Same as [`TokenCodec::new`].
    pub fn from_config(config: &TokenConfig) -> Result<Self> {
        Self::new(config.secret.as_bytes())
    }

    /// Sign `payload` and wrap it into a token.
    ///
    /// # Errors
    ///
    /// Returns [`RollcallError::Internal`] if the payload cannot be serialized.
    pub fn issue<T: Serialize>(&self, payload: &T) -> Result<String> {
        let data = serde_json::to_vec(payload)
            .map_err(|e| RollcallError::internal("Failed to serialize token payload", e))?;
        let mac = self.sign(&data)?;

        Ok(format!(
            "{}{SEGMENT_SEPARATOR}{}",
            URL_SAFE_NO_PAD.encode(&data),
            URL_SAFE_NO_PAD.encode(mac)
        ))
    }

    /// Verify a token and return its payload.
    ///
    /// # Errors
    ///
    /// - [`RollcallError::MalformedToken`] if the separator is missing, the
    ///   payload segment does not decode, or the authenticated payload is not a `T`
    /// - [`RollcallError::InvalidSignature`] if the signature segment does not
    ///   decode or does not match
    pub fn redeem<T: DeserializeOwned>(&self, token: &str) -> Result<T> {
        let (data_segment, mac_segment) = token
            .trim()
            .split_once(SEGMENT_SEPARATOR)
            .ok_or_else(|| RollcallError::MalformedToken("missing signature segment".to_string()))?;

        let data = URL_SAFE_NO_PAD
            .decode(data_segment)
            .map_err(|e| RollcallError::MalformedToken(format!("payload segment: {e}")))?;
        // Past this point the payload is well-formed; anything wrong with the
        // signature segment is a signature failure.
        let Ok(mac) = URL_SAFE_NO_PAD.decode(mac_segment) else {
            return Err(RollcallError::InvalidSignature);
        };

        let expected = self.sign(&data)?;
        if !constant_time_eq::constant_time_eq(&expected, &mac) {
            return Err(RollcallError::InvalidSignature);
        }

        serde_json::from_slice(&data)
            .map_err(|e| RollcallError::MalformedToken(format!("payload: {e}")))
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.key)
            .map_err(|e| RollcallError::internal("Failed to key HMAC", e))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-signing-secret";

    fn codec() -> TokenCodec {
        match TokenCodec::new(SECRET) {
            Ok(codec) => codec,
            Err(e) => unreachable!("test secret is long enough: {e}"),
        }
    }

    #[test]
    fn test_round_trip_event_claim() {
        let codec = codec();
        let claim = CheckInClaim::event(EventId::new(3), 1_700_000_000_123);

        let token = codec.issue(&claim).unwrap_or_default();
        assert_eq!(codec.redeem::<CheckInClaim>(&token), Ok(claim));
    }

    #[test]
    fn test_wire_payload_uses_type_tag_and_camel_case() {
        let claim = CheckInClaim::personal(EventId::new(5), UserId::new(9), 10);
        let json = serde_json::to_value(&claim).unwrap_or_default();

        assert_eq!(
            json,
            serde_json::json!({
                "type": "participant_checkin",
                "eventId": 5,
                "userId": 9,
                "generatedAt": 10
            })
        );
        assert_eq!(claim.type_tag(), "participant_checkin");
        assert_eq!(claim.bound_user(), Some(UserId::new(9)));
    }

    #[test]
    fn test_token_is_url_safe() {
        let token = codec()
            .issue(&CheckInClaim::event(EventId::new(i64::MAX), i64::MAX))
            .unwrap_or_default();

        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        );
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(matches!(
            TokenCodec::new("short"),
            Err(RollcallError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_other_secret_fails_signature() {
        let token = codec()
            .issue(&CheckInClaim::event(EventId::new(1), 0))
            .unwrap_or_default();
        let rotated = TokenCodec::new("a-rotated-signing-secret").unwrap_or_else(|_| codec());

        assert_eq!(
            rotated.redeem::<CheckInClaim>(&token),
            Err(RollcallError::InvalidSignature)
        );
    }

    #[test]
    fn test_missing_separator_is_malformed() {
        let result = codec().redeem::<CheckInClaim>("bm90LWEtdG9rZW4");
        assert!(matches!(result, Err(RollcallError::MalformedToken(_))));
    }

    #[test]
    fn test_garbage_payload_is_malformed() {
        let result = codec().redeem::<CheckInClaim>("%%%.###");
        assert!(matches!(result, Err(RollcallError::MalformedToken(_))));
    }

    #[test]
    fn test_any_edit_of_last_signature_char_fails_signature() {
        const ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
        let token = codec()
            .issue(&CheckInClaim::event(EventId::new(1), 0))
            .unwrap_or_default();
        let (head, last) = token.split_at(token.len() - 1);

        for replacement in ALPHABET.chars().filter(|c| !last.starts_with(*c)) {
            let tampered = format!("{head}{replacement}");
            assert_eq!(
                codec().redeem::<CheckInClaim>(&tampered),
                Err(RollcallError::InvalidSignature),
                "replacement {replacement}"
            );
        }
    }

    #[test]
    fn test_undecodable_signature_fails_signature() {
        let token = codec()
            .issue(&CheckInClaim::event(EventId::new(1), 0))
            .unwrap_or_default();
        let payload = token.split_once('.').map(|(p, _)| p).unwrap_or_default();

        assert_eq!(
            codec().redeem::<CheckInClaim>(&format!("{payload}.***")),
            Err(RollcallError::InvalidSignature)
        );
    }

    #[test]
    fn test_signed_but_unexpected_payload_is_malformed() {
        let codec = codec();
        let token = codec
            .issue(&serde_json::json!({ "type": "coupon", "eventId": 1 }))
            .unwrap_or_default();

        assert!(matches!(
            codec.redeem::<CheckInClaim>(&token),
            Err(RollcallError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_swapped_payload_fails_signature() {
        let codec = codec();
        let original = codec
            .issue(&CheckInClaim::personal(EventId::new(1), UserId::new(2), 0))
            .unwrap_or_default();
        let forged_payload = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&CheckInClaim::personal(EventId::new(1), UserId::new(3), 0))
                .unwrap_or_default(),
        );
        let signature = original.split_once('.').map(|(_, sig)| sig).unwrap_or_default();

        assert_eq!(
            codec.redeem::<CheckInClaim>(&format!("{forged_payload}.{signature}")),
            Err(RollcallError::InvalidSignature)
        );
    }
}
