// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connection greeting and ZAP verdict exchange.
//!
//! The connecting side speaks first: a single CBOR frame carrying its
//! mechanism, domain, routing identity, and credentials or public key.
//! The accepting side submits the peer to its authenticator (when its
//! security level requires it) and answers with the verdict; a non-`"200"`
//! status is followed by the stream closing. Ironhouse replies also carry
//! the server's public key so the client can verify the binder.

use serde::{Deserialize, Serialize};

use crate::authentication::{
    AuthenticationRequest, AuthenticatorHandle, Mechanism, SecurityLevel, UserNameAndPassword,
    ZapOptions, KEY_LENGTH,
};
use crate::error::{Error, Result};
use crate::messaging::transport::byte_stream::ByteStream;
use crate::messaging::transport::frame_codec::{read_parts, write_parts};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Greeting {
    pub mechanism: Mechanism,
    pub domain: String,
    pub routing_id: Vec<u8>,
    pub credentials: Option<UserNameAndPassword>,
    pub public_key: Option<[u8; KEY_LENGTH]>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct GreetingReply {
    pub status: String,
    pub text: String,
    pub user_id: String,
    pub server_public_key: Option<[u8; KEY_LENGTH]>,
}

/// Greets the binder and verifies its reply.
pub(crate) fn client_handshake(
    stream: &mut ByteStream,
    zap: &ZapOptions,
    routing_id: &[u8],
) -> Result<()> {
    let greeting = Greeting {
        mechanism: zap.mechanism(),
        domain: zap.domain().to_string(),
        routing_id: routing_id.to_vec(),
        credentials: zap.credentials().cloned(),
        public_key: zap.client_keys().map(|k| *k.public_key()),
    };
    let frame = serde_cbor::to_vec(&greeting)?;
    write_parts(stream, &[frame])?;

    let reply_parts = read_parts(stream)?;
    let reply: GreetingReply = serde_cbor::from_slice(&reply_parts[0])?;
    if reply.status != crate::authentication::OK_STATUS {
        return Err(Error::AuthenticationDenied(format!(
            "{}: {}",
            reply.status, reply.text
        )));
    }
    if zap.security_level() == SecurityLevel::Ironhouse {
        let expected = zap
            .server_key()
            .map(|k| *k.public_key())
            .ok_or_else(|| Error::AuthenticationDenied("server key not configured".into()))?;
        if reply.server_public_key != Some(expected) {
            return Err(Error::AuthenticationDenied("server key mismatch".into()));
        }
    }
    Ok(())
}

/// Reads a peer's greeting, consults the authenticator, and replies.
///
/// Returns the accepted greeting. A denied peer receives the verdict
/// before the error is returned; the caller closes the stream.
pub(crate) fn server_handshake(
    stream: &mut ByteStream,
    zap: &ZapOptions,
    authenticator: Option<&AuthenticatorHandle>,
) -> Result<Greeting> {
    let greeting_parts = read_parts(stream)?;
    let greeting: Greeting = serde_cbor::from_slice(&greeting_parts[0])?;

    let verdict = match (zap.security_level(), authenticator) {
        (SecurityLevel::Grasslands, _) | (_, None) => None,
        (level, Some(handle)) => Some(handle.authenticate(AuthenticationRequest {
            domain: zap.domain().to_string(),
            address: stream.peer_address(),
            mechanism: greeting.mechanism,
            security_level: level,
            credentials: greeting.credentials.clone(),
            public_key: greeting.public_key,
        })?),
    };

    let server_public_key = match zap.security_level() {
        SecurityLevel::Stonehouse | SecurityLevel::Ironhouse => {
            zap.server_key().map(|k| *k.public_key())
        }
        _ => None,
    };

    let (status, text, user_id) = match &verdict {
        None => (
            crate::authentication::OK_STATUS.to_string(),
            "OK".to_string(),
            String::new(),
        ),
        Some(v) => (v.status.clone(), v.text.clone(), v.user_id.clone()),
    };
    let accepted = status == crate::authentication::OK_STATUS;

    let reply = GreetingReply {
        status: status.clone(),
        text: text.clone(),
        user_id,
        server_public_key,
    };
    write_parts(stream, &[serde_cbor::to_vec(&reply)?])?;

    if !accepted {
        return Err(Error::AuthenticationDenied(format!("{}: {}", status, text)));
    }
    Ok(greeting)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_round_trips_through_cbor() {
        let greeting = Greeting {
            mechanism: Mechanism::Plain,
            domain: "global".to_string(),
            routing_id: b"req-1".to_vec(),
            credentials: Some(UserNameAndPassword::new("operator", "magma").unwrap()),
            public_key: None,
        };
        let bytes = serde_cbor::to_vec(&greeting).expect("encode");
        let decoded: Greeting = serde_cbor::from_slice(&bytes).expect("decode");
        assert_eq!(decoded.domain, "global");
        assert_eq!(decoded.routing_id, b"req-1");
        assert_eq!(decoded.credentials.unwrap().user_name(), "operator");
    }
}
