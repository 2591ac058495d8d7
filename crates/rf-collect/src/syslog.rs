// Copyright 2025-Present rf-collect contributors
// SPDX-License-Identifier: Apache-2.0

//! Syslog frame decoding for rtl_433 datagrams.
//!
//! rtl_433 emits RFC 5424 lines shaped like
//! `<PRI>VERSION TIMESTAMP HOST APP PID MSGID SDATA PAYLOAD`. The payload is the
//! JSON object we care about; everything before it is discarded. Lines without a
//! leading `<` are treated as bare payloads.

use crate::constants::SYSLOG_FIELDS;

/// Extracts the payload from a raw datagram.
///
/// Unframed input is returned unchanged. Never fails: malformed framing yields
/// whatever the last whitespace separated field is and JSON decoding downstream
/// rejects it.
///
/// # Examples
///
/// ```
/// use rf_collect::syslog::decode;
///
/// let line = b"<30>1 2024-05-01T10:00:00Z host rtl_433 - - - {\"model\":\"X\"}";
/// assert_eq!(decode(line), "{\"model\":\"X\"}");
/// assert_eq!(decode(b"{\"id\":1}"), "{\"id\":1}");
/// ```
pub fn decode(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    if !text.starts_with('<') {
        return text.into_owned();
    }
    last_field(text.trim_end_matches(['\n', '\r', '\0'])).to_string()
}

// Equivalent of a whitespace split capped at SYSLOG_FIELDS fields: the final field
// keeps any inner whitespace.
fn last_field(text: &str) -> &str {
    let mut rest = text;
    for _ in 1..SYSLOG_FIELDS {
        let trimmed = rest.trim_start();
        match trimmed.find(char::is_whitespace) {
            Some(end) if !trimmed[end..].trim().is_empty() => rest = &trimmed[end..],
            _ => return trimmed.trim_end(),
        }
    }
    rest.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_full_header() {
        let line = "<30>1 2024-05-01T10:00:00.000000+02:00 altserv rtl_433 - - - {\"time\":\"2024-05-01 10:00:00\",\"model\":\"Acurite-Tower\",\"id\":8416,\"temperature_C\":21.5}";
        assert_eq!(
            decode(line.as_bytes()),
            "{\"time\":\"2024-05-01 10:00:00\",\"model\":\"Acurite-Tower\",\"id\":8416,\"temperature_C\":21.5}"
        );
    }

    #[test]
    fn test_decode_payload_keeps_inner_whitespace() {
        let line = "<30>1 ts host app pid mid - {\"time\" : \"2024-05-01 10:00:00\", \"id\" : 1}";
        assert_eq!(
            decode(line.as_bytes()),
            "{\"time\" : \"2024-05-01 10:00:00\", \"id\" : 1}"
        );
    }

    #[test]
    fn test_decode_short_header_takes_last_field() {
        assert_eq!(decode(b"<13>host payload"), "payload");
        assert_eq!(decode(b"<13>"), "<13>");
    }

    #[test]
    fn test_decode_without_header_is_passthrough() {
        assert_eq!(decode(b"not valid json"), "not valid json");
        assert_eq!(decode(b""), "");
    }

    #[test]
    fn test_decode_trims_line_terminator_only_when_framed() {
        assert_eq!(decode(b"{\"id\":1}\n"), "{\"id\":1}\n");
        assert_eq!(decode(b"{\"id\":1}\r\n\0"), "{\"id\":1}\r\n\0");
        assert_eq!(decode(b"<13>1 a b c d e - {\"id\":1}\r\n"), "{\"id\":1}");
    }

    #[test]
    fn test_decode_invalid_utf8_is_lossy() {
        let decoded = decode(&[0xff, b'{', b'}']);
        assert!(decoded.ends_with("{}"));
    }

    proptest! {
        #[test]
        fn framed_lines_yield_final_field(
            header in prop::collection::vec("[a-zA-Z0-9:.+-]{1,12}", 7),
            payload in "[a-zA-Z0-9{}\":,]{1,40}",
        ) {
            let line = format!("<30>{} {} {}", header[0], header[1..].join(" "), payload);
            prop_assert_eq!(decode(line.as_bytes()), payload);
        }

        #[test]
        fn unframed_decode_is_idempotent(text in "(?s)([^<].{0,80})?") {
            let once = decode(text.as_bytes());
            let twice = decode(once.as_bytes());
            prop_assert_eq!(&once, &text);
            prop_assert_eq!(once, twice);
        }
    }
}
