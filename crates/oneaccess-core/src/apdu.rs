//! Frame codec for the reader protocol.
//!
//! | Command   | Bytes                                   |
//! |-----------|-----------------------------------------|
//! | SELECT    | `00 A4 04 00 <Lc> <AID> [00]`           |
//! | GET_TOKEN | `00 CA P1 P2 <Lc> <ASCII "gate|nonce">` |
//!
//! Responses carry one of exactly two status words: `90 00` after the
//! payload on success, or a bare `69 85` when failing closed.

/// Success status word.
pub const SW_OK: [u8; 2] = [0x90, 0x00];

/// Fail-closed status word (conditions of use not satisfied).
pub const SW_CONDITIONS_NOT_SATISFIED: [u8; 2] = [0x69, 0x85];

const SELECT_BY_NAME: [u8; 4] = [0x00, 0xA4, 0x04, 0x00];
const CLA_ISO: u8 = 0x00;
const INS_GET_TOKEN: u8 = 0xCA;
const HEADER_LEN: usize = 4;
const LC_OFFSET: usize = 4;
const FIELD_SEPARATOR: char = '|';

/// A classified reader command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// SELECT by DF name.
    Select,
    /// Proprietary token request carrying `gateId|readerNonce`.
    GetToken { gate_id: String, reader_nonce: String },
    /// Anything else, including every malformed frame.
    Unknown,
}

/// Classify raw command bytes.
///
/// Never fails: frames that are too short, overrun their declared `Lc`,
/// carry non-ASCII data, or lack exactly two non-empty fields are all
/// [`Command::Unknown`].
pub fn parse_command(raw: &[u8]) -> Command {
    let Some(header) = raw.get(..HEADER_LEN) else {
        return Command::Unknown;
    };

    if header == SELECT_BY_NAME {
        return Command::Select;
    }

    if header[0] == CLA_ISO && header[1] == INS_GET_TOKEN {
        return parse_get_token(raw).unwrap_or(Command::Unknown);
    }

    Command::Unknown
}

fn parse_get_token(raw: &[u8]) -> Option<Command> {
    let data = lc_data(raw)?;
    if !data.is_ascii() {
        return None;
    }
    let text = std::str::from_utf8(data).ok()?;

    let (gate_id, reader_nonce) = text.split_once(FIELD_SEPARATOR)?;
    if reader_nonce.contains(FIELD_SEPARATOR) {
        return None;
    }
    let (gate_id, reader_nonce) = (gate_id.trim(), reader_nonce.trim());
    if gate_id.is_empty() || reader_nonce.is_empty() {
        return None;
    }

    Some(Command::GetToken {
        gate_id: gate_id.to_owned(),
        reader_nonce: reader_nonce.to_owned(),
    })
}

/// The `Lc` bytes following the header, if the frame holds all of them.
fn lc_data(raw: &[u8]) -> Option<&[u8]> {
    let lc = usize::from(*raw.get(LC_OFFSET)?);
    let start = LC_OFFSET + 1;
    raw.get(start..start + lc)
}

/// A response ready to be sent back to the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    status_ok: bool,
    payload: Vec<u8>,
}

impl ResponseFrame {
    /// Success with a payload (may be empty).
    pub fn ok(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            status_ok: true,
            payload: payload.into(),
        }
    }

    /// Fail-closed. Carries no payload.
    pub fn fail_closed() -> Self {
        Self {
            status_ok: false,
            payload: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status_ok
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Wire bytes for this frame.
    pub fn encode(&self) -> Vec<u8> {
        encode_response(self.status_ok, &self.payload)
    }
}

/// Encode a response: `payload ++ 90 00` on success, exactly `69 85` otherwise.
///
/// The payload of a failed response is dropped so nothing partial leaks.
pub fn encode_response(ok: bool, payload: &[u8]) -> Vec<u8> {
    if !ok {
        return SW_CONDITIONS_NOT_SATISFIED.to_vec();
    }
    let mut out = Vec::with_capacity(payload.len() + SW_OK.len());
    out.extend_from_slice(payload);
    out.extend_from_slice(&SW_OK);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_token_frame(payload: &[u8]) -> Vec<u8> {
        let lc = u8::try_from(payload.len()).unwrap_or(u8::MAX);
        let mut frame = vec![0x00, 0xCA, 0x00, 0x00, lc];
        frame.extend_from_slice(payload);
        frame
    }

    #[test]
    fn short_frames_are_unknown() {
        let frames: [&[u8]; 4] = [&[], &[0x00], &[0x00, 0xA4], &[0x00, 0xA4, 0x04]];
        for raw in frames {
            assert_eq!(parse_command(raw), Command::Unknown);
        }
    }

    #[test]
    fn select_by_name() {
        assert_eq!(parse_command(&[0x00, 0xA4, 0x04, 0x00, 0x00]), Command::Select);
        // Bare header, AID and trailing Le are all accepted.
        assert_eq!(parse_command(&[0x00, 0xA4, 0x04, 0x00]), Command::Select);
        assert_eq!(
            parse_command(&[0x00, 0xA4, 0x04, 0x00, 0x07, 0xF0, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x00]),
            Command::Select
        );
    }

    #[test]
    fn select_by_other_p1_is_unknown() {
        assert_eq!(parse_command(&[0x00, 0xA4, 0x00, 0x0C, 0x00]), Command::Unknown);
    }

    #[test]
    fn get_token_reference_frame() {
        let frame = get_token_frame(b"MAIN_GATE|0123456789ABCDEF");
        assert_eq!(frame[4], 27);
        assert_eq!(
            parse_command(&frame),
            Command::GetToken {
                gate_id: "MAIN_GATE".into(),
                reader_nonce: "0123456789ABCDEF".into(),
            }
        );
    }

    #[test]
    fn get_token_fields_are_trimmed() {
        let frame = get_token_frame(b"  BLD_ACME | ABCDEF0123456789 ");
        assert_eq!(
            parse_command(&frame),
            Command::GetToken {
                gate_id: "BLD_ACME".into(),
                reader_nonce: "ABCDEF0123456789".into(),
            }
        );
    }

    #[test]
    fn get_token_ignores_bytes_past_lc() {
        let mut frame = get_token_frame(b"G|N");
        frame.push(0x00);
        assert_eq!(
            parse_command(&frame),
            Command::GetToken {
                gate_id: "G".into(),
                reader_nonce: "N".into(),
            }
        );
    }

    #[test]
    fn get_token_lc_overrun_is_unknown() {
        let mut frame = get_token_frame(b"MAIN_GATE|0123456789ABCDEF");
        frame[4] = 40;
        assert_eq!(parse_command(&frame), Command::Unknown);
    }

    #[test]
    fn get_token_without_lc_is_unknown() {
        assert_eq!(parse_command(&[0x00, 0xCA, 0x00, 0x00]), Command::Unknown);
    }

    #[test]
    fn get_token_bad_fields_are_unknown() {
        let payloads: [&[u8]; 6] = [
            b"MAIN_GATE0123456789ABCDEF",
            b"|0123456789ABCDEF",
            b"MAIN_GATE|",
            b"   |  ",
            b"A|B|C",
            b"",
        ];
        for payload in payloads {
            assert_eq!(
                parse_command(&get_token_frame(payload)),
                Command::Unknown,
                "payload {payload:?}"
            );
        }
    }

    #[test]
    fn get_token_non_ascii_is_unknown() {
        let frame = get_token_frame("GATE_\u{e9}|0123".as_bytes());
        assert_eq!(parse_command(&frame), Command::Unknown);
    }

    #[test]
    fn wrong_class_is_unknown() {
        let mut frame = get_token_frame(b"MAIN_GATE|0123456789ABCDEF");
        frame[0] = 0x80;
        assert_eq!(parse_command(&frame), Command::Unknown);
    }

    #[test]
    fn encode_success_appends_status_word() {
        assert_eq!(encode_response(true, &[]), vec![0x90, 0x00]);
        assert_eq!(encode_response(true, b"tok"), vec![b't', b'o', b'k', 0x90, 0x00]);
    }

    #[test]
    fn encode_failure_drops_payload() {
        assert_eq!(encode_response(false, &[]), vec![0x69, 0x85]);
        assert_eq!(encode_response(false, b"partial"), vec![0x69, 0x85]);
    }

    #[test]
    fn response_frame_encodes_through_codec() {
        assert_eq!(ResponseFrame::ok(b"abc".to_vec()).encode(), b"abc\x90\x00".to_vec());
        assert_eq!(ResponseFrame::fail_closed().encode(), SW_CONDITIONS_NOT_SATISFIED.to_vec());
    }
}
