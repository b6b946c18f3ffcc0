//! Tests for the wire protocol
//!
//! These tests verify:
//! - Command encoding for every command family
//! - CRLF frame reassembly across arbitrary chunk boundaries
//! - Response parsing per family, including multi-line retrieves
//! - Fatal protocol errors on unparseable lines

use memcluster::protocol::{
    encode_command, Command, CommandFamily, CommandType, FrameReader, LineParser,
};
use memcluster::{MemclusterError, ResponseData, ResponseStatus, ResponseType};

// =============================================================================
// Helper Functions
// =============================================================================

/// Feed whole CRLF-stripped lines to a parser, asserting it completes on
/// exactly the last one
fn parse_lines(parser: &mut LineParser, lines: &[&[u8]]) {
    for (i, line) in lines.iter().enumerate() {
        let done = parser.feed(line).unwrap();
        assert_eq!(done, i == lines.len() - 1, "line {i}");
    }
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_set() {
    let command = Command::new(
        CommandType::Set,
        "somekey",
        Some(b"blue".to_vec()),
        Some(300),
    );
    assert_eq!(encode_command(&command), b"set somekey 0 300 4\r\nblue\r\n");
}

#[test]
fn test_encode_add_and_replace() {
    let add = Command::new(CommandType::Add, "k", Some(b"v".to_vec()), Some(0));
    assert_eq!(encode_command(&add), b"add k 0 0 1\r\nv\r\n");

    let replace = Command::new(CommandType::Replace, "k", Some(b"vv".to_vec()), Some(60));
    assert_eq!(encode_command(&replace), b"replace k 0 60 2\r\nvv\r\n");
}

#[test]
fn test_encode_append_without_expiry() {
    let command = Command::new(CommandType::Append, "k", Some(b"tail".to_vec()), None);
    assert_eq!(encode_command(&command), b"append k 0 4\r\ntail\r\n");
}

#[test]
fn test_encode_storage_value_is_binary_safe() {
    // A value containing CRLF still encodes with the correct length prefix
    let command = Command::new(
        CommandType::Set,
        "k",
        Some(b"a\r\nb".to_vec()),
        Some(0),
    );
    assert_eq!(encode_command(&command), b"set k 0 0 4\r\na\r\nb\r\n");
}

#[test]
fn test_encode_get() {
    let command = Command::new(CommandType::Get, "somekey", None, None);
    assert_eq!(encode_command(&command), b"get somekey\r\n");
}

#[test]
fn test_encode_delete() {
    let command = Command::new(CommandType::Delete, "somekey", None, None);
    assert_eq!(encode_command(&command), b"delete somekey\r\n");
}

#[test]
fn test_encode_touch() {
    let command = Command::new(CommandType::Touch, "somekey", None, Some(300));
    assert_eq!(encode_command(&command), b"touch somekey 300\r\n");
}

#[test]
fn test_encode_incr_decr_delta_as_text() {
    let incr = Command::new(CommandType::Incr, "counter", Some(b"5".to_vec()), None);
    assert_eq!(encode_command(&incr), b"incr counter 5\r\n");

    let decr = Command::new(CommandType::Decr, "counter", Some(b"12".to_vec()), None);
    assert_eq!(encode_command(&decr), b"decr counter 12\r\n");
}

#[test]
fn test_command_families() {
    assert_eq!(CommandType::Set.family(), CommandFamily::Store);
    assert_eq!(CommandType::Prepend.family(), CommandFamily::Store);
    assert_eq!(CommandType::Get.family(), CommandFamily::Retrieve);
    assert_eq!(CommandType::Delete.family(), CommandFamily::Delete);
    assert_eq!(CommandType::Touch.family(), CommandFamily::Touch);
    assert_eq!(CommandType::Incr.family(), CommandFamily::Modify);
}

// =============================================================================
// Frame Reassembly Tests
// =============================================================================

#[test]
fn test_frame_single_complete_line() {
    let mut frame = FrameReader::new();
    let mut lines: Vec<Vec<u8>> = Vec::new();
    frame
        .feed(b"STORED\r\n", |line| {
            lines.push(line.to_vec());
            Ok(())
        })
        .unwrap();
    assert_eq!(lines, vec![b"STORED".to_vec()]);
    assert_eq!(frame.pending_len(), 0);
}

#[test]
fn test_frame_multiple_lines_in_one_chunk() {
    let mut frame = FrameReader::new();
    let mut lines: Vec<Vec<u8>> = Vec::new();
    frame
        .feed(b"VALUE k 0 4\r\nblue\r\nEND\r\n", |line| {
            lines.push(line.to_vec());
            Ok(())
        })
        .unwrap();
    assert_eq!(
        lines,
        vec![b"VALUE k 0 4".to_vec(), b"blue".to_vec(), b"END".to_vec()]
    );
}

#[test]
fn test_frame_line_split_across_chunks() {
    let mut frame = FrameReader::new();
    let mut lines: Vec<Vec<u8>> = Vec::new();
    frame
        .feed(b"STO", |line| {
            lines.push(line.to_vec());
            Ok(())
        })
        .unwrap();
    assert!(lines.is_empty());
    frame
        .feed(b"RED\r\n", |line| {
            lines.push(line.to_vec());
            Ok(())
        })
        .unwrap();
    assert_eq!(lines, vec![b"STORED".to_vec()]);
}

#[test]
fn test_frame_terminator_split_between_cr_and_lf() {
    let mut frame = FrameReader::new();
    let mut lines: Vec<Vec<u8>> = Vec::new();
    frame
        .feed(b"END\r", |line| {
            lines.push(line.to_vec());
            Ok(())
        })
        .unwrap();
    assert!(lines.is_empty());
    frame
        .feed(b"\n", |line| {
            lines.push(line.to_vec());
            Ok(())
        })
        .unwrap();
    assert_eq!(lines, vec![b"END".to_vec()]);
}

#[test]
fn test_frame_bare_cr_and_lf_stay_in_line() {
    let mut frame = FrameReader::new();
    let mut lines: Vec<Vec<u8>> = Vec::new();
    frame
        .feed(b"a\rb\nc\r\n", |line| {
            lines.push(line.to_vec());
            Ok(())
        })
        .unwrap();
    assert_eq!(lines, vec![b"a\rb\nc".to_vec()]);
}

#[test]
fn test_frame_byte_at_a_time() {
    let mut frame = FrameReader::new();
    let mut lines: Vec<Vec<u8>> = Vec::new();
    for byte in b"VALUE k 0 2\r\nhi\r\nEND\r\n" {
        frame
            .feed(&[*byte], |line| {
                lines.push(line.to_vec());
                Ok(())
            })
            .unwrap();
    }
    assert_eq!(
        lines,
        vec![b"VALUE k 0 2".to_vec(), b"hi".to_vec(), b"END".to_vec()]
    );
}

#[test]
fn test_frame_sink_error_propagates() {
    let mut frame = FrameReader::new();
    let result = frame.feed(b"BOOM\r\n", |_| {
        Err(MemclusterError::Protocol("bad line".to_string()))
    });
    assert!(result.is_err());
}

// =============================================================================
// Token Parser Tests (store / delete / touch)
// =============================================================================

#[test]
fn test_store_parser_accepts_terminal_tokens() {
    for (line, token) in [
        (b"STORED".as_slice(), ResponseType::Stored),
        (b"NOT_STORED".as_slice(), ResponseType::NotStored),
        (b"EXISTS".as_slice(), ResponseType::Exists),
        (b"NOT_FOUND".as_slice(), ResponseType::NotFound),
    ] {
        let mut parser = LineParser::for_family(CommandFamily::Store);
        assert!(parser.feed(line).unwrap());
        let response = parser.take_response();
        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.data, ResponseData::Token(token));
    }
}

#[test]
fn test_delete_parser_rejects_store_tokens() {
    let mut parser = LineParser::for_family(CommandFamily::Delete);
    let result = parser.feed(b"STORED");
    assert!(matches!(result, Err(MemclusterError::Protocol(_))));
}

#[test]
fn test_touch_parser_accepts_touched() {
    let mut parser = LineParser::for_family(CommandFamily::Touch);
    assert!(parser.feed(b"TOUCHED").unwrap());
    let response = parser.take_response();
    assert_eq!(response.data, ResponseData::Token(ResponseType::Touched));
}

#[test]
fn test_token_parser_fatal_on_garbage() {
    let mut parser = LineParser::for_family(CommandFamily::Delete);
    let result = parser.feed(b"foo");
    match result {
        Err(MemclusterError::Protocol(message)) => {
            assert_eq!(message, "Unexpected format in response");
        }
        other => panic!("expected protocol error, got {other:?}"),
    }
}

#[test]
fn test_token_match_requires_whole_line() {
    // "STOREDX" must not match the STORED token
    let mut parser = LineParser::for_family(CommandFamily::Store);
    assert!(parser.feed(b"STOREDX").is_err());
}

// =============================================================================
// Base Error Tests
// =============================================================================

#[test]
fn test_error_line_terminates_any_family() {
    for family in [
        CommandFamily::Store,
        CommandFamily::Delete,
        CommandFamily::Touch,
        CommandFamily::Modify,
        CommandFamily::Retrieve,
    ] {
        let mut parser = LineParser::for_family(family);
        assert!(parser.feed(b"ERROR").unwrap(), "family {family:?}");
        let response = parser.take_response();
        assert_eq!(response.status, ResponseStatus::Error);
        assert_eq!(response.message.as_deref(), Some("ERROR"));
    }
}

#[test]
fn test_client_and_server_error_prefixes() {
    let mut parser = LineParser::for_family(CommandFamily::Store);
    assert!(parser.feed(b"CLIENT ERROR bad data chunk").unwrap());
    let response = parser.take_response();
    assert_eq!(response.status, ResponseStatus::Error);
    assert_eq!(
        response.message.as_deref(),
        Some("CLIENT ERROR bad data chunk")
    );

    let mut parser = LineParser::for_family(CommandFamily::Modify);
    assert!(parser.feed(b"SERVER ERROR out of memory").unwrap());
    let response = parser.take_response();
    assert_eq!(response.status, ResponseStatus::Error);
}

#[test]
fn test_error_token_requires_whole_line() {
    // "ERRORS" is not the exact ERROR token; for a store command it is a
    // fatal mismatch
    let mut parser = LineParser::for_family(CommandFamily::Store);
    assert!(parser.feed(b"ERRORS").is_err());
}

// =============================================================================
// Modify Parser Tests (incr / decr)
// =============================================================================

#[test]
fn test_modify_parser_new_counter_value() {
    let mut parser = LineParser::for_family(CommandFamily::Modify);
    assert!(parser.feed(b"6").unwrap());
    let response = parser.take_response();
    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.data, ResponseData::Counter(Some(6)));
}

#[test]
fn test_modify_parser_large_counter_value() {
    let mut parser = LineParser::for_family(CommandFamily::Modify);
    assert!(parser.feed(b"18446744073709551615").unwrap());
    let response = parser.take_response();
    assert_eq!(response.data, ResponseData::Counter(Some(u64::MAX)));
}

#[test]
fn test_modify_parser_not_found() {
    let mut parser = LineParser::for_family(CommandFamily::Modify);
    assert!(parser.feed(b"NOT_FOUND").unwrap());
    let response = parser.take_response();
    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.data, ResponseData::Counter(None));
}

#[test]
fn test_modify_parser_fatal_on_non_numeric() {
    let mut parser = LineParser::for_family(CommandFamily::Modify);
    assert!(parser.feed(b"six").is_err());
}

// =============================================================================
// Retrieve Parser Tests (get)
// =============================================================================

#[test]
fn test_retrieve_single_value() {
    let mut parser = LineParser::for_family(CommandFamily::Retrieve);
    parse_lines(&mut parser, &[b"VALUE somekey 0 4", b"blue", b"END"]);
    let response = parser.take_response();
    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.values().unwrap()["somekey"], "blue");
}

#[test]
fn test_retrieve_empty_result() {
    let mut parser = LineParser::for_family(CommandFamily::Retrieve);
    parse_lines(&mut parser, &[b"END"]);
    let response = parser.take_response();
    assert_eq!(response.status, ResponseStatus::Success);
    assert!(response.values().unwrap().is_empty());
}

#[test]
fn test_retrieve_multiple_values() {
    let mut parser = LineParser::for_family(CommandFamily::Retrieve);
    parse_lines(
        &mut parser,
        &[
            b"VALUE k1 0 3",
            b"one",
            b"VALUE k2 0 3",
            b"two",
            b"END",
        ],
    );
    let values = parser.take_response();
    let values = values.values().unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values["k1"], "one");
    assert_eq!(values["k2"], "two");
}

#[test]
fn test_retrieve_zero_length_value() {
    let mut parser = LineParser::for_family(CommandFamily::Retrieve);
    parse_lines(&mut parser, &[b"VALUE empty 0 0", b"END"]);
    let response = parser.take_response();
    assert_eq!(response.values().unwrap()["empty"], "");
}

#[test]
fn test_retrieve_header_with_cas_field() {
    // gets-style headers carry a fifth field; the parser only needs the
    // key and length positions
    let mut parser = LineParser::for_family(CommandFamily::Retrieve);
    parse_lines(&mut parser, &[b"VALUE k 0 2 42", b"hi", b"END"]);
    let response = parser.take_response();
    assert_eq!(response.values().unwrap()["k"], "hi");
}

#[test]
fn test_retrieve_end_completes_mid_body() {
    // END takes precedence over body collection even with bytes outstanding
    let mut parser = LineParser::for_family(CommandFamily::Retrieve);
    assert!(!parser.feed(b"VALUE k 0 10").unwrap());
    assert!(parser.feed(b"END").unwrap());
    let response = parser.take_response();
    assert_eq!(response.status, ResponseStatus::Success);
    assert!(response.values().unwrap().is_empty());
}

#[test]
fn test_retrieve_fatal_on_short_header() {
    let mut parser = LineParser::for_family(CommandFamily::Retrieve);
    assert!(parser.feed(b"VALUE k 0").is_err());
}

#[test]
fn test_retrieve_fatal_on_oversized_body() {
    let mut parser = LineParser::for_family(CommandFamily::Retrieve);
    assert!(!parser.feed(b"VALUE k 0 2").unwrap());
    match parser.feed(b"toolong") {
        Err(MemclusterError::Protocol(message)) => {
            assert_eq!(message, "Length of value exceeds expected response");
        }
        other => panic!("expected protocol error, got {other:?}"),
    }
}

#[test]
fn test_retrieve_fatal_on_unexpected_first_line() {
    let mut parser = LineParser::for_family(CommandFamily::Retrieve);
    assert!(parser.feed(b"STORED").is_err());
}

#[test]
fn test_retrieve_error_line_mid_response() {
    let mut parser = LineParser::for_family(CommandFamily::Retrieve);
    assert!(!parser.feed(b"VALUE k 0 3").unwrap());
    assert!(!parser.feed(b"abc").unwrap());
    assert!(parser.feed(b"SERVER ERROR backend failure").unwrap());
    let response = parser.take_response();
    assert_eq!(response.status, ResponseStatus::Error);
}

// =============================================================================
// End-to-End: frames into parsers
// =============================================================================

#[test]
fn test_retrieve_through_frame_reader_with_odd_chunks() {
    let wire = b"VALUE somekey 0 4\r\nblue\r\nEND\r\n";
    // Every possible split point of the wire bytes into two chunks
    for split in 0..wire.len() {
        let mut frame = FrameReader::new();
        let mut parser = LineParser::for_family(CommandFamily::Retrieve);
        let mut done = false;
        let mut sink = |line: &[u8]| {
            if parser.feed(line)? {
                done = true;
            }
            Ok(())
        };
        frame.feed(&wire[..split], &mut sink).unwrap();
        frame.feed(&wire[split..], &mut sink).unwrap();
        drop(sink);
        assert!(done, "split {split}");
        let response = parser.take_response();
        assert_eq!(response.values().unwrap()["somekey"], "blue");
    }
}

#[test]
fn test_pipelined_responses_share_one_frame_reader() {
    let wire = b"STORED\r\nVALUE k 0 2\r\nhi\r\nEND\r\nDELETED\r\n";
    let mut frame = FrameReader::new();
    let mut parsers = vec![
        LineParser::for_family(CommandFamily::Store),
        LineParser::for_family(CommandFamily::Retrieve),
        LineParser::for_family(CommandFamily::Delete),
    ];
    let mut completed = Vec::new();
    let mut idx = 0;
    frame
        .feed(wire, |line| {
            if parsers[idx].feed(line)? {
                completed.push(parsers[idx].take_response());
                idx += 1;
            }
            Ok(())
        })
        .unwrap();

    assert_eq!(completed.len(), 3);
    assert_eq!(completed[0].data, ResponseData::Token(ResponseType::Stored));
    assert_eq!(completed[1].values().unwrap()["k"], "hi");
    assert_eq!(
        completed[2].data,
        ResponseData::Token(ResponseType::Deleted)
    );
}
