#![no_main]

//! Fuzz target for header parsing.
//!
//! Parses arbitrary bytes as sent by either side. Whatever parses must
//! write back to the same bytes, unless it is a version negotiation packet,
//! which can't be written.

use libfuzzer_sys::fuzz_target;

use quicgate::{Buf, Header, Perspective};

fuzz_target!(|data: &[u8]| {
    for sent_by in [Perspective::Client, Perspective::Server] {
        let Ok((_, hdr)) = Header::parse(data, sent_by) else {
            continue;
        };

        // Rendering must never panic.
        let _ = hdr.to_string();

        if hdr.is_version_negotiation {
            continue;
        }

        let mut out = Buf::new();
        if hdr.write(&mut out, sent_by).is_ok() {
            assert_eq!(Ok(out.len()), hdr.encoded_len(sent_by).map_err(|_| ()));
        }
    }
});
