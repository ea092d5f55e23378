// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use flatlink::protocol::decode_request;
use flatlink::Frame;
use libfuzzer_sys::fuzz_target;

// Carve the input into topic / header / payload frames and decode. Every
// outcome must be a value, never a panic.
fuzz_target!(|data: &[u8]| {
    let Some((&topic_len, rest)) = data.split_first() else { return };
    let topic_len = usize::from(topic_len).min(rest.len());
    let (topic, rest) = rest.split_at(topic_len);

    let frames: Vec<Frame> = match rest.split_first() {
        Some((&header_len, tail)) => {
            let header_len = usize::from(header_len).min(tail.len());
            let (header, payload) = tail.split_at(header_len);
            vec![Frame::part(header), Frame::last(payload)]
        }
        None => Vec::new(),
    };

    let _ = decode_request("fuzzsvc", topic, &frames);
    let _ = decode_request("d", topic, &frames);
});
