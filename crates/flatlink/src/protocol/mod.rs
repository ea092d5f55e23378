// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! FlatLink wire protocol: typed message shapes and the codec over them.

pub mod codec;
pub mod types;

pub use codec::{
    command_header_bytes, decode_json_command, decode_request, discover_header_bytes,
    encode_announcement, encode_command, DecodeError, Request,
};
pub use types::{
    ArgSpec, ArgType, ArgValue, Command, CommandDescription, CommandHeader, DiscoverHeader,
    ServiceAnnouncement, ServiceDescription, WireProtocol,
};
