//! Error taxonomy surfaced on `Done.error_code`, and classification of the
//! underlying curl transport failures into that taxonomy.
//!
//! The numeric values are pinned bit-for-bit: callers on the bus rely on
//! them being stable across releases.

/// Terminal outcome of a single transfer, carried by `OutboundEvent::Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    /// Transfer completed and was atomically renamed into place.
    Ok = 0,
    /// Aborted by cancel, shutdown, or a superseding start.
    Interrupted = 1,
    /// Network-layer failure: DNS, connect, send/recv, timeout.
    NetIO = 2,
    /// Local filesystem failure: open, write, rename, local cert file unreadable.
    PhysicalMediaIO = 3,
    /// HTTP/transport protocol-level error: non-2xx, malformed response, too many redirects.
    Protocol = 4,
    /// TLS/identity failure, login denied.
    Authentication = 5,
    /// Library init failure, unclassified state, API misuse.
    Internal = 6,
}

impl ErrorCode {
    /// The raw numeric value as carried on the bus.
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::Ok => "ok",
            ErrorCode::Interrupted => "interrupted",
            ErrorCode::NetIO => "net-io",
            ErrorCode::PhysicalMediaIO => "physical-media-io",
            ErrorCode::Protocol => "protocol",
            ErrorCode::Authentication => "authentication",
            ErrorCode::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Classifies a curl transfer failure into the bus-visible taxonomy.
///
/// Mirrors `map_curl_error_to_list_error` from the original C worker
/// one-for-one: every `CURLE_*` arm in that switch has a matching `is_*`
/// predicate here, grouped into the same five non-Ok buckets. Anything not
/// recognized falls through to `Internal`, matching the C `default` arm.
pub fn classify_curl_error(e: &curl::Error) -> ErrorCode {
    if e.is_aborted_by_callback() {
        return ErrorCode::Interrupted;
    }

    if e.is_write_error()
        || e.is_read_error()
        || e.is_file_couldnt_read_file()
        || e.is_ssl_cacert_badfile()
        || e.is_ssl_crl_badfile()
    {
        return ErrorCode::PhysicalMediaIO;
    }

    if e.is_couldnt_resolve_proxy()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_connect()
        || e.is_operation_timedout()
        || e.is_send_error()
        || e.is_recv_error()
        || e.is_remote_disk_full()
        || e.is_remote_file_exists()
        || e.is_remote_file_not_found()
    {
        return ErrorCode::NetIO;
    }

    if e.is_unsupported_protocol()
        || e.is_url_malformat()
        || e.is_http_returned_error()
        || e.is_too_many_redirects()
        || e.is_bad_download_resume()
        || e.is_range_error()
        || e.is_http_post_error()
        || e.is_got_nothing()
    {
        return ErrorCode::Protocol;
    }

    if e.is_remote_access_denied()
        || e.is_ssl_connect_error()
        || e.is_peer_failed_verification()
        || e.is_ssl_certproblem()
        || e.is_ssl_cipher()
        || e.is_use_ssl_failed()
        || e.is_login_denied()
    {
        return ErrorCode::Authentication;
    }

    if e.is_failed_init() || e.is_out_of_memory() {
        return ErrorCode::Internal;
    }

    ErrorCode::Internal
}
