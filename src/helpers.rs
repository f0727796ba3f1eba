use http::header::{HeaderMap, HeaderName, HeaderValue};

/// Parses a part's header block into a header map, one `Name: Value` per line.
///
/// Lines that aren't a valid header are logged and skipped; a later header with the same name
/// replaces an earlier one.
pub(crate) fn parse_header_block(raw: &[u8]) -> HeaderMap {
    let text = String::from_utf8_lossy(raw);
    let mut headers = HeaderMap::new();

    for line in text.split('\n').map(str::trim).filter(|line| !line.is_empty()) {
        trace!("parsing part header line: {:?}", line);

        match split_header_line(line) {
            Some((name, value)) => {
                headers.insert(name, value);
            }
            None => {
                warn!("ignoring malformed part header line: {:?}", line);
            }
        }
    }

    headers
}

fn split_header_line(line: &str) -> Option<(HeaderName, HeaderValue)> {
    let (name, value) = line.split_once(':')?;

    let name = HeaderName::from_bytes(name.trim_end().as_bytes()).ok()?;
    let value = HeaderValue::from_bytes(value.trim().as_bytes()).ok()?;

    Some((name, value))
}
