use http::header::{self, HeaderMap};

pub(crate) struct ContentDisposition {
    pub(crate) field_name: Option<String>,
    pub(crate) file_name: Option<String>,
}

impl ContentDisposition {
    pub fn parse(headers: &HeaderMap) -> ContentDisposition {
        let mut content_disposition = ContentDisposition {
            field_name: None,
            file_name: None,
        };

        let value = headers
            .get(header::CONTENT_DISPOSITION)
            .and_then(|val| std::str::from_utf8(val.as_bytes()).ok());

        for (name, value) in value.map(parse_parameters).unwrap_or_default() {
            if name.eq_ignore_ascii_case("name") {
                content_disposition.field_name = Some(value);
            } else if name.eq_ignore_ascii_case("filename") {
                content_disposition.file_name = Some(value);
            }
        }

        content_disposition
    }
}

/// Splits the `; name=value` parameters that follow the disposition type.
///
/// Values may be tokens or quoted strings; inside quotes a backslash escapes the next character
/// and `;` has no special meaning. A parameter without `=` yields an empty value.
pub(crate) fn parse_parameters(value: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();

    let mut rest = match value.split_once(';') {
        Some((_, rest)) => rest,
        None => return params,
    };

    loop {
        let (name, after_name) = match rest.find(['=', ';']) {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };

        let mut param_value = String::new();

        rest = match after_name.strip_prefix('=') {
            Some(raw) => {
                let raw = raw.trim_start();

                match raw.strip_prefix('"') {
                    Some(quoted) => {
                        let mut end = quoted.len();
                        let mut escaped = false;

                        for (idx, ch) in quoted.char_indices() {
                            if escaped {
                                param_value.push(ch);
                                escaped = false;
                            } else if ch == '\\' {
                                escaped = true;
                            } else if ch == '"' {
                                end = idx + 1;
                                break;
                            } else {
                                param_value.push(ch);
                            }
                        }

                        let tail = &quoted[end..];
                        tail.find(';').map_or("", |idx| &tail[idx..])
                    }
                    None => {
                        let end = raw.find(';').unwrap_or(raw.len());
                        param_value.push_str(raw[..end].trim_end());
                        &raw[end..]
                    }
                }
            }
            None => after_name,
        };

        let name = name.trim();
        if !name.is_empty() {
            params.push((name.to_owned(), param_value));
        }

        match rest.strip_prefix(';') {
            Some(next) => rest = next,
            None => break,
        }
    }

    params
}
