//! HTTP status code descriptions

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid HTTP status code: {input}")]
pub struct InvalidStatusCode {
    input: String,
}

impl InvalidStatusCode {
    fn new(input: impl ToString) -> Self {
        Self {
            input: input.to_string(),
        }
    }
}

const STATUS_DESCRIPTIONS: &[(i64, &str)] = &[
    (100, "Continue"),
    (101, "Switching Protocols"),
    (102, "Processing"),
    (103, "Early Hints"),
    (200, "OK"),
    (201, "Created"),
    (202, "Accepted"),
    (203, "Non-Authoritative Information"),
    (204, "No Content"),
    (205, "Reset Content"),
    (206, "Partial Content"),
    (207, "Multi-Status"),
    (208, "Already Reported"),
    (226, "IM Used"),
    (300, "Multiple Choices"),
    (301, "Moved Permanently"),
    (302, "Found"),
    (303, "See Other"),
    (304, "Not Modified"),
    (305, "Use Proxy"),
    (307, "Temporary Redirect"),
    (308, "Permanent Redirect"),
    (400, "Bad Request"),
    (401, "Unauthorized"),
    (402, "Payment Required"),
    (403, "Forbidden"),
    (404, "Not Found"),
    (405, "Method Not Allowed"),
    (406, "Not Acceptable"),
    (407, "Proxy Authentication Required"),
    (408, "Request Timeout"),
    (409, "Conflict"),
    (410, "Gone"),
    (411, "Length Required"),
    (412, "Precondition Failed"),
    (413, "Payload Too Large"),
    (414, "URI Too Long"),
    (415, "Unsupported Media Type"),
    (416, "Range Not Satisfiable"),
    (417, "Expectation Failed"),
    (418, "I'm a teapot"),
    (421, "Misdirected Request"),
    (422, "Unprocessable Entity"),
    (423, "Locked"),
    (424, "Failed Dependency"),
    (425, "Too Early"),
    (426, "Upgrade Required"),
    (428, "Precondition Required"),
    (429, "Too Many Requests"),
    (431, "Request Header Fields Too Large"),
    (451, "Unavailable For Legal Reasons"),
    (500, "Internal Server Error"),
    (501, "Not Implemented"),
    (502, "Bad Gateway"),
    (503, "Service Unavailable"),
    (504, "Gateway Timeout"),
    (505, "HTTP Version Not Supported"),
    (506, "Variant Also Negotiates"),
    (507, "Insufficient Storage"),
    (508, "Loop Detected"),
    (510, "Not Extended"),
    (511, "Network Authentication Required"),
];

/// `"404 Not Found"` style description. `0` means the request got no response;
/// anything else outside 100..=599 is an error.
pub fn describe_status(code: i64) -> Result<String, InvalidStatusCode> {
    if code == 0 {
        return Ok("0 No Response".to_string());
    }
    if !(100..600).contains(&code) {
        return Err(InvalidStatusCode::new(code));
    }

    let description = STATUS_DESCRIPTIONS
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, description)| *description)
        .unwrap_or(match code / 100 {
            1 => "Informational",
            2 => "Success",
            3 => "Redirection",
            4 => "Client Error",
            _ => "Server Error",
        });
    Ok(format!("{code} {description}"))
}

/// Describe a status given as text, as it appears in captures and on the command line
pub fn describe_status_str(input: Option<&str>) -> Result<String, InvalidStatusCode> {
    let Some(raw) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok("0 No Status Code Provided".to_string());
    };
    raw.parse::<i64>()
        .map_err(|_| InvalidStatusCode::new(raw))
        .and_then(describe_status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes() {
        assert_eq!(describe_status(200).unwrap(), "200 OK");
        assert_eq!(describe_status(404).unwrap(), "404 Not Found");
        assert_eq!(describe_status(418).unwrap(), "418 I'm a teapot");
        assert_eq!(describe_status(511).unwrap(), "511 Network Authentication Required");
    }

    #[test]
    fn unlisted_codes_get_their_category() {
        assert_eq!(describe_status(199).unwrap(), "199 Informational");
        assert_eq!(describe_status(299).unwrap(), "299 Success");
        assert_eq!(describe_status(399).unwrap(), "399 Redirection");
        assert_eq!(describe_status(499).unwrap(), "499 Client Error");
        assert_eq!(describe_status(599).unwrap(), "599 Server Error");
    }

    #[test]
    fn sentinels() {
        assert_eq!(describe_status(0).unwrap(), "0 No Response");
        assert_eq!(describe_status_str(None).unwrap(), "0 No Status Code Provided");
        assert_eq!(describe_status_str(Some("")).unwrap(), "0 No Status Code Provided");
        assert_eq!(describe_status_str(Some("0")).unwrap(), "0 No Response");
        assert_eq!(describe_status_str(Some(" 301 ")).unwrap(), "301 Moved Permanently");
    }

    #[test]
    fn invalid_codes() {
        for code in [-1, 99, 600, 1000] {
            assert_eq!(describe_status(code), Err(InvalidStatusCode::new(code)));
        }
        let err = describe_status_str(Some("abc")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid HTTP status code: abc");
    }
}
