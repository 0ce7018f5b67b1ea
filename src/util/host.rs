//! Local host name, used as the Link `client_user_id`.

use std::ffi::OsString;

const FALLBACK: &str = "plaid-cli";

/// The OS host name, or `plaid-cli` when it is empty or not valid UTF-8.
pub fn hostname() -> String {
    from_os(gethostname::gethostname())
}

fn from_os(raw: OsString) -> String {
    raw.into_string()
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_the_system_host_name() {
        let expected = gethostname::gethostname()
            .into_string()
            .map(|name| name.trim().to_string())
            .unwrap_or_default();
        if !expected.is_empty() {
            assert_eq!(hostname(), expected);
        }
    }

    #[test]
    fn name_is_trimmed() {
        assert_eq!(from_os(OsString::from("box\n")), "box");
    }

    #[test]
    fn falls_back_when_blank() {
        assert_eq!(from_os(OsString::from("  ")), FALLBACK);
    }

    #[cfg(unix)]
    #[test]
    fn falls_back_when_not_utf8() {
        use std::os::unix::ffi::OsStringExt;

        assert_eq!(from_os(OsString::from_vec(vec![0xff, 0xfe])), FALLBACK);
    }
}
