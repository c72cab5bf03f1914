use std::net::IpAddr;

/// Derives the project name from a site host name.
///
/// The project is the first label of the host once a leading `www.` is
/// removed: `www.example.ru` and `example.ru` both belong to `example`,
/// `app.example.ru` to `app`. IP addresses and blank hosts have no project.
pub fn project_from_host(host: &str) -> Option<String> {
    let host = host.trim().to_ascii_lowercase();
    let host = host.trim_start_matches('[').trim_end_matches(']');

    if host.parse::<IpAddr>().is_ok() {
        return None;
    }

    let host = host.strip_prefix("www.").unwrap_or(host);
    host.trim_end_matches('.')
        .split('.')
        .next()
        .filter(|label| !label.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_from_host() {
        let cases = [
            ("www.example.ru", Some("example")),
            ("example.ru", Some("example")),
            ("WWW.Example.RU", Some("example")),
            ("app.example.ru", Some("app")),
            ("example.ru.", Some("example")),
            ("localhost", Some("localhost")),
            ("", None),
            ("  ", None),
            ("www.", None),
            (".example.ru", None),
            ("127.0.0.1", None),
            ("[::1]", None),
        ];

        for (host, expected) in cases {
            assert_eq!(
                project_from_host(host).as_deref(),
                expected,
                "host {host:?}"
            );
        }
    }
}
