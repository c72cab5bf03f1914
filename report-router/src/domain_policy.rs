use std::collections::HashSet;

/// Which hosts may report, and which of them get sourcemap resolution.
///
/// Both lists are snapshots of the configuration. An empty whitelist allows
/// every host; the sourcemap list is a blacklist, so an empty one excludes
/// nothing.
#[derive(Clone, Debug, Default)]
pub struct DomainPolicy {
    whitelist: HashSet<String>,
    sourcemap_blacklist: HashSet<String>,
}

impl DomainPolicy {
    pub fn new<I, J>(whitelist: I, sourcemap_blacklist: J) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        J: IntoIterator,
        J::Item: AsRef<str>,
    {
        DomainPolicy {
            whitelist: normalize(whitelist),
            sourcemap_blacklist: normalize(sourcemap_blacklist),
        }
    }

    pub fn is_allowed_domain(&self, host: &str) -> bool {
        self.whitelist.is_empty() || self.whitelist.contains(&host.to_ascii_lowercase())
    }

    pub fn is_allowed_for_sourcemap(&self, host: &str) -> bool {
        !self
            .sourcemap_blacklist
            .contains(&host.to_ascii_lowercase())
    }
}

fn normalize<I>(hosts: I) -> HashSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    hosts
        .into_iter()
        .map(|host| host.as_ref().trim().to_ascii_lowercase())
        .filter(|host| !host.is_empty())
        .collect()
}
