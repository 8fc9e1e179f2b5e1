use axum::http::Method;

/// Authorization requirement of a proxied request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    PublicRead,
    ProtectedRead,
    Write,
}

impl Access {
    pub fn requires_credential(self) -> bool {
        !matches!(self, Access::PublicRead)
    }

    pub fn is_read(self) -> bool {
        !matches!(self, Access::Write)
    }
}

/// `GET`/`HEAD` are reads; everything else writes.
pub fn is_read(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

/// Decides `(method, path)` → [`Access`]. Holds only the configured prefix list.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    protected_prefixes: Vec<String>,
}

impl PathClassifier {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let protected_prefixes = prefixes
            .into_iter()
            .map(|p| normalize(p.as_ref()))
            .filter(|p| p != "/")
            .collect();
        Self { protected_prefixes }
    }

    pub fn classify(&self, method: &Method, path: &str) -> Access {
        if !is_read(method) {
            return Access::Write;
        }
        let path = normalize(path);
        if self.is_protected(&path) {
            Access::ProtectedRead
        } else {
            Access::PublicRead
        }
    }

    // Segment-aware: `/portfolios` covers `/portfolios/7` but not `/portfoliosx`.
    fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes.iter().any(|prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

/// Leading slash, no empty segments, no trailing slash.
pub fn normalize(path: &str) -> String {
    let joined = path
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{joined}")
}
