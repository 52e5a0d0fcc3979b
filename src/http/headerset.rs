use crate::base::engineerror::EngineError;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use std::str::FromStr;

/// A validated, insertion-ordered header mapping.
///
/// Engines keep their base headers in one of these, per-call overrides are
/// merged on top, and curried fetches hold a value copy of it. Names compare
/// case-insensitively; inserting an existing name replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    /// Build a set from `(name, value)` pairs; later duplicates win.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut headers = Self::new();
        for (name, value) in pairs {
            headers.insert(name.as_ref(), value.as_ref())?;
        }
        Ok(headers)
    }

    pub fn insert(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        let name_header = HeaderName::from_str(name).map_err(|_| EngineError::InvalidHeader {
            name: name.to_string(),
        })?;
        let value_header =
            HeaderValue::from_str(value).map_err(|_| EngineError::InvalidHeader {
                name: name.to_string(),
            })?;
        self.insert_header(name_header, value_header);
        Ok(())
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        // HeaderName is lowercase, so plain equality is a case-insensitive match.
        if let Some((_, v)) = self.headers.iter_mut().find(|(n, _)| *n == name) {
            *v = value;
        } else {
            self.headers.push((name, value));
        }
    }

    pub fn remove(&mut self, name: &str) {
        if let Ok(target) = HeaderName::from_str(name) {
            self.headers.retain(|(n, _)| *n != target);
        }
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        let target = HeaderName::from_str(name).ok()?;
        self.headers
            .iter()
            .find(|(n, _)| *n == target)
            .map(|(_, v)| v)
    }

    /// Value of `name` as a string, if present and visible ASCII.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn clear(&mut self) {
        self.headers.clear();
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.headers.iter().map(|(n, v)| (n, v))
    }

    /// Overlay `overrides` on a copy of this set.
    ///
    /// Names present in both take the override's value but keep the base
    /// position; new names are appended. `self` is left untouched.
    pub fn merged(&self, overrides: &HeaderSet) -> HeaderSet {
        let mut merged = self.clone();
        for (name, value) in &overrides.headers {
            merged.insert_header(name.clone(), value.clone());
        }
        merged
    }

    /// Consumes the set and returns a standard http::HeaderMap.
    pub fn to_header_map(self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in self.headers {
            map.append(name, value);
        }
        map
    }
}
