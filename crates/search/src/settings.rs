//! Search settings: the author filter, date filter, and top-k bundle that
//! shapes a `search_similar` call. A tagged-union re-modelling of the
//! reference implementation's dynamic settings dict.

use serde::{Deserialize, Serialize};

/// Author allow/deny list: a genuine sum type, not two parallel vectors.
/// `includes` and `excludes` are mutually exclusive — `UserFilter`'s
/// `Deserialize` impl rejects a request that sets both before either ever
/// reaches `is_user_allowed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthorFilter {
    #[default]
    None,
    Includes(Vec<String>),
    Excludes(Vec<String>),
}

/// Author allow/deny plus post-count thresholds.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub authors: AuthorFilter,
    pub threshold_min: Option<usize>,
    pub threshold_max: Option<usize>,
}

/// Wire shape: flat `includes`/`excludes` lists, same as the reference
/// tool's settings dict. Parsed into `AuthorFilter` at deserialisation time.
#[derive(Debug, Default, Deserialize, Serialize)]
struct RawUserFilter {
    #[serde(default)]
    includes: Vec<String>,
    #[serde(default)]
    excludes: Vec<String>,
    #[serde(default)]
    threshold_min: Option<usize>,
    #[serde(default)]
    threshold_max: Option<usize>,
}

impl TryFrom<RawUserFilter> for UserFilter {
    type Error = String;

    fn try_from(raw: RawUserFilter) -> Result<Self, Self::Error> {
        let authors = match (raw.includes.is_empty(), raw.excludes.is_empty()) {
            (true, true) => AuthorFilter::None,
            (false, true) => AuthorFilter::Includes(raw.includes),
            (true, false) => AuthorFilter::Excludes(raw.excludes),
            (false, false) => {
                return Err("user_filter cannot set both includes and excludes".to_string());
            }
        };
        Ok(Self {
            authors,
            threshold_min: raw.threshold_min,
            threshold_max: raw.threshold_max,
        })
    }
}

impl<'de> Deserialize<'de> for UserFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawUserFilter::deserialize(deserializer)?;
        UserFilter::try_from(raw).map_err(serde::de::Error::custom)
    }
}

impl Serialize for UserFilter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let raw = match &self.authors {
            AuthorFilter::None => RawUserFilter {
                threshold_min: self.threshold_min,
                threshold_max: self.threshold_max,
                ..Default::default()
            },
            AuthorFilter::Includes(includes) => RawUserFilter {
                includes: includes.clone(),
                threshold_min: self.threshold_min,
                threshold_max: self.threshold_max,
                ..Default::default()
            },
            AuthorFilter::Excludes(excludes) => RawUserFilter {
                excludes: excludes.clone(),
                threshold_min: self.threshold_min,
                threshold_max: self.threshold_max,
                ..Default::default()
            },
        };
        raw.serialize(serializer)
    }
}

impl UserFilter {
    /// `count_of` looks up an author's total post count; the caller supplies
    /// it so this module stays independent of the repository that owns the
    /// counts.
    pub fn is_user_allowed(&self, author: Option<&str>, count_of: impl Fn(&str) -> usize) -> bool {
        let Some(author) = author else {
            return !matches!(self.authors, AuthorFilter::Includes(_));
        };

        match &self.authors {
            AuthorFilter::None => {}
            AuthorFilter::Includes(includes) => {
                if !includes.iter().any(|u| u == author) {
                    return false;
                }
            }
            AuthorFilter::Excludes(excludes) => {
                if excludes.iter().any(|u| u == author) {
                    return false;
                }
            }
        }

        let count = count_of(author);
        if let Some(min) = self.threshold_min {
            if count < min {
                return false;
            }
        }
        if let Some(max) = self.threshold_max {
            if count > max {
                return false;
            }
        }

        true
    }
}

/// Inclusive `[from, to]` range over the post timestamp string, either bound
/// optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateFilter {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

impl DateFilter {
    pub fn is_date_allowed(&self, timestamp: &str) -> bool {
        if timestamp.is_empty() {
            return true;
        }
        if let Some(from) = &self.from {
            if timestamp < from.as_str() {
                return false;
            }
        }
        if let Some(to) = &self.to {
            if timestamp > to.as_str() {
                return false;
            }
        }
        true
    }
}

/// Result-count cap, validated at the RPC boundary against `[1, 100]` for
/// `search_similar`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TopKSetting(usize);

impl TopKSetting {
    pub const MIN: usize = 1;
    pub const MAX: usize = 100;

    pub fn new(value: usize) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for TopKSetting {
    fn default() -> Self {
        Self(10)
    }
}

/// The full filter bundle passed to `SearchEngine::search_similar`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub user_filter: UserFilter,
    #[serde(default)]
    pub date_filter: DateFilter,
    #[serde(default)]
    pub top_k: TopKSetting,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_filter_includes_and_excludes() {
        let counts = |author: &str| match author {
            "alice" => 10,
            "bob" => 5,
            _ => 0,
        };

        let includes_only = UserFilter {
            authors: AuthorFilter::Includes(vec!["alice".to_string()]),
            ..Default::default()
        };
        assert!(includes_only.is_user_allowed(Some("alice"), counts));
        assert!(!includes_only.is_user_allowed(Some("bob"), counts));

        let excludes_only = UserFilter {
            authors: AuthorFilter::Excludes(vec!["bob".to_string()]),
            ..Default::default()
        };
        assert!(excludes_only.is_user_allowed(Some("alice"), counts));
        assert!(!excludes_only.is_user_allowed(Some("bob"), counts));
    }

    #[test]
    fn user_filter_rejects_includes_and_excludes_together() {
        let value = serde_json::json!({
            "includes": ["alice"],
            "excludes": ["bob"],
        });
        let err = serde_json::from_value::<UserFilter>(value).unwrap_err();
        assert!(err.to_string().contains("includes and excludes"));
    }

    #[test]
    fn user_filter_thresholds() {
        let counts = |author: &str| if author == "alice" { 10 } else { 0 };

        let filter = UserFilter {
            threshold_min: Some(5),
            threshold_max: Some(20),
            ..Default::default()
        };
        assert!(filter.is_user_allowed(Some("alice"), counts));

        let too_strict = UserFilter {
            threshold_min: Some(11),
            ..Default::default()
        };
        assert!(!too_strict.is_user_allowed(Some("alice"), counts));
    }

    #[test]
    fn date_filter_bounds() {
        let filter = DateFilter {
            from: Some("2024-01-01 00:00:00".to_string()),
            to: Some("2024-12-31 23:59:59".to_string()),
        };
        assert!(filter.is_date_allowed("2024-06-01 00:00:00"));
        assert!(!filter.is_date_allowed("2023-12-31 00:00:00"));
        assert!(!filter.is_date_allowed("2025-01-01 00:00:00"));
        assert!(filter.is_date_allowed(""));
    }

    #[test]
    fn top_k_clamps_to_bounds() {
        assert_eq!(TopKSetting::new(0).get(), 1);
        assert_eq!(TopKSetting::new(500).get(), 100);
        assert_eq!(TopKSetting::new(42).get(), 42);
    }
}
