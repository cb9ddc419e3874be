//! Schema mapping
//!
//! Resolves each canonical field to the header actually present in a batch,
//! using a table of accepted aliases. Matching is case-insensitive and ignores
//! surrounding whitespace; aliases are tried in declared priority order.

use crate::types::CanonicalField;
use std::collections::BTreeMap;

/// Accepted header spellings per canonical field, in priority order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    entries: Vec<(CanonicalField, Vec<String>)>,
}

impl Default for AliasTable {
    fn default() -> Self {
        use CanonicalField::*;

        let table: [(CanonicalField, &[&str]); 9] = [
            (Speed, &["speed"]),
            (Ph, &["ph"]),
            (Salinity, &["salinity", "sal"]),
            (Turbidity, &["turbidity", "turb"]),
            (Pressure, &["pressure", "press"]),
            (Leak, &["leak"]),
            (Lat, &["lat"]),
            (Lng, &["lng"]),
            (Timestamp, &["timestamp", "ts"]),
        ];

        Self {
            entries: table
                .iter()
                .map(|(field, aliases)| {
                    (*field, aliases.iter().map(|a| a.to_string()).collect())
                })
                .collect(),
        }
    }
}

impl AliasTable {
    /// Builder method: append an alias at the lowest priority for `field`
    pub fn with_alias(mut self, field: CanonicalField, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some((_, aliases)) => aliases.push(alias),
            None => self.entries.push((field, vec![alias])),
        }
        self
    }

    /// Aliases for a field, highest priority first
    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, aliases)| aliases.as_slice())
            .unwrap_or(&[])
    }

    /// Resolve a header row into a field mapping
    ///
    /// The recorded header keeps its original spelling so it can be used to
    /// index the raw rows. Fields without a matching alias are omitted.
    pub fn resolve<S: AsRef<str>>(&self, headers: &[S]) -> FieldMapping {
        let folded: Vec<String> = headers
            .iter()
            .map(|h| h.as_ref().trim().to_lowercase())
            .collect();

        let mut mapping = FieldMapping::default();
        for (field, aliases) in &self.entries {
            for alias in aliases {
                let wanted = alias.trim().to_lowercase();
                if let Some(idx) = folded.iter().position(|h| *h == wanted) {
                    mapping.insert(*field, headers[idx].as_ref());
                    break;
                }
            }
        }

        log::trace!("Resolved {} of {} canonical fields", mapping.len(), self.entries.len());
        mapping
    }
}

/// Resolve headers with the default alias table
pub fn resolve_mapping<S: AsRef<str>>(headers: &[S]) -> FieldMapping {
    AliasTable::default().resolve(headers)
}

/// Canonical field -> source header matched for the current batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    fields: BTreeMap<CanonicalField, String>,
}

impl FieldMapping {
    pub fn insert(&mut self, field: CanonicalField, header: impl Into<String>) {
        self.fields.insert(field, header.into());
    }

    /// The source header for a field, if one matched
    pub fn header(&self, field: CanonicalField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &str)> {
        self.fields.iter().map(|(f, h)| (*f, h.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Canonical fields with no matching header
    pub fn unmapped(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL
            .iter()
            .copied()
            .filter(|f| !self.contains(*f))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CanonicalField::*;

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let mapping = resolve_mapping(&["  PH ", "Sal", "TS"]);

        assert_eq!(mapping.header(Ph), Some("  PH "));
        assert_eq!(mapping.header(Salinity), Some("Sal"));
        assert_eq!(mapping.header(Timestamp), Some("TS"));
        assert_eq!(mapping.len(), 3);
    }

    #[test]
    fn test_alias_priority_order() {
        // "salinity" outranks "sal" regardless of header order
        let mapping = resolve_mapping(&["sal", "Salinity", "press", "PRESSURE", "ts"]);

        assert_eq!(mapping.header(Salinity), Some("Salinity"));
        assert_eq!(mapping.header(Pressure), Some("PRESSURE"));
        assert_eq!(mapping.header(Timestamp), Some("ts"));
    }

    #[test]
    fn test_unmatched_fields_are_omitted() {
        let mapping = resolve_mapping(&["speed", "depth", "temperature"]);

        assert_eq!(mapping.header(Speed), Some("speed"));
        assert!(!mapping.contains(Ph));
        assert!(!mapping.contains(Leak));
        assert_eq!(mapping.unmapped().len(), 8);
    }

    #[test]
    fn test_empty_headers_yield_empty_mapping() {
        let headers: Vec<String> = Vec::new();
        assert!(resolve_mapping(&headers).is_empty());
        assert!(resolve_mapping(&["foo", "bar"]).is_empty());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let headers = vec!["Turb".to_string(), "lat".to_string(), "LNG".to_string()];
        let first = resolve_mapping(&headers);
        let second = resolve_mapping(&headers);

        assert_eq!(first, second);
        assert_eq!(first.header(Turbidity), Some("Turb"));
        assert_eq!(first.header(Lng), Some("LNG"));
    }

    #[test]
    fn test_duplicate_spellings_pick_first_header() {
        let mapping = resolve_mapping(&["Leak", "LEAK"]);
        assert_eq!(mapping.header(Leak), Some("Leak"));
    }

    #[test]
    fn test_extended_alias_table() {
        let table = AliasTable::default().with_alias(Pressure, "bar");

        assert_eq!(table.aliases(Pressure), ["pressure", "press", "bar"]);
        let mapping = table.resolve(&["Bar"]);
        assert_eq!(mapping.header(Pressure), Some("Bar"));

        // Default aliases still win over the appended one
        let mapping = table.resolve(&["Bar", "Press"]);
        assert_eq!(mapping.header(Pressure), Some("Press"));
    }
}
