// 📅 Date Resolver - Original (creation/mint) date over import date
//
// Precedence:
// 1. `published:` / `created:` / `minted:` / `uploaded:` YYYY-MM-DD in content
// 2. bare ISO-8601 timestamp in content
// 3. frontmatter minted_date → published_date → scraped_date → upload_date
// 4. ingestion timestamp, flagged as NOT original
//
// A malformed value is a non-match for its level; resolution keeps going.

use crate::document::{ClassificationNote, DateSource, NoteKind, ResolvedDate};
use crate::patterns::PatternLibrary;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DateResolution {
    pub date: Option<ResolvedDate>,
    pub notes: Vec<ClassificationNote>,
}

pub struct DateResolver<'a> {
    patterns: &'a PatternLibrary,
}

impl<'a> DateResolver<'a> {
    pub fn new(patterns: &'a PatternLibrary) -> Self {
        DateResolver { patterns }
    }

    pub fn resolve(
        &self,
        content: &str,
        frontmatter: &BTreeMap<String, Value>,
        created_at: Option<DateTime<Utc>>,
    ) -> DateResolution {
        let mut notes = Vec::new();

        let date = self
            .from_content_fields(content, &mut notes)
            .or_else(|| self.from_content_timestamp(content, &mut notes))
            .or_else(|| self.from_frontmatter(frontmatter, &mut notes))
            .or_else(|| {
                created_at.map(|ts| ResolvedDate {
                    date: ts.date_naive(),
                    source: DateSource::Ingestion,
                    field: Some("created_at".to_string()),
                })
            });

        DateResolution { date, notes }
    }

    fn from_content_fields(&self, content: &str, notes: &mut Vec<ClassificationNote>) -> Option<ResolvedDate> {
        for (field, regex) in &self.patterns.content_dates {
            for caps in regex.captures_iter(content) {
                let Some(raw) = caps.get(1).map(|m| m.as_str()) else {
                    continue;
                };
                match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                    Ok(date) => {
                        return Some(ResolvedDate {
                            date,
                            source: DateSource::ContentField,
                            field: Some(field.clone()),
                        })
                    }
                    Err(_) => notes.push(malformed(&format!("content field '{}'", field), raw)),
                }
            }
        }
        None
    }

    fn from_content_timestamp(&self, content: &str, notes: &mut Vec<ClassificationNote>) -> Option<ResolvedDate> {
        for caps in self.patterns.iso_timestamp.captures_iter(content) {
            let (Some(day), Some(time)) = (caps.get(1), caps.get(2)) else {
                continue;
            };

            let date = NaiveDate::parse_from_str(day.as_str(), "%Y-%m-%d").ok();
            let time_ok = parse_time(time.as_str()).is_some();

            match date {
                Some(date) if time_ok => {
                    return Some(ResolvedDate {
                        date,
                        source: DateSource::ContentTimestamp,
                        field: None,
                    })
                }
                _ => {
                    let raw = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                    notes.push(malformed("content timestamp", raw));
                }
            }
        }
        None
    }

    fn from_frontmatter(
        &self,
        frontmatter: &BTreeMap<String, Value>,
        notes: &mut Vec<ClassificationNote>,
    ) -> Option<ResolvedDate> {
        for field in self.patterns.frontmatter_date_fields() {
            let Some(value) = frontmatter.get(field) else {
                continue;
            };

            let parsed = match value {
                Value::String(raw) => parse_date_value(raw),
                Value::Null => continue,
                _ => None,
            };

            match parsed {
                Some(date) => {
                    return Some(ResolvedDate {
                        date,
                        source: DateSource::Frontmatter,
                        field: Some(field.clone()),
                    })
                }
                None => notes.push(malformed(&format!("frontmatter '{}'", field), &value.to_string())),
            }
        }
        None
    }
}

fn malformed(location: &str, raw: &str) -> ClassificationNote {
    ClassificationNote::new(
        NoteKind::MalformedDate,
        format!("Malformed date in {}: {}", location, raw),
    )
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Parse a date-ish frontmatter string (date, RFC 3339, naive datetime, MM/DD/YYYY)
pub fn parse_date_value(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts.date());
        }
    }

    NaiveDate::parse_from_str(raw, "%m/%d/%Y").ok()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn resolve(content: &str, frontmatter: &[(&str, Value)], created_at: Option<DateTime<Utc>>) -> DateResolution {
        let patterns = PatternLibrary::with_defaults();
        let frontmatter: BTreeMap<String, Value> = frontmatter
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        DateResolver::new(&patterns).resolve(content, &frontmatter, created_at)
    }

    #[test]
    fn test_content_field() {
        let result = resolve("Edition 1/1\nminted: 2022-08-15\n", &[], None);
        let date = result.date.unwrap();
        assert_eq!(date.date, ymd(2022, 8, 15));
        assert_eq!(date.source, DateSource::ContentField);
        assert_eq!(date.field.as_deref(), Some("minted"));
        assert!(date.is_original());
    }

    #[test]
    fn test_content_field_beats_frontmatter() {
        let result = resolve(
            "Published: 2021-03-01",
            &[("minted_date", json!("2020-01-01"))],
            None,
        );
        assert_eq!(result.date.unwrap().date, ymd(2021, 3, 1));
    }

    #[test]
    fn test_field_priority_order() {
        let result = resolve("minted: 2022-08-15\npublished: 2022-09-01", &[], None);
        assert_eq!(result.date.unwrap().field.as_deref(), Some("published"));
    }

    #[test]
    fn test_bare_iso_timestamp() {
        let result = resolve("Listed at 2023-02-10T14:30:00Z by the artist", &[], None);
        let date = result.date.unwrap();
        assert_eq!(date.date, ymd(2023, 2, 10));
        assert_eq!(date.source, DateSource::ContentTimestamp);
    }

    #[test]
    fn test_frontmatter_order() {
        let result = resolve(
            "",
            &[
                ("scraped_date", json!("2024-05-01")),
                ("published_date", json!("2023-06-01T00:00:00Z")),
            ],
            None,
        );
        let date = result.date.unwrap();
        assert_eq!(date.date, ymd(2023, 6, 1));
        assert_eq!(date.field.as_deref(), Some("published_date"));
    }

    #[test]
    fn test_malformed_content_field_falls_through() {
        let result = resolve("minted: 2022-13-45", &[("upload_date", json!("2022-01-02"))], None);
        let date = result.date.unwrap();
        assert_eq!(date.date, ymd(2022, 1, 2));
        assert_eq!(date.source, DateSource::Frontmatter);
        assert_eq!(result.notes.len(), 1);
        assert_eq!(result.notes[0].kind, NoteKind::MalformedDate);
    }

    #[test]
    fn test_malformed_frontmatter_skipped() {
        let result = resolve(
            "",
            &[("minted_date", json!("not a date")), ("published_date", json!(12345)), ("scraped_date", json!("08/15/2022"))],
            None,
        );
        assert_eq!(result.date.unwrap().date, ymd(2022, 8, 15));
        assert_eq!(result.notes.len(), 2);
    }

    #[test]
    fn test_ingestion_fallback_is_flagged() {
        let created = Utc.with_ymd_and_hms(2024, 1, 5, 10, 30, 0).unwrap();
        let result = resolve("no dates here", &[("minted_date", json!("garbage"))], Some(created));
        let date = result.date.unwrap();
        assert_eq!(date.date, ymd(2024, 1, 5));
        assert_eq!(date.source, DateSource::Ingestion);
        assert!(!date.is_original());
    }

    #[test]
    fn test_nothing_at_all() {
        let result = resolve("", &[], None);
        assert!(result.date.is_none());
        assert!(result.notes.is_empty());
    }

    #[test]
    fn test_parse_date_value_formats() {
        assert_eq!(parse_date_value("2022-08-15"), Some(ymd(2022, 8, 15)));
        assert_eq!(parse_date_value("2022-08-15T23:59:59+02:00"), Some(ymd(2022, 8, 15)));
        assert_eq!(parse_date_value("2022-08-15 10:00:00"), Some(ymd(2022, 8, 15)));
        assert_eq!(parse_date_value("08/15/2022"), Some(ymd(2022, 8, 15)));
        assert_eq!(parse_date_value("yesterday"), None);
    }
}
