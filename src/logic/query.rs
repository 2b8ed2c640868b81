use regex::Regex;
use std::sync::OnceLock;

use crate::error::{CimError, CimResult};
use crate::model::CimName;

/// Query languages accepted by ExecQuery and OpenQueryInstances.
pub const QUERY_LANGUAGES: [&str; 3] = ["WQL", "CQL", "DMTF:CQL"];

/// The only filter language accepted on Open* requests.
pub const FILTER_QUERY_LANGUAGE: &str = "DMTF:FQL";

/// Shallow SELECT/FROM extraction of a query. Predicates are kept as raw
/// text and never evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub classname: CimName,
    /// `None` for `SELECT *`.
    pub properties: Option<Vec<String>>,
    pub where_clause: Option<String>,
}

pub struct QueryParser;

fn select_regex() -> &'static Regex {
    static SELECT: OnceLock<Regex> = OnceLock::new();
    SELECT.get_or_init(|| {
        Regex::new(
            r"(?is)^\s*SELECT\s+(?P<props>.+?)\s+FROM\s+(?P<class>[A-Za-z_][A-Za-z0-9_]*)\s*(?:WHERE\s+(?P<where>.*?))?\s*;?\s*$",
        )
        .expect("select pattern is valid")
    })
}

impl QueryParser {
    pub fn is_supported_language(language: &str) -> bool {
        QUERY_LANGUAGES
            .iter()
            .any(|l| l.eq_ignore_ascii_case(language.trim()))
    }

    pub fn parse(language: &str, query: &str) -> CimResult<ParsedQuery> {
        if !Self::is_supported_language(language) {
            return Err(CimError::InvalidQueryLanguage {
                language: language.to_string(),
            });
        }

        let captures = select_regex()
            .captures(query)
            .ok_or_else(|| CimError::InvalidQuery {
                query: query.to_string(),
                reason: "expected SELECT <properties> FROM <class>".to_string(),
            })?;

        let props = captures["props"].trim();
        let properties = if props == "*" {
            None
        } else {
            let names: Vec<String> = props
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            if names.is_empty() || names.iter().any(|n| n == "*") {
                return Err(CimError::InvalidQuery {
                    query: query.to_string(),
                    reason: "malformed select list".to_string(),
                });
            }
            Some(names)
        };

        Ok(ParsedQuery {
            classname: CimName::new(&captures["class"]),
            properties,
            where_clause: captures
                .name("where")
                .map(|w| w.as_str().trim().to_string())
                .filter(|w| !w.is_empty()),
        })
    }

    /// Validate the FilterQueryLanguage / FilterQuery pair of an Open* request.
    pub fn check_filter(language: Option<&str>, query: Option<&str>) -> CimResult<()> {
        match (language, query) {
            (Some(lang), _) if !lang.trim().eq_ignore_ascii_case(FILTER_QUERY_LANGUAGE) => {
                Err(CimError::InvalidQueryLanguage {
                    language: lang.to_string(),
                })
            }
            (None, Some(_)) => Err(CimError::invalid_parameter(
                "FilterQuery given without FilterQueryLanguage",
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_star() {
        let parsed = QueryParser::parse("WQL", "SELECT * FROM CIM_Foo").unwrap();
        assert_eq!(parsed.classname.as_str(), "CIM_Foo");
        assert!(parsed.properties.is_none());
        assert!(parsed.where_clause.is_none());
    }

    #[test]
    fn test_select_list_and_ignored_where() {
        let parsed = QueryParser::parse(
            "dmtf:cql",
            "select InstanceID, Caption from CIM_Foo where InstanceID = 'I1'",
        )
        .unwrap();
        assert_eq!(
            parsed.properties,
            Some(vec!["InstanceID".to_string(), "Caption".to_string()])
        );
        assert_eq!(parsed.where_clause.as_deref(), Some("InstanceID = 'I1'"));
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            QueryParser::parse("SQL", "SELECT * FROM CIM_Foo"),
            Err(CimError::InvalidQueryLanguage { .. })
        ));
        assert!(matches!(
            QueryParser::parse("WQL", "DELETE FROM CIM_Foo"),
            Err(CimError::InvalidQuery { .. })
        ));
    }

    #[test]
    fn test_filter_checks() {
        assert!(QueryParser::check_filter(None, None).is_ok());
        assert!(QueryParser::check_filter(Some("DMTF:FQL"), Some("a=1")).is_ok());
        assert!(matches!(
            QueryParser::check_filter(Some("WQL"), None),
            Err(CimError::InvalidQueryLanguage { .. })
        ));
        assert!(matches!(
            QueryParser::check_filter(None, Some("a=1")),
            Err(CimError::InvalidParameter { .. })
        ));
    }
}
