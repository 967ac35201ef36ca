//! Scanner for search responses.

use quick_xml::events::BytesStart;
use serde::{Deserialize, Serialize};

use super::scan::{attribute, XmlScanner};

/// One candidate returned by a name search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Remote item identifier.
    pub id: u64,
    /// Primary name.
    pub name: String,
    /// Year of first publication.
    pub year: i32,
}

impl SearchHit {
    /// Label used by the result list, e.g. `Tapestry (2019)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.year)
    }
}

/// Collects `item` elements that carry an id, a primary name and a year.
#[derive(Debug, Default)]
pub struct SearchScanner {
    hits: Vec<SearchHit>,
    id: Option<u64>,
    name: Option<String>,
    year: Option<i32>,
}

impl SearchScanner {
    fn reset(&mut self) {
        self.id = None;
        self.name = None;
        self.year = None;
    }
}

impl XmlScanner for SearchScanner {
    type Output = Vec<SearchHit>;

    fn start(&mut self, element: &BytesStart<'_>) {
        match element.name().as_ref() {
            b"item" => {
                self.reset();
                self.id = attribute(element, b"id").and_then(|id| id.trim().parse().ok());
            }
            b"name" if attribute(element, b"type").as_deref() == Some("primary") => {
                self.name = attribute(element, b"value");
            }
            b"yearpublished" => {
                self.year = attribute(element, b"value").and_then(|year| year.trim().parse().ok());
            }
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        if name != b"item" {
            return;
        }
        if let (Some(id), Some(name), Some(year)) = (self.id, self.name.take(), self.year) {
            self.hits.push(SearchHit { id, name, year });
        }
        self.reset();
    }

    fn finish(self) -> Self::Output {
        self.hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::LookupError, lookup::scan::scan_str};

    #[test]
    fn hits_keep_document_order() -> Result<(), LookupError> {
        let body = r#"<items total="2">
            <item type="boardgame" id="286096">
                <name type="primary" value="Tapestry"/>
                <yearpublished value="2019"/>
            </item>
            <item type="boardgame" id="13">
                <name type="alternate" value="Die Siedler von Catan"/>
                <name type="primary" value="CATAN"/>
                <yearpublished value="1995"/>
            </item>
        </items>"#;

        let hits = scan_str(body, SearchScanner::default())?;
        assert_eq!(
            hits,
            [
                SearchHit {
                    id: 286096,
                    name: "Tapestry".into(),
                    year: 2019,
                },
                SearchHit {
                    id: 13,
                    name: "CATAN".into(),
                    year: 1995,
                },
            ]
        );
        assert_eq!(hits[1].label(), "CATAN (1995)");
        Ok(())
    }

    #[test]
    fn incomplete_items_are_skipped() -> Result<(), LookupError> {
        let body = r#"<items>
            <item id="1"><name type="primary" value="No Year"/></item>
            <item id="2"><name type="alternate" value="Alt Only"/><yearpublished value="2001"/></item>
            <item id="x"><name type="primary" value="Bad Id"/><yearpublished value="2001"/></item>
            <item id="4"><name type="primary" value="Complete"/><yearpublished value="2020"/></item>
        </items>"#;

        let hits = scan_str(body, SearchScanner::default())?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Complete");
        Ok(())
    }

    #[test]
    fn empty_result_set() -> Result<(), LookupError> {
        let hits = scan_str(r#"<items total="0"></items>"#, SearchScanner::default())?;
        assert!(hits.is_empty());
        Ok(())
    }
}
