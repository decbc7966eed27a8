//! Archetype catalog (`archetype-catalog.xml`).

use crate::error::StoreError;
use crate::xml::{self, XmlWriter};
use crate::CATALOG_FILE;

/// All archetypes known to a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchetypeCatalog {
    /// Entries in document order.
    pub archetypes: Vec<Archetype>,
}

/// One archetype entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archetype {
    /// The archetype's groupId.
    pub group_id: String,
    /// The archetype's artifactId.
    pub artifact_id: String,
    /// The archetype version.
    pub version: String,
    /// Repository URL, when the archetype lives elsewhere.
    pub repository: Option<String>,
    /// Shown by `archetype:generate`.
    pub description: Option<String>,
}

impl Archetype {
    fn key(&self) -> (&str, &str, &str) {
        (&self.group_id, &self.artifact_id, &self.version)
    }
}

impl ArchetypeCatalog {
    /// True when no archetype is listed.
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    /// Append entries from `other` that are not already present.
    pub fn merge(&mut self, other: &ArchetypeCatalog) {
        for archetype in &other.archetypes {
            if !self.archetypes.iter().any(|a| a.key() == archetype.key()) {
                self.archetypes.push(archetype.clone());
            }
        }
    }

    /// Render the `archetype-catalog.xml` text.
    pub fn to_xml(&self) -> String {
        let mut w = XmlWriter::new();
        w.start("archetype-catalog").start("archetypes");
        for a in &self.archetypes {
            w.start("archetype");
            w.text("groupId", &a.group_id);
            w.text("artifactId", &a.artifact_id);
            w.text("version", &a.version);
            w.opt_text("repository", a.repository.as_deref());
            w.opt_text("description", a.description.as_deref());
            w.end();
        }
        w.finish()
    }

    /// Parse `archetype-catalog.xml` text.
    pub fn from_xml(input: &str) -> Result<Self, StoreError> {
        let root = xml::parse(CATALOG_FILE, input)?;
        if root.name != "archetype-catalog" {
            return Err(StoreError::invalid_document(
                CATALOG_FILE,
                format!("unexpected root element <{}>", root.name),
            ));
        }
        let archetypes = root
            .child("archetypes")
            .map(|list| {
                list.children_named("archetype")
                    .filter_map(|a| {
                        Some(Archetype {
                            group_id: a.child_text("groupId")?,
                            artifact_id: a.child_text("artifactId")?,
                            version: a.child_text("version")?,
                            repository: a.child_text("repository"),
                            description: a.child_text("description"),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self { archetypes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archetype(artifact_id: &str, version: &str) -> Archetype {
        Archetype {
            group_id: "org.example".into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            repository: None,
            description: Some("quickstart".into()),
        }
    }

    #[test]
    fn empty_catalog_serializes() {
        let xml = ArchetypeCatalog::default().to_xml();
        assert!(xml.contains("<archetype-catalog>"));
        assert!(xml.contains("<archetypes>"));
        assert!(ArchetypeCatalog::from_xml(&xml).unwrap().is_empty());
    }

    #[test]
    fn round_trip() {
        let catalog = ArchetypeCatalog {
            archetypes: vec![archetype("quick", "1.0"), archetype("web", "2.1")],
        };
        assert_eq!(ArchetypeCatalog::from_xml(&catalog.to_xml()).unwrap(), catalog);
    }

    #[test]
    fn merge_skips_duplicates() {
        let mut a = ArchetypeCatalog {
            archetypes: vec![archetype("quick", "1.0")],
        };
        let b = ArchetypeCatalog {
            archetypes: vec![archetype("quick", "1.0"), archetype("quick", "1.1")],
        };
        a.merge(&b);
        assert_eq!(a.archetypes.len(), 2);
    }

    #[test]
    fn entries_missing_coordinates_are_skipped() {
        let xml = "<archetype-catalog><archetypes>\
                   <archetype><groupId>g</groupId></archetype>\
                   <archetype><groupId>g</groupId><artifactId>a</artifactId><version>1</version></archetype>\
                   </archetypes></archetype-catalog>";
        let catalog = ArchetypeCatalog::from_xml(xml).unwrap();
        assert_eq!(catalog.archetypes.len(), 1);
    }
}
