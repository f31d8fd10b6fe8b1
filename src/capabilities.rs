// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 OSM Client Authors

use crate::version::Version;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CapabilityError {
    /// The document was not well-formed XML
    #[error("malformed capabilities document: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The document contained no XML elements at all
    #[error("capabilities document contains no XML elements")]
    Empty,

    /// An advertised value could not be read as a number
    #[error("capability value '{value}' for {tag}@{attribute} is not numeric")]
    BadValue {
        tag: &'static str,
        attribute: &'static str,
        value: String,
    },
}

/// Resource limits and the supported version range advertised by a server
/// through its `/api/capabilities` document.
///
/// Fields the server did not advertise stay `None`; the six known
/// (tag, attribute) pairs are searched document-wide and only the first
/// occurrence of each tag counts. Unknown tags are ignored.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Capabilities {
    /// Minimum API version the server supports (`version@minimum`)
    pub min_version: Option<Version>,
    /// Maximum API version the server supports (`version@maximum`)
    pub max_version: Option<Version>,
    /// Request timeout in seconds (`timeout@seconds`)
    pub timeout_seconds: Option<u32>,
    /// Elements allowed per changeset (`changesets@maximum_elements`)
    pub max_changeset_elements: Option<u32>,
    /// Nodes allowed per way (`waynodes@maximum`)
    pub max_way_nodes: Option<u32>,
    /// Tracepoints returned per page (`tracepoints@per_page`)
    pub tracepoints_per_page: Option<u32>,
    /// Largest area downloadable in one request (`area@maximum`)
    pub max_area: Option<f64>,
}

impl Capabilities {
    /// Parse a capabilities document.
    ///
    /// # Arguments
    ///
    /// * `document` the XML body returned by `/api/capabilities`
    ///
    /// # Returns
    ///
    /// The advertised capabilities, or an error if the document is not
    /// well-formed or a known attribute holds a non-numeric value
    pub fn from_xml(document: &str) -> Result<Capabilities, CapabilityError> {
        let mut reader = Reader::from_reader(document.as_bytes());
        let mut buf = Vec::new();
        let mut caps = Capabilities::default();
        let mut seen = HashSet::new();
        let mut saw_element = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    saw_element = true;
                    caps.scan_element(&e, &mut seen)?;
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(CapabilityError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        if !saw_element {
            return Err(CapabilityError::Empty);
        }

        Ok(caps)
    }

    fn scan_element(
        &mut self,
        element: &BytesStart,
        seen: &mut HashSet<&'static str>,
    ) -> Result<(), CapabilityError> {
        let tag = match element.local_name().as_ref() {
            b"version" => "version",
            b"timeout" => "timeout",
            b"changesets" => "changesets",
            b"waynodes" => "waynodes",
            b"tracepoints" => "tracepoints",
            b"area" => "area",
            _ => return Ok(()),
        };

        // only the first occurrence of each tag counts
        if !seen.insert(tag) {
            return Ok(());
        }

        for attr in element.attributes().flatten() {
            let value = String::from_utf8_lossy(&attr.value).to_string();
            match (tag, attr.key.local_name().as_ref()) {
                ("version", b"minimum") => {
                    self.min_version =
                        Some(numeric(tag, "minimum", &value)?);
                }
                ("version", b"maximum") => {
                    self.max_version =
                        Some(numeric(tag, "maximum", &value)?);
                }
                ("timeout", b"seconds") => {
                    self.timeout_seconds =
                        Some(numeric(tag, "seconds", &value)?);
                }
                ("changesets", b"maximum_elements") => {
                    self.max_changeset_elements =
                        Some(numeric(tag, "maximum_elements", &value)?);
                }
                ("waynodes", b"maximum") => {
                    self.max_way_nodes =
                        Some(numeric(tag, "maximum", &value)?);
                }
                ("tracepoints", b"per_page") => {
                    self.tracepoints_per_page =
                        Some(numeric(tag, "per_page", &value)?);
                }
                ("area", b"maximum") => {
                    self.max_area = Some(numeric(tag, "maximum", &value)?);
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn numeric<T: FromStr>(
    tag: &'static str,
    attribute: &'static str,
    value: &str,
) -> Result<T, CapabilityError> {
    value.parse().map_err(|_| CapabilityError::BadValue {
        tag,
        attribute,
        value: value.to_string(),
    })
}
