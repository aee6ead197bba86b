use crate::pipeline::entry::Entry;
use serde::Serialize;
use std::collections::BTreeMap;

/// Push request body: one stream carrying the static labels and one batch.
#[derive(Debug, Serialize)]
pub struct PushRequest<'a> {
    pub streams: [Stream<'a>; 1],
}

#[derive(Debug, Serialize)]
pub struct Stream<'a> {
    #[serde(rename = "stream")]
    pub labels: &'a BTreeMap<String, String>,
    pub values: &'a [Entry],
}

impl<'a> PushRequest<'a> {
    pub fn new(labels: &'a BTreeMap<String, String>, entries: &'a [Entry]) -> Self {
        Self {
            streams: [Stream {
                labels,
                values: entries,
            }],
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
