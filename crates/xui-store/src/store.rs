//! In-memory record store over all loaded inbounds.

use std::collections::BTreeSet;

use tracing::warn;

use crate::error::StoreError;
use crate::record::{ClientRecord, Inbound, InboundRow};
use crate::writes::DocumentUpdate;

/// An inbound whose settings document failed to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedInbound {
    pub id: i64,
    pub remark: String,
    pub protocol: String,
    pub reason: String,
}

/// Loaded inbounds, in load order, plus the set of inbounds whose documents
/// were edited and must be written back.
///
/// Inbounds that fail to decode are kept aside in [`malformed`](Self::malformed)
/// and never written.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    inbounds: Vec<Inbound>,
    malformed: Vec<MalformedInbound>,
    dirty: BTreeSet<i64>,
}

impl RecordStore {
    /// Decode raw rows. Decoding failures are isolated per inbound.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = InboundRow>,
    {
        let mut store = Self::default();
        for row in rows {
            let (id, remark, protocol) = (row.id, row.remark.clone(), row.protocol.clone());
            match Inbound::decode(row) {
                Ok(inbound) => store.inbounds.push(inbound),
                Err(e) => {
                    warn!(inbound_id = id, error = %e, "skipping inbound with malformed settings");
                    store.malformed.push(MalformedInbound {
                        id,
                        remark,
                        protocol,
                        reason: e.to_string(),
                    });
                }
            }
        }
        store
    }

    /// Build a store from already decoded inbounds.
    pub fn from_inbounds(inbounds: Vec<Inbound>) -> Self {
        Self {
            inbounds,
            ..Self::default()
        }
    }

    #[inline]
    pub fn inbounds(&self) -> &[Inbound] {
        &self.inbounds
    }

    #[inline]
    pub fn malformed(&self) -> &[MalformedInbound] {
        &self.malformed
    }

    pub fn is_malformed(&self, id: i64) -> bool {
        self.malformed.iter().any(|m| m.id == id)
    }

    pub fn find_inbound(&self, id: i64) -> Option<&Inbound> {
        self.inbounds.iter().find(|i| i.id == id)
    }

    /// First client with `email`, either inside inbound `scope` or across all
    /// inbounds in load order.
    pub fn find_client(&self, email: &str, scope: Option<i64>) -> Option<(&Inbound, &ClientRecord)> {
        self.inbounds
            .iter()
            .filter(|i| scope.is_none_or(|id| i.id == id))
            .find_map(|i| i.position(email).map(|idx| (i, &i.settings.clients[idx])))
    }

    /// Ids of every inbound holding a client with `email`, in load order.
    pub fn inbounds_with_client(&self, email: &str) -> Vec<i64> {
        self.inbounds
            .iter()
            .filter(|i| i.position(email).is_some())
            .map(|i| i.id)
            .collect()
    }

    /// Mutable access to one client of one inbound.
    pub fn client_mut(&mut self, inbound_id: i64, index: usize) -> Option<&mut ClientRecord> {
        self.inbounds
            .iter_mut()
            .find(|i| i.id == inbound_id)
            .and_then(|i| i.settings.clients.get_mut(index))
    }

    /// Record that inbound `id` holds at least one edited client.
    pub fn mark_dirty(&mut self, id: i64) {
        self.dirty.insert(id);
    }

    #[inline]
    pub fn is_dirty(&self, id: i64) -> bool {
        self.dirty.contains(&id)
    }

    pub fn dirty_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.dirty.iter().copied()
    }

    /// Encode the settings document of inbound `id`.
    pub fn serialize(&self, id: i64) -> Result<String, StoreError> {
        let inbound = self
            .find_inbound(id)
            .ok_or_else(|| StoreError::unavailable(format!("inbound {id} is not loaded")))?;
        Ok(inbound.settings.encode()?)
    }

    /// Encoded documents of every dirty inbound, ordered by id.
    pub fn dirty_documents(&self) -> Result<Vec<DocumentUpdate>, StoreError> {
        self.dirty
            .iter()
            .map(|&id| {
                Ok(DocumentUpdate {
                    inbound_id: id,
                    settings: self.serialize(id)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, settings: &str) -> InboundRow {
        InboundRow {
            id,
            remark: format!("in-{id}"),
            port: 1000 + id,
            protocol: "vless".into(),
            settings: settings.into(),
        }
    }

    fn sample() -> RecordStore {
        RecordStore::from_rows([
            row(1, r#"{"clients":[{"email":"a"},{"email":"b"}]}"#),
            row(2, "not json"),
            row(3, r#"{"clients":[{"email":"b"},{"email":"c"}]}"#),
        ])
    }

    #[test]
    fn malformed_inbounds_are_isolated() {
        let store = sample();
        assert_eq!(store.inbounds().len(), 2);
        assert_eq!(store.malformed().len(), 1);
        assert!(store.is_malformed(2));
        assert!(store.find_inbound(2).is_none());
    }

    #[test]
    fn find_client_respects_scope_and_load_order() {
        let store = sample();
        let (inbound, _) = store.find_client("b", None).unwrap();
        assert_eq!(inbound.id, 1);
        let (inbound, _) = store.find_client("b", Some(3)).unwrap();
        assert_eq!(inbound.id, 3);
        assert!(store.find_client("a", Some(3)).is_none());
        assert!(store.find_client("", None).is_none());
        assert_eq!(store.inbounds_with_client("b"), vec![1, 3]);
    }

    #[test]
    fn only_dirty_inbounds_are_serialized() {
        let mut store = sample();
        store.client_mut(3, 1).unwrap().enabled = true;
        store.mark_dirty(3);
        let docs = store.dirty_documents().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].inbound_id, 3);
        assert!(docs[0].settings.contains(r#""enable":true"#));
        assert!(!store.is_dirty(1));
    }
}
