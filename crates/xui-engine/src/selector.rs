//! Narrowing a pass to its target inbounds and records.

use xui_store::RecordStore;

use crate::error::EngineError;

/// Which records a pass targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    AllInbounds,
    SingleInbound(i64),
    /// One client, looked up in `inbound` or, when `None`, in every inbound.
    SingleClient { email: String, inbound: Option<i64> },
}

impl Scope {
    pub fn client(email: impl Into<String>, inbound: Option<i64>) -> Self {
        Self::SingleClient {
            email: email.into(),
            inbound,
        }
    }

    #[inline]
    pub fn is_single_client(&self) -> bool {
        matches!(self, Self::SingleClient { .. })
    }
}

/// Concrete iteration plan for a [`Scope`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Inbounds to visit, in load order.
    pub inbound_ids: Vec<i64>,
    /// When set, only records with this email are processed.
    pub email: Option<String>,
    /// Malformed inbounds that fell inside the scope and are skipped.
    pub skipped: Vec<i64>,
}

impl Selection {
    /// Whether a record with `email` is processed.
    #[inline]
    pub fn admits(&self, email: &str) -> bool {
        !email.is_empty() && self.email.as_deref().is_none_or(|target| target == email)
    }
}

/// Resolve `scope` against the loaded records.
pub fn select(store: &RecordStore, scope: &Scope) -> Result<Selection, EngineError> {
    match scope {
        Scope::AllInbounds => Ok(Selection {
            inbound_ids: store.inbounds().iter().map(|i| i.id).collect(),
            email: None,
            skipped: store.malformed().iter().map(|m| m.id).collect(),
        }),
        Scope::SingleInbound(id) => {
            require_inbound(store, *id)?;
            Ok(Selection {
                inbound_ids: vec![*id],
                email: None,
                skipped: Vec::new(),
            })
        }
        Scope::SingleClient { email, inbound } => {
            if email.is_empty() {
                return Err(EngineError::ClientNotFound(String::new()));
            }
            let inbound_id = match inbound {
                Some(id) => {
                    require_inbound(store, *id)?;
                    if store.find_client(email, Some(*id)).is_none() {
                        return Err(EngineError::ClientNotFound(email.clone()));
                    }
                    *id
                }
                None => {
                    let holders = store.inbounds_with_client(email);
                    match holders[..] {
                        [] => return Err(EngineError::ClientNotFound(email.clone())),
                        [id] => id,
                        _ => {
                            return Err(EngineError::AmbiguousClient {
                                email: email.clone(),
                                inbounds: holders,
                            });
                        }
                    }
                }
            };
            Ok(Selection {
                inbound_ids: vec![inbound_id],
                email: Some(email.clone()),
                skipped: Vec::new(),
            })
        }
    }
}

fn require_inbound(store: &RecordStore, id: i64) -> Result<(), EngineError> {
    if store.find_inbound(id).is_some() {
        Ok(())
    } else if store.is_malformed(id) {
        Err(EngineError::MalformedInbound(id))
    } else {
        Err(EngineError::UnknownInbound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xui_store::InboundRow;

    fn store() -> RecordStore {
        let row = |id: i64, settings: &str| InboundRow {
            id,
            remark: String::new(),
            port: 0,
            protocol: "vmess".into(),
            settings: settings.into(),
        };
        RecordStore::from_rows([
            row(1, r#"{"clients":[{"email":"a"},{"email":"dup"}]}"#),
            row(2, "{broken"),
            row(3, r#"{"clients":[{"email":"c"},{"email":"dup"}]}"#),
        ])
    }

    #[test]
    fn all_inbounds_visits_every_decoded_inbound() {
        let sel = select(&store(), &Scope::AllInbounds).unwrap();
        assert_eq!(sel.inbound_ids, vec![1, 3]);
        assert_eq!(sel.skipped, vec![2]);
        assert!(sel.admits("anything"));
        assert!(!sel.admits(""));
    }

    #[test]
    fn single_inbound_checks_existence() {
        let store = store();
        assert_eq!(select(&store, &Scope::SingleInbound(3)).unwrap().inbound_ids, vec![3]);
        assert!(matches!(
            select(&store, &Scope::SingleInbound(7)),
            Err(EngineError::UnknownInbound(7))
        ));
        assert!(matches!(
            select(&store, &Scope::SingleInbound(2)),
            Err(EngineError::MalformedInbound(2))
        ));
    }

    #[test]
    fn single_client_filters_records() {
        let sel = select(&store(), &Scope::client("c", None)).unwrap();
        assert_eq!(sel.inbound_ids, vec![3]);
        assert!(sel.admits("c"));
        assert!(!sel.admits("dup"));
    }

    #[test]
    fn single_client_rejects_ambiguous_or_missing() {
        let store = store();
        match select(&store, &Scope::client("dup", None)) {
            Err(EngineError::AmbiguousClient { inbounds, .. }) => assert_eq!(inbounds, vec![1, 3]),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(select(&store, &Scope::client("dup", Some(3))).unwrap().inbound_ids, vec![3]);
        assert!(matches!(
            select(&store, &Scope::client("a", Some(3))),
            Err(EngineError::ClientNotFound(_))
        ));
        assert!(matches!(
            select(&store, &Scope::client("zzz", None)),
            Err(EngineError::ClientNotFound(_))
        ));
    }
}
