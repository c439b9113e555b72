//! Database relation data and connection parameter derivation.

use std::collections::BTreeMap;
use std::fmt;

/// Data bag published by the database provider on one relation.
pub type RelationBag = BTreeMap<String, String>;

/// Relation data for every `database` relation, in `relation-ids` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationSnapshot {
    entries: Vec<(String, RelationBag)>,
}

impl RelationSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, relation_id: impl Into<String>, bag: RelationBag) {
        self.entries.push((relation_id.into(), bag));
    }

    pub fn with_bag(mut self, relation_id: impl Into<String>, bag: RelationBag) -> Self {
        self.push(relation_id, bag);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RelationBag)> {
        self.entries.iter().map(|(id, bag)| (id.as_str(), bag))
    }
}

/// Credentials and address of the PostgreSQL database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParameters {
    pub host: String,
    pub port: String,
    pub username: String,
    pub password: String,
    pub database_name: String,
}

impl ConnectionParameters {
    /// JDBC URL for the PostgreSQL driver.
    pub fn jdbc_url(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        format!(
            "jdbc:postgresql://{}:{}/{}",
            host, self.port, self.database_name
        )
    }
}

/// Why no connection parameters could be derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotReadyReason {
    /// No `database` relation exists.
    NoRelation,
    /// Relations exist but the provider has not published anything yet.
    NoData,
    /// A required field is missing or empty.
    MissingField(&'static str),
    /// `endpoints` is not `host:port`.
    MalformedEndpoint(String),
}

impl fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotReadyReason::NoRelation => write!(f, "no database relation"),
            NotReadyReason::NoData => write!(f, "database relation has no data yet"),
            NotReadyReason::MissingField(field) => write!(f, "relation data missing '{field}'"),
            NotReadyReason::MalformedEndpoint(value) => {
                write!(f, "malformed database endpoint '{value}'")
            }
        }
    }
}

/// Outcome of connection parameter derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseState {
    Ready(ConnectionParameters),
    NotReady(NotReadyReason),
}

/// Split an endpoint into host and port.
///
/// Only the first entry of a comma-separated list is used. The split happens
/// on the last colon so bare IPv6 addresses keep their host part; brackets
/// around the host are removed. The port must be numeric.
pub fn parse_endpoint(endpoints: &str) -> Option<(String, String)> {
    let first = endpoints.split(',').next()?.trim();
    let (host, port) = first.rsplit_once(':')?;

    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    if host.is_empty() || port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some((host.to_string(), port.to_string()))
}

/// Value of a field that must not be blank. Returned as published, untrimmed.
fn required<'a>(bag: &'a RelationBag, field: &'static str) -> Result<&'a str, NotReadyReason> {
    match bag.get(field) {
        Some(v) if !v.trim().is_empty() => Ok(v.as_str()),
        _ => Err(NotReadyReason::MissingField(field)),
    }
}

fn from_bag(bag: &RelationBag, database_name: &str) -> Result<ConnectionParameters, NotReadyReason> {
    let endpoints = required(bag, "endpoints")?;
    let (host, port) = parse_endpoint(endpoints)
        .ok_or_else(|| NotReadyReason::MalformedEndpoint(endpoints.to_string()))?;

    Ok(ConnectionParameters {
        host,
        port,
        username: required(bag, "username")?.to_string(),
        password: required(bag, "password")?.to_string(),
        database_name: database_name.to_string(),
    })
}

/// Derive connection parameters from the first non-empty relation bag.
pub fn derive_connection_parameters(
    snapshot: &RelationSnapshot,
    database_name: &str,
) -> DatabaseState {
    if snapshot.is_empty() {
        return DatabaseState::NotReady(NotReadyReason::NoRelation);
    }

    match snapshot.iter().find(|(_, bag)| !bag.is_empty()) {
        Some((_, bag)) => match from_bag(bag, database_name) {
            Ok(params) => DatabaseState::Ready(params),
            Err(reason) => DatabaseState::NotReady(reason),
        },
        None => DatabaseState::NotReady(NotReadyReason::NoData),
    }
}
