//! Neo4j-backed implementation of [`GraphStore`].
//!
//! Entities are stored one node per version: `(:Entity {id, entity_type,
//! version, valid_from, valid_to, ...domain properties})`. Timestamps are
//! fixed-width UTC RFC 3339 strings (microsecond precision), so
//! lexicographic comparison in Cypher matches chronological order.
//! Relationships connect current versions and carry their own properties
//! plus an optional `weight`.
//!
//! Reserved node property keys (`id`, `entity_type`, `version`,
//! `valid_from`, `valid_to`) are managed by this client; domain properties
//! live alongside them and are split back out on read.

use super::models::{Entity, Relationship, Row};
use super::traits::GraphStore;
use crate::query::builder::CypherQuery;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use neo4rs::{query, BoltType, Graph, Query};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Maximum structural traversal depth rendered into variable-length patterns.
const MAX_TRAVERSAL_DEPTH: u32 = 10;

/// Neo4j client for the graph intelligence layer.
pub struct Neo4jStore {
    graph: Arc<Graph>,
    query_timeout: Duration,
}

/// Serialize a timestamp to the fixed-width form stored in the graph.
pub(crate) fn ts_to_str(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn str_to_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid timestamp `{s}` in store"))
}

/// Convert a JSON parameter value to its Bolt representation.
///
/// Null never reaches this point from the query builder (nullability is
/// expressed structurally, `IS NULL`); a stray null maps to an empty string
/// with a warning rather than failing the whole query.
fn json_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => {
            tracing::warn!("null query parameter coerced to empty string");
            BoltType::from("")
        }
        Value::Bool(b) => BoltType::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                BoltType::from(i)
            } else {
                BoltType::from(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => BoltType::from(s.as_str()),
        Value::Array(items) => {
            let list: Vec<BoltType> = items.iter().map(json_to_bolt).collect();
            BoltType::from(list)
        }
        Value::Object(map) => {
            let mut bolt = neo4rs::BoltMap::default();
            for (k, v) in map {
                // Null-valued properties are semantically absent.
                if !v.is_null() {
                    bolt.put(k.as_str().into(), json_to_bolt(v));
                }
            }
            BoltType::Map(bolt)
        }
    }
}

fn apply_params(mut q: Query, params: &std::collections::BTreeMap<String, Value>) -> Query {
    for (key, value) in params {
        q = q.param(key.as_str(), json_to_bolt(value));
    }
    q
}

/// Decode one driver row into the column-name → JSON shape.
fn decode_row(row: &neo4rs::Row) -> Result<Row> {
    let value: Value = row.to().context("failed to decode result row")?;
    match value {
        Value::Object(map) => Ok(map),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            Ok(map)
        }
    }
}

/// Rebuild an [`Entity`] from the flat node-property map returned by
/// `properties(e)`.
fn entity_from_props(mut props: Map<String, Value>) -> Result<Entity> {
    let id = props
        .remove("id")
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| anyhow!("entity node missing `id`"))?;
    let entity_type = props
        .remove("entity_type")
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| anyhow!("entity node missing `entity_type`"))?;
    let version = props
        .remove("version")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| anyhow!("entity node missing `version`"))?;
    let valid_from = match props.remove("valid_from") {
        Some(Value::String(s)) => str_to_ts(&s)?,
        _ => return Err(anyhow!("entity node missing `valid_from`")),
    };
    let valid_to = match props.remove("valid_to") {
        Some(Value::String(s)) => Some(str_to_ts(&s)?),
        _ => None,
    };

    Ok(Entity {
        id,
        entity_type,
        properties: props,
        valid_from,
        valid_to,
        version,
    })
}

impl Neo4jStore {
    /// Connect and initialize schema (constraints and indexes).
    pub async fn connect(
        uri: &str,
        user: &str,
        password: &str,
        query_timeout: Duration,
    ) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .context("failed to connect to Neo4j")?;

        let store = Self {
            graph: Arc::new(graph),
            query_timeout,
        };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create constraints and indexes. Already-existing objects only warn.
    async fn init_schema(&self) -> Result<()> {
        let constraints = [
            "CREATE CONSTRAINT entity_id_version IF NOT EXISTS FOR (e:Entity) REQUIRE (e.id, e.version) IS UNIQUE",
        ];
        let indexes = [
            "CREATE INDEX entity_id IF NOT EXISTS FOR (e:Entity) ON (e.id)",
            "CREATE INDEX entity_type IF NOT EXISTS FOR (e:Entity) ON (e.entity_type)",
            "CREATE INDEX entity_valid_from IF NOT EXISTS FOR (e:Entity) ON (e.valid_from)",
            "CREATE INDEX entity_valid_to IF NOT EXISTS FOR (e:Entity) ON (e.valid_to)",
        ];

        for stmt in constraints.iter().chain(indexes.iter()) {
            if let Err(e) = self.graph.run(query(stmt)).await {
                tracing::warn!("schema statement skipped (may already exist): {e}");
            }
        }
        Ok(())
    }

    async fn run_inner(&self, q: Query) -> Result<()> {
        tokio::time::timeout(self.query_timeout, self.graph.run(q))
            .await
            .map_err(|_| anyhow!("query timed out after {:?}", self.query_timeout))?
            .context("query execution failed")
    }

    async fn execute_inner(&self, q: Query) -> Result<Vec<Row>> {
        let fut = async {
            let mut stream = self.graph.execute(q).await?;
            let mut rows = Vec::new();
            while let Some(row) = stream.next().await? {
                rows.push(decode_row(&row)?);
            }
            Ok::<_, anyhow::Error>(rows)
        };
        tokio::time::timeout(self.query_timeout, fut)
            .await
            .map_err(|_| anyhow!("query timed out after {:?}", self.query_timeout))?
    }

    async fn execute_entities(&self, q: Query) -> Result<Vec<Entity>> {
        let rows = self.execute_inner(q).await?;
        rows.into_iter()
            .map(|mut row| {
                let props = match row.remove("props") {
                    Some(Value::Object(map)) => map,
                    _ => return Err(anyhow!("entity row missing `props` column")),
                };
                entity_from_props(props)
            })
            .collect()
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn execute(&self, cypher: &CypherQuery) -> Result<Vec<Row>> {
        let q = apply_params(query(&cypher.text), &cypher.params);
        self.execute_inner(q).await
    }

    async fn run(&self, cypher: &CypherQuery) -> Result<()> {
        let q = apply_params(query(&cypher.text), &cypher.params);
        self.run_inner(q).await
    }

    async fn supports_graph_algorithms(&self) -> bool {
        match self.execute_inner(query("RETURN gds.version() AS version")).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("graph-algorithms extension unavailable: {e}");
                false
            }
        }
    }

    async fn get_current_entity(&self, entity_id: &str) -> Result<Option<Entity>> {
        let q = query(
            "MATCH (e:Entity {id: $id}) WHERE e.valid_to IS NULL RETURN properties(e) AS props",
        )
        .param("id", entity_id);
        Ok(self.execute_entities(q).await?.into_iter().next())
    }

    async fn list_current_entities(&self, entity_type: Option<&str>) -> Result<Vec<Entity>> {
        let q = match entity_type {
            Some(t) => query(
                "MATCH (e:Entity {entity_type: $t}) WHERE e.valid_to IS NULL \
                 RETURN properties(e) AS props ORDER BY e.id",
            )
            .param("t", t),
            None => query(
                "MATCH (e:Entity) WHERE e.valid_to IS NULL \
                 RETURN properties(e) AS props ORDER BY e.id",
            ),
        };
        self.execute_entities(q).await
    }

    async fn list_current_relationships(&self) -> Result<Vec<Relationship>> {
        let q = query(
            "MATCH (a:Entity)-[r]->(b:Entity) \
             WHERE a.valid_to IS NULL AND b.valid_to IS NULL \
             RETURN a.id AS source, b.id AS target, type(r) AS rel_type, \
                    properties(r) AS props",
        );
        let rows = self.execute_inner(q).await?;
        rows.into_iter()
            .map(|mut row| {
                let source = row
                    .remove("source")
                    .and_then(|v| v.as_str().map(str::to_string))
                    .ok_or_else(|| anyhow!("relationship row missing `source`"))?;
                let target = row
                    .remove("target")
                    .and_then(|v| v.as_str().map(str::to_string))
                    .ok_or_else(|| anyhow!("relationship row missing `target`"))?;
                let rel_type = row
                    .remove("rel_type")
                    .and_then(|v| v.as_str().map(str::to_string))
                    .ok_or_else(|| anyhow!("relationship row missing `rel_type`"))?;
                let mut properties = match row.remove("props") {
                    Some(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                let weight = properties.remove("weight").and_then(|v| v.as_f64());
                Ok(Relationship {
                    source,
                    target,
                    rel_type,
                    properties,
                    weight,
                })
            })
            .collect()
    }

    async fn neighbor_ids(&self, entity_id: &str, depth: u32) -> Result<Vec<String>> {
        let depth = depth.clamp(1, MAX_TRAVERSAL_DEPTH);
        // Variable-length bounds are structural in Cypher and cannot be
        // parameterized; the depth is a clamped integer, never caller text.
        let text = format!(
            "MATCH (a:Entity {{id: $id}})-[*1..{depth}]-(b:Entity) \
             WHERE a.valid_to IS NULL AND b.valid_to IS NULL AND b.id <> $id \
             RETURN DISTINCT b.id AS id ORDER BY id"
        );
        let rows = self.execute_inner(query(&text).param("id", entity_id)).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.get("id").and_then(|v| v.as_str().map(str::to_string)))
            .collect())
    }

    async fn entity_degrees(&self) -> Result<Vec<(String, usize)>> {
        let q = query(
            "MATCH (e:Entity) WHERE e.valid_to IS NULL \
             OPTIONAL MATCH (e)-[r]-(m:Entity) WHERE m.valid_to IS NULL \
             RETURN e.id AS id, count(r) AS degree ORDER BY id",
        );
        let rows = self.execute_inner(q).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.get("id")?.as_str()?.to_string();
                let degree = row.get("degree")?.as_i64()? as usize;
                Some((id, degree))
            })
            .collect())
    }

    async fn entity_versions(&self, entity_id: &str) -> Result<Vec<Entity>> {
        let q = query(
            "MATCH (e:Entity {id: $id}) RETURN properties(e) AS props ORDER BY e.version",
        )
        .param("id", entity_id);
        self.execute_entities(q).await
    }

    async fn insert_entity_version(&self, entity: &Entity) -> Result<()> {
        let mut props = entity.properties.clone();
        props.insert("id".into(), entity.id.clone().into());
        props.insert("entity_type".into(), entity.entity_type.clone().into());
        props.insert("version".into(), entity.version.into());
        props.insert("valid_from".into(), ts_to_str(entity.valid_from).into());
        if let Some(vt) = entity.valid_to {
            props.insert("valid_to".into(), ts_to_str(vt).into());
        }

        let q = query("CREATE (e:Entity) SET e = $props")
            .param("props", json_to_bolt(&Value::Object(props)));
        self.run_inner(q)
            .await
            .with_context(|| format!("failed to insert version {} of `{}`", entity.version, entity.id))
    }

    async fn close_entity_version(
        &self,
        entity_id: &str,
        version: i64,
        valid_to: DateTime<Utc>,
    ) -> Result<()> {
        let q = query("MATCH (e:Entity {id: $id, version: $version}) SET e.valid_to = $valid_to")
            .param("id", entity_id)
            .param("version", version)
            .param("valid_to", ts_to_str(valid_to));
        self.run_inner(q)
            .await
            .with_context(|| format!("failed to close version {version} of `{entity_id}`"))
    }

    async fn delete_entity_version(&self, entity_id: &str, version: i64) -> Result<()> {
        let q = query("MATCH (e:Entity {id: $id, version: $version}) DETACH DELETE e")
            .param("id", entity_id)
            .param("version", version);
        self.run_inner(q)
            .await
            .with_context(|| format!("failed to delete version {version} of `{entity_id}`"))
    }

    async fn entities_at_time(
        &self,
        ts: DateTime<Utc>,
        entity_type: Option<&str>,
    ) -> Result<Vec<Entity>> {
        let type_clause = entity_type.map_or("", |_| " AND e.entity_type = $t");
        let text = format!(
            "MATCH (e:Entity) \
             WHERE e.valid_from <= $ts AND (e.valid_to IS NULL OR e.valid_to > $ts){type_clause} \
             RETURN properties(e) AS props ORDER BY e.id"
        );
        let mut q = query(&text).param("ts", ts_to_str(ts));
        if let Some(t) = entity_type {
            q = q.param("t", t);
        }
        self.execute_entities(q).await
    }

    async fn entities_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        entity_type: Option<&str>,
    ) -> Result<Vec<Entity>> {
        let type_clause = entity_type.map_or("", |_| " AND e.entity_type = $t");
        let text = format!(
            "MATCH (e:Entity) \
             WHERE e.valid_from <= $end AND (e.valid_to IS NULL OR e.valid_to > $start){type_clause} \
             RETURN properties(e) AS props ORDER BY e.id, e.version"
        );
        let mut q = query(&text)
            .param("start", ts_to_str(start))
            .param("end", ts_to_str(end));
        if let Some(t) = entity_type {
            q = q.param("t", t);
        }
        self.execute_entities(q).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_ts_roundtrip_fixed_width() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let s = ts_to_str(ts);
        assert!(s.ends_with('Z'));
        assert_eq!(str_to_ts(&s).unwrap(), ts);

        // Fixed-width form: lexicographic order equals chronological order.
        let later = ts + chrono::Duration::microseconds(1);
        assert!(ts_to_str(later) > s);
    }

    #[test]
    fn test_entity_from_props_splits_reserved_keys() {
        let mut props = Map::new();
        props.insert("id".into(), "e1".into());
        props.insert("entity_type".into(), "Person".into());
        props.insert("version".into(), 3.into());
        props.insert("valid_from".into(), ts_to_str(Utc::now()).into());
        props.insert("name".into(), "Ada".into());

        let entity = entity_from_props(props).unwrap();
        assert_eq!(entity.id, "e1");
        assert_eq!(entity.version, 3);
        assert!(entity.is_current());
        assert_eq!(entity.properties.len(), 1);
        assert_eq!(entity.property("name").unwrap(), "Ada");
        for key in ["id", "entity_type", "version", "valid_from", "valid_to"] {
            assert!(!entity.properties.contains_key(key));
        }
    }

    #[test]
    fn test_entity_from_props_rejects_missing_id() {
        let mut props = Map::new();
        props.insert("entity_type".into(), "Person".into());
        assert!(entity_from_props(props).is_err());
    }

    #[test]
    fn test_json_to_bolt_handles_scalars_and_collections() {
        // Exercise the conversion paths; the exact Bolt shapes are the
        // driver's concern.
        let _ = json_to_bolt(&Value::Bool(true));
        let _ = json_to_bolt(&serde_json::json!(42));
        let _ = json_to_bolt(&serde_json::json!(0.5));
        let _ = json_to_bolt(&serde_json::json!("text"));
        let _ = json_to_bolt(&serde_json::json!(["a", "b"]));
        let _ = json_to_bolt(&serde_json::json!({"k": "v", "nested": {"n": 1}}));
    }
}
