//! In-memory mock implementation of [`GraphStore`] for testing.
//!
//! Backed by `tokio::sync::RwLock` collections with public fields so tests
//! can seed and inspect state directly. The generic query surface records
//! every executed query (for injection/caching assertions) and answers from
//! a configurable table of canned results; substring-matched failure and
//! delay injection support batch-executor and timeout tests.

use super::models::{Entity, Relationship, Row};
use super::traits::GraphStore;
use crate::query::builder::CypherQuery;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Map;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// In-memory mock of the graph store.
pub struct MockGraphStore {
    /// Version records per entity id, ascending by version.
    pub versions: RwLock<HashMap<String, Vec<Entity>>>,
    /// Relationships between current entities.
    pub relationships: RwLock<Vec<Relationship>>,
    /// Every query passed to `execute`/`run`, in call order.
    pub executed: RwLock<Vec<CypherQuery>>,
    /// (substring, rows) — first match answers `execute`.
    pub canned_results: RwLock<Vec<(String, Vec<Row>)>>,
    /// Queries containing any of these substrings fail.
    pub fail_on: RwLock<Vec<String>>,
    /// Queries containing the substring sleep for the duration first.
    pub delay_on: RwLock<Vec<(String, Duration)>>,
    /// Whether the mock advertises the native graph-algorithms extension.
    pub gds_available: AtomicBool,
}

impl Default for MockGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGraphStore {
    pub fn new() -> Self {
        Self {
            versions: RwLock::new(HashMap::new()),
            relationships: RwLock::new(Vec::new()),
            executed: RwLock::new(Vec::new()),
            canned_results: RwLock::new(Vec::new()),
            fail_on: RwLock::new(Vec::new()),
            delay_on: RwLock::new(Vec::new()),
            gds_available: AtomicBool::new(false),
        }
    }

    /// Seed a current entity (version 1) with the given properties.
    pub async fn seed_entity(&self, id: &str, entity_type: &str, properties: Map<String, serde_json::Value>) {
        let entity = Entity::new(id, entity_type, properties);
        self.versions
            .write()
            .await
            .entry(id.to_string())
            .or_default()
            .push(entity);
    }

    /// Seed a current entity with just a `name` property.
    pub async fn seed_named_entity(&self, id: &str, entity_type: &str, name: &str) {
        let mut props = Map::new();
        props.insert("name".into(), name.into());
        self.seed_entity(id, entity_type, props).await;
    }

    /// Seed a relationship between two entity ids.
    pub async fn link(&self, source: &str, target: &str, rel_type: &str) {
        self.relationships
            .write()
            .await
            .push(Relationship::new(source, target, rel_type));
    }

    /// Register canned rows for queries containing `substring`.
    pub async fn answer_with(&self, substring: &str, rows: Vec<Row>) {
        self.canned_results
            .write()
            .await
            .push((substring.to_string(), rows));
    }

    /// Make queries containing `substring` fail.
    pub async fn fail_queries_containing(&self, substring: &str) {
        self.fail_on.write().await.push(substring.to_string());
    }

    /// Make queries containing `substring` sleep before answering.
    pub async fn delay_queries_containing(&self, substring: &str, delay: Duration) {
        self.delay_on
            .write()
            .await
            .push((substring.to_string(), delay));
    }

    /// Number of queries executed so far.
    pub async fn executed_count(&self) -> usize {
        self.executed.read().await.len()
    }

    fn current_of(versions: &[Entity]) -> Option<&Entity> {
        versions.iter().find(|e| e.is_current())
    }

    async fn pre_execute(&self, cypher: &CypherQuery) -> Result<()> {
        // Record before the artificial delay so callers that cancel a slow
        // query still observe the attempt.
        self.executed.write().await.push(cypher.clone());

        let delay = {
            let delays = self.delay_on.read().await;
            delays
                .iter()
                .find(|(s, _)| cypher.text.contains(s.as_str()))
                .map(|(_, d)| *d)
        };
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }

        let fails = self.fail_on.read().await;
        if let Some(marker) = fails.iter().find(|s| cypher.text.contains(s.as_str())) {
            return Err(anyhow!("mock store failure (matched `{marker}`)"));
        }
        Ok(())
    }
}

#[async_trait]
impl GraphStore for MockGraphStore {
    async fn execute(&self, cypher: &CypherQuery) -> Result<Vec<Row>> {
        self.pre_execute(cypher).await?;
        let canned = self.canned_results.read().await;
        for (substring, rows) in canned.iter() {
            if cypher.text.contains(substring.as_str()) {
                return Ok(rows.clone());
            }
        }
        Ok(Vec::new())
    }

    async fn run(&self, cypher: &CypherQuery) -> Result<()> {
        self.pre_execute(cypher).await?;
        Ok(())
    }

    async fn supports_graph_algorithms(&self) -> bool {
        self.gds_available.load(Ordering::Relaxed)
    }

    async fn get_current_entity(&self, entity_id: &str) -> Result<Option<Entity>> {
        let versions = self.versions.read().await;
        Ok(versions
            .get(entity_id)
            .and_then(|vs| Self::current_of(vs))
            .cloned())
    }

    async fn list_current_entities(&self, entity_type: Option<&str>) -> Result<Vec<Entity>> {
        let versions = self.versions.read().await;
        let mut out: Vec<Entity> = versions
            .values()
            .filter_map(|vs| Self::current_of(vs))
            .filter(|e| entity_type.map_or(true, |t| e.entity_type == t))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn list_current_relationships(&self) -> Result<Vec<Relationship>> {
        let versions = self.versions.read().await;
        let current: HashSet<&str> = versions
            .values()
            .filter_map(|vs| Self::current_of(vs))
            .map(|e| e.id.as_str())
            .collect();
        Ok(self
            .relationships
            .read()
            .await
            .iter()
            .filter(|r| current.contains(r.source.as_str()) && current.contains(r.target.as_str()))
            .cloned()
            .collect())
    }

    async fn neighbor_ids(&self, entity_id: &str, depth: u32) -> Result<Vec<String>> {
        let rels = self.list_current_relationships().await?;
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for r in &rels {
            adjacency.entry(r.source.as_str()).or_default().push(r.target.as_str());
            adjacency.entry(r.target.as_str()).or_default().push(r.source.as_str());
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<(&str, u32)> = VecDeque::new();
        queue.push_back((entity_id, 0));
        seen.insert(entity_id);

        let mut out = Vec::new();
        while let Some((node, dist)) = queue.pop_front() {
            if dist >= depth {
                continue;
            }
            if let Some(next) = adjacency.get(node) {
                for &n in next {
                    if seen.insert(n) {
                        out.push(n.to_string());
                        queue.push_back((n, dist + 1));
                    }
                }
            }
        }
        out.sort();
        Ok(out)
    }

    async fn entity_degrees(&self) -> Result<Vec<(String, usize)>> {
        let entities = self.list_current_entities(None).await?;
        let rels = self.list_current_relationships().await?;
        let mut degrees: HashMap<&str, usize> = HashMap::new();
        for r in &rels {
            *degrees.entry(r.source.as_str()).or_default() += 1;
            *degrees.entry(r.target.as_str()).or_default() += 1;
        }
        Ok(entities
            .iter()
            .map(|e| (e.id.clone(), degrees.get(e.id.as_str()).copied().unwrap_or(0)))
            .collect())
    }

    async fn entity_versions(&self, entity_id: &str) -> Result<Vec<Entity>> {
        let versions = self.versions.read().await;
        let mut out = versions.get(entity_id).cloned().unwrap_or_default();
        out.sort_by_key(|e| e.version);
        Ok(out)
    }

    async fn insert_entity_version(&self, entity: &Entity) -> Result<()> {
        self.versions
            .write()
            .await
            .entry(entity.id.clone())
            .or_default()
            .push(entity.clone());
        Ok(())
    }

    async fn close_entity_version(
        &self,
        entity_id: &str,
        version: i64,
        valid_to: DateTime<Utc>,
    ) -> Result<()> {
        let mut versions = self.versions.write().await;
        if let Some(vs) = versions.get_mut(entity_id) {
            for e in vs.iter_mut() {
                if e.version == version {
                    e.valid_to = Some(valid_to);
                }
            }
        }
        Ok(())
    }

    async fn delete_entity_version(&self, entity_id: &str, version: i64) -> Result<()> {
        let mut versions = self.versions.write().await;
        if let Some(vs) = versions.get_mut(entity_id) {
            vs.retain(|e| e.version != version);
        }
        Ok(())
    }

    async fn entities_at_time(
        &self,
        ts: DateTime<Utc>,
        entity_type: Option<&str>,
    ) -> Result<Vec<Entity>> {
        let versions = self.versions.read().await;
        let mut out: Vec<Entity> = versions
            .values()
            .flatten()
            .filter(|e| e.valid_at(ts))
            .filter(|e| entity_type.map_or(true, |t| e.entity_type == t))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn entities_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        entity_type: Option<&str>,
    ) -> Result<Vec<Entity>> {
        let versions = self.versions.read().await;
        let mut out: Vec<Entity> = versions
            .values()
            .flatten()
            .filter(|e| e.overlaps(start, end))
            .filter(|e| entity_type.map_or(true, |t| e.entity_type == t))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id).then(a.version.cmp(&b.version)));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_and_read_back() {
        let store = MockGraphStore::new();
        store.seed_named_entity("e1", "Person", "Ada").await;
        store.seed_named_entity("e2", "Person", "Alan").await;
        store.link("e1", "e2", "KNOWS").await;

        let entities = store.list_current_entities(None).await.unwrap();
        assert_eq!(entities.len(), 2);

        let rels = store.list_current_relationships().await.unwrap();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].rel_type, "KNOWS");
    }

    #[tokio::test]
    async fn test_neighbor_ids_respects_depth() {
        let store = MockGraphStore::new();
        for id in ["a", "b", "c", "d"] {
            store.seed_named_entity(id, "Node", id).await;
        }
        store.link("a", "b", "R").await;
        store.link("b", "c", "R").await;
        store.link("c", "d", "R").await;

        assert_eq!(store.neighbor_ids("a", 1).await.unwrap(), vec!["b"]);
        assert_eq!(store.neighbor_ids("a", 2).await.unwrap(), vec!["b", "c"]);
        assert_eq!(store.neighbor_ids("a", 3).await.unwrap(), vec!["b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_execute_records_and_fails_on_marker() {
        let store = MockGraphStore::new();
        store.fail_queries_containing("BOOM").await;

        let ok = CypherQuery::new("MATCH (e:Entity) RETURN e");
        let bad = CypherQuery::new("MATCH (e:BOOM) RETURN e");

        assert!(store.execute(&ok).await.is_ok());
        assert!(store.execute(&bad).await.is_err());
        assert_eq!(store.executed_count().await, 2);
    }

    #[tokio::test]
    async fn test_canned_results_answer_by_substring() {
        let store = MockGraphStore::new();
        let mut row = Row::new();
        row.insert("total".into(), 7.into());
        store.answer_with("count(e)", vec![row]).await;

        let rows = store
            .execute(&CypherQuery::new("MATCH (e:Entity) RETURN count(e) AS total"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["total"], 7);
    }

    #[tokio::test]
    async fn test_relationships_to_closed_versions_are_hidden() {
        let store = MockGraphStore::new();
        store.seed_named_entity("a", "Node", "a").await;
        store.seed_named_entity("b", "Node", "b").await;
        store.link("a", "b", "R").await;

        // Close b's only version: the edge loses a current endpoint.
        store.close_entity_version("b", 1, Utc::now()).await.unwrap();
        assert!(store.list_current_relationships().await.unwrap().is_empty());
    }
}
